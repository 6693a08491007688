use std::fmt::Write;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::catalog::{
    Antecedent, Behaviour, Consequence, Effectiveness, FunctionPrimary, FunctionSecondary,
    FunctionalHypothesis, RiskLevel, Role, Setting, SupportType, WindowOfTolerance,
    BASIC_CONTEXT_DEFAULT, HOW_TO_RESPOND_DEFAULT,
};
use crate::error::{AppError, AppResult};
use crate::models::{ChronologyLayer, IncidentDraft, Outcomes, StaffRef};
use crate::session::{Mode, Page, Session};
use crate::store::Store;

/// Where a log was started from; decides where a saved log returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOrigin {
    QuickLog,
    StaffArea(Role),
}

impl LogOrigin {
    pub fn role(&self) -> Option<Role> {
        match self {
            LogOrigin::QuickLog => None,
            LogOrigin::StaffArea(role) => Some(*role),
        }
    }

    fn return_to(&self, session: &mut Session, student_id: &str) {
        match self {
            LogOrigin::StaffArea(role) => session.navigate_to(
                Page::StaffArea,
                Some(*role),
                Mode::Analysis,
                Some(student_id.to_string()),
            ),
            LogOrigin::QuickLog => session.go_home(),
        }
    }
}

/// Staged critical incident between the initial log and its follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpDraft {
    pub draft: IncidentDraft,
    pub chronology: Vec<ChronologyLayer>,
    pub origin: LogOrigin,
    /// Set when the draft was recovered from an existing pending record.
    pub recovered_from: Option<Uuid>,
}

#[cfg(test)]
impl FollowUpDraft {
    pub fn sample() -> Self {
        Self {
            draft: IncidentDraft {
                student_id: "stu_jp_high".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap_or_default(),
                time: NaiveTime::from_hms_opt(10, 47, 0).unwrap_or_default(),
                behaviour: Behaviour::Elopement,
                antecedent: Antecedent::Transition,
                setting: Setting::Yard,
                support_type: SupportType::OneToOne,
                risk_level: RiskLevel::new(4).unwrap(),
                consequence: Consequence::Redirection,
                func_hypothesis: FunctionalHypothesis::AvoidEscape,
                func_primary: None,
                func_secondary: None,
                effectiveness: Effectiveness::Ineffective,
                window_of_tolerance: WindowOfTolerance::HyperAroused,
                context: String::new(),
                notes: None,
                how_to_respond: HOW_TO_RESPOND_DEFAULT.to_string(),
                logged_by: StaffRef::bare("s1"),
                other_staff: Vec::new(),
            },
            chronology: Vec::new(),
            origin: LogOrigin::QuickLog,
            recovered_from: None,
        }
    }
}

/// The two-step ABCH documentation flow for high-risk incidents.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AbchWorkflow {
    #[default]
    AwaitingInitialLog,
    AwaitingFollowUp(Box<FollowUpDraft>),
    Finalized { incident_id: Uuid },
}

impl AbchWorkflow {
    pub fn has_staged_draft(&self) -> bool {
        matches!(self, AbchWorkflow::AwaitingFollowUp(_))
    }

    pub fn staged(&self) -> Option<&FollowUpDraft> {
        match self {
            AbchWorkflow::AwaitingFollowUp(staged) => Some(staged),
            _ => None,
        }
    }

    fn staged_mut(&mut self) -> AppResult<&mut FollowUpDraft> {
        match self {
            AbchWorkflow::AwaitingFollowUp(staged) => Ok(staged),
            _ => Err(AppError::NoFollowUpInProgress),
        }
    }
}

/// Raw input of the incident log form. Enum fields stay optional until
/// submission so a missing selection can be reported by name.
#[derive(Debug, Clone, Default)]
pub struct IncidentForm {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub behaviour: Option<Behaviour>,
    pub antecedent: Option<Antecedent>,
    pub setting: Option<Setting>,
    pub support_type: Option<SupportType>,
    pub risk_level: Option<RiskLevel>,
    pub consequence: Option<Consequence>,
    pub func_hypothesis: Option<FunctionalHypothesis>,
    pub func_primary: Option<FunctionPrimary>,
    pub func_secondary: Option<FunctionSecondary>,
    pub window_of_tolerance: Option<WindowOfTolerance>,
    pub effectiveness: Option<Effectiveness>,
    pub logged_by: Option<String>,
    pub logged_by_name: Option<String>,
    pub other_staff: Vec<StaffRef>,
    pub context: Option<String>,
    pub how_to_respond: Option<String>,
}

fn required<T: Copy>(value: Option<T>, field: &'static str) -> AppResult<T> {
    value.ok_or(AppError::MissingField(field))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

impl IncidentForm {
    /// Checks the form against the rosters and builds the base record.
    pub fn validate(&self, store: &Store, student_id: &str) -> AppResult<IncidentDraft> {
        let student = store.student(student_id)?;
        let date = required(self.date, "date")?;
        let time = required(self.time, "time")?;
        let behaviour = required(self.behaviour, "behaviour")?;
        let antecedent = required(self.antecedent, "antecedent")?;
        let setting = required(self.setting, "setting")?;
        let support_type = required(self.support_type, "support_type")?;
        let risk_level = required(self.risk_level, "risk_level")?;
        let consequence = required(self.consequence, "consequence")?;
        let func_hypothesis = required(self.func_hypothesis, "func_hypothesis")?;
        let window_of_tolerance = required(self.window_of_tolerance, "window_of_tolerance")?;
        let effectiveness = required(self.effectiveness, "effectiveness")?;

        let logged_by_id = self
            .logged_by
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AppError::MissingField("logged_by"))?;
        let logger = store.staff_member(logged_by_id)?;
        let logged_by = if logger.special {
            let name = non_blank(self.logged_by_name.as_deref())
                .ok_or_else(|| AppError::MissingSpecialName(logger.name.clone()))?;
            StaffRef::named(&logger.id, name)
        } else {
            StaffRef::bare(&logger.id)
        };

        let mut other_staff = Vec::new();
        for entry in &self.other_staff {
            let member = store.staff_member(&entry.staff_id)?;
            if member.id == logger.id {
                continue;
            }
            if member.special {
                match non_blank(entry.manual_name.as_deref()) {
                    Some(name) => other_staff.push(StaffRef::named(&member.id, name)),
                    None => {
                        tracing::warn!(staff = %member.id, "special staff without a name dropped")
                    }
                }
            } else {
                other_staff.push(StaffRef::bare(&member.id));
            }
        }

        let how_to_respond = if risk_level.requires_abch() {
            HOW_TO_RESPOND_DEFAULT.to_string()
        } else {
            non_blank(self.how_to_respond.as_deref())
                .unwrap_or_else(|| HOW_TO_RESPOND_DEFAULT.to_string())
        };

        Ok(IncidentDraft {
            student_id: student.id.clone(),
            date,
            time: crate::schedule::to_minute(time),
            behaviour,
            antecedent,
            setting,
            support_type,
            risk_level,
            consequence,
            func_hypothesis,
            func_primary: self.func_primary,
            func_secondary: self.func_secondary,
            effectiveness,
            window_of_tolerance,
            context: non_blank(self.context.as_deref())
                .unwrap_or_else(|| BASIC_CONTEXT_DEFAULT.to_string()),
            notes: None,
            how_to_respond,
            logged_by,
            other_staff,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Appended straight to the store.
    Saved(Uuid),
    /// Staged; the ABCH follow-up must be completed before it is stored.
    FollowUpRequired,
}

/// Step one of every log. Low-risk incidents are stored immediately;
/// risk 3 and above are staged and the session moves to the follow-up.
pub fn submit_log(
    session: &mut Session,
    store: &mut Store,
    student_id: &str,
    form: &IncidentForm,
    origin: LogOrigin,
) -> AppResult<Submission> {
    let draft = form.validate(store, student_id)?;

    if draft.risk_level.requires_abch() {
        tracing::info!(
            student = %draft.student_id,
            risk = draft.risk_level.get(),
            "high-risk log staged for ABCH follow-up"
        );
        session.abch = AbchWorkflow::AwaitingFollowUp(Box::new(FollowUpDraft {
            draft,
            chronology: Vec::new(),
            origin,
            recovered_from: None,
        }));
        session.navigate_to(
            Page::AbchFollowUp,
            origin.role(),
            Mode::Home,
            Some(student_id.to_string()),
        );
        return Ok(Submission::FollowUpRequired);
    }

    let id = store.append(draft.into_incident(false, Outcomes::default()));
    origin.return_to(session, student_id);
    Ok(Submission::Saved(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpStatus {
    /// The draft staged by step one is in place.
    Live,
    /// No staged draft; an existing pending record was loaded instead.
    Recovered(Uuid),
}

/// Entry into step two. Without a staged draft for this student, falls back
/// to the newest pending high-risk record on file.
pub fn open_follow_up(
    session: &mut Session,
    store: &Store,
    student_id: &str,
) -> AppResult<FollowUpStatus> {
    let student = store.student(student_id)?;
    if session
        .abch
        .staged()
        .is_some_and(|staged| staged.draft.student_id == student.id)
    {
        return Ok(FollowUpStatus::Live);
    }

    let Some(pending) = store.latest_pending_follow_up(&student.id) else {
        return Err(AppError::MissingDraft {
            student: student.name.clone(),
        });
    };

    tracing::warn!(
        student = %student.id,
        incident = %pending.id,
        "no live incident data, loading most recent high-risk incident for ABCH completion"
    );
    let origin = session
        .role
        .map(LogOrigin::StaffArea)
        .unwrap_or(LogOrigin::QuickLog);
    session.abch = AbchWorkflow::AwaitingFollowUp(Box::new(FollowUpDraft {
        draft: pending.to_draft(),
        chronology: Vec::new(),
        origin,
        recovered_from: Some(pending.id),
    }));
    session.navigate_to(
        Page::AbchFollowUp,
        None,
        Mode::Home,
        Some(student.id.clone()),
    );
    Ok(FollowUpStatus::Recovered(pending.id))
}

/// Appends one layer to the staged timeline; returns the new layer count.
pub fn add_layer(session: &mut Session, layer: ChronologyLayer) -> AppResult<usize> {
    let staged = session.abch.staged_mut()?;
    staged.chronology.push(layer);
    tracing::debug!(layers = staged.chronology.len(), "chronology layer added");
    Ok(staged.chronology.len())
}

#[derive(Debug, Clone, Default)]
pub struct FollowUpForm {
    /// Refined function; the staged value is kept when not given.
    pub func_hypothesis: Option<FunctionalHypothesis>,
    pub window_of_tolerance: Option<WindowOfTolerance>,
    pub how_to_respond: String,
    pub final_summary: String,
    pub outcomes: Outcomes,
    pub safety_risk_plan: Option<String>,
    pub management_outcomes: Option<String>,
}

/// Folds the timeline and the clinical summary into the record's context.
/// Layer numbers follow the full timeline, including empty layers skipped here.
pub fn compose_context(chronology: &[ChronologyLayer], final_summary: &str) -> String {
    let mut context = String::from("Chronological Log:\n");
    for (index, layer) in chronology.iter().enumerate() {
        if !layer.has_observation() {
            continue;
        }
        let _ = writeln!(
            context,
            "Layer {} ({}): {}",
            index + 1,
            crate::schedule::format_time(layer.time),
            layer.describe()
        );
        if let Some(text) = non_blank(layer.context.as_deref()) {
            let _ = writeln!(context, "   - Context: {text}");
        }
    }
    let _ = write!(context, "\n---\nFinal Clinical Summary:\n{final_summary}");
    context
}

/// Completes the staged critical incident. On a missing mandatory field the
/// store and the staged draft are left untouched so the form can be retried.
pub fn finalize_follow_up(
    session: &mut Session,
    store: &mut Store,
    form: &FollowUpForm,
) -> AppResult<Uuid> {
    let staged = session.abch.staged().ok_or(AppError::NoFollowUpInProgress)?;
    let how_to_respond = non_blank(Some(form.how_to_respond.as_str()))
        .ok_or(AppError::MissingField("how_to_respond"))?;
    let final_summary = non_blank(Some(form.final_summary.as_str()))
        .ok_or(AppError::MissingField("final_summary"))?;

    let mut draft = staged.draft.clone();
    let origin = staged.origin;
    draft.context = compose_context(&staged.chronology, &final_summary);
    draft.how_to_respond = how_to_respond;
    if let Some(hypothesis) = form.func_hypothesis {
        draft.func_hypothesis = hypothesis;
    }
    if let Some(state) = form.window_of_tolerance {
        draft.window_of_tolerance = state;
    }
    let safety = non_blank(form.safety_risk_plan.as_deref());
    let management = non_blank(form.management_outcomes.as_deref());
    if safety.is_some() || management.is_some() {
        draft.notes = Some(format!(
            "Safety Risk Plan: {}\nManagement Outcomes: {}",
            safety.unwrap_or_default(),
            management.unwrap_or_default()
        ));
    }

    let student_id = draft.student_id.clone();
    let incident_id = store.append(draft.into_incident(true, form.outcomes));
    tracing::info!(incident = %incident_id, student = %student_id, "ABCH follow-up finalized");

    session.abch = AbchWorkflow::Finalized { incident_id };
    origin.return_to(session, &student_id);
    Ok(incident_id)
}
