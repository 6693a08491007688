use std::collections::HashMap;
use std::hash::Hash;

use chrono::{NaiveDate, Weekday};

use crate::catalog::{Behaviour, FunctionalHypothesis, Outcome, RiskLevel, SchoolSession, Setting};
use crate::models::Incident;
use crate::schedule;
use crate::stage::{self, Stage};

pub const TOP_BEHAVIOURS: usize = 5;
pub const ABCH_LABEL: &str = "Critical Incident (ABCH) - Activated";
pub const BASIC_LABEL: &str = "Basic Log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityBucket {
    pub risk_level: RiskLevel,
    pub completed: bool,
    pub count: usize,
}

impl SeverityBucket {
    pub fn label(&self) -> &'static str {
        if self.completed {
            ABCH_LABEL
        } else {
            BASIC_LABEL
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatCell {
    pub day: Weekday,
    pub slot: String,
    pub count: usize,
}

/// Totals over completed (ABCH) incidents only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeBreakdown {
    pub totals: Vec<(Outcome, usize)>,
    pub assault_by_behaviour: Vec<(Behaviour, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub modal_behaviour: Behaviour,
    pub peak_risk: RiskLevel,
    pub peak_day: Weekday,
    pub peak_session: SchoolSession,
    /// Most common setting among risk 4+ incidents.
    pub high_risk_setting: Option<Setting>,
}

/// Chart-ready aggregates for one student.
#[derive(Debug, Clone)]
pub struct StudentAnalysis<'a> {
    pub per_day: Vec<(NaiveDate, usize)>,
    pub severity: Vec<SeverityBucket>,
    pub by_setting: Vec<(Setting, usize)>,
    pub heatmap: Vec<HeatCell>,
    pub top_behaviours: Vec<(Behaviour, usize)>,
    pub functions: Vec<(FunctionalHypothesis, usize)>,
    pub outcomes: Option<OutcomeBreakdown>,
    pub summary: Summary,
    /// Newest completed incident, or the newest of any kind when none is.
    pub latest: &'a Incident,
}

/// Counts sorted by frequency, ties broken by label so modes are stable.
fn value_counts<K, I>(items: I, label: impl Fn(&K) -> String) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut map: HashMap<K, usize> = HashMap::new();
    for item in items {
        *map.entry(item).or_insert(0) += 1;
    }

    let mut counts: Vec<(K, usize)> = map.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| label(&a.0).cmp(&label(&b.0))));
    counts
}

fn mode<K, I>(items: I, label: impl Fn(&K) -> String) -> Option<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    value_counts(items, label).into_iter().next().map(|(key, _)| key)
}

pub fn modal_behaviour(incidents: &[&Incident]) -> Option<Behaviour> {
    mode(incidents.iter().map(|i| i.behaviour), |b| b.to_string())
}

pub fn peak_risk(incidents: &[&Incident]) -> Option<RiskLevel> {
    incidents.iter().map(|i| i.risk_level).max()
}

fn week_position(day: &Weekday) -> usize {
    schedule::WEEK_ORDER
        .iter()
        .position(|d| d == day)
        .unwrap_or(schedule::WEEK_ORDER.len())
}

impl<'a> StudentAnalysis<'a> {
    /// `incidents` is one student's history, newest first. Returns `None`
    /// when there is nothing to analyse.
    pub fn compute(incidents: &[&'a Incident]) -> Option<Self> {
        let newest = *incidents.first()?;
        let latest = incidents
            .iter()
            .copied()
            .find(|i| i.is_abch_completed)
            .unwrap_or(newest);

        let mut per_day: Vec<(NaiveDate, usize)> =
            value_counts(incidents.iter().map(|i| i.date), |d| d.to_string());
        per_day.sort_by_key(|(date, _)| *date);

        let mut severity: Vec<SeverityBucket> = value_counts(
            incidents.iter().map(|i| (i.risk_level, i.is_abch_completed)),
            |(risk, completed)| format!("{risk}{completed}"),
        )
        .into_iter()
        .map(|((risk_level, completed), count)| SeverityBucket {
            risk_level,
            completed,
            count,
        })
        .collect();
        severity.sort_by_key(|bucket| (bucket.risk_level, bucket.completed));

        let by_setting = value_counts(incidents.iter().map(|i| i.setting), |s| s.to_string());

        let mut heatmap: Vec<HeatCell> = value_counts(
            incidents
                .iter()
                .map(|i| (week_position(&i.day), i.day, schedule::time_slot(i.time))),
            |(position, _, slot)| format!("{position}{slot}"),
        )
        .into_iter()
        .map(|((_, day, slot), count)| HeatCell { day, slot, count })
        .collect();
        heatmap.sort_by(|a, b| {
            week_position(&a.day)
                .cmp(&week_position(&b.day))
                .then_with(|| a.slot.cmp(&b.slot))
        });

        let all_behaviours = value_counts(incidents.iter().map(|i| i.behaviour), |b| b.to_string());
        let modal_behaviour = modal_behaviour(incidents).unwrap_or(newest.behaviour);
        let top_behaviours = all_behaviours.into_iter().take(TOP_BEHAVIOURS).collect();

        let functions =
            value_counts(incidents.iter().map(|i| i.func_hypothesis), |f| f.to_string());

        let completed: Vec<&Incident> = incidents
            .iter()
            .copied()
            .filter(|i| i.is_abch_completed)
            .collect();
        let outcomes = (!completed.is_empty()).then(|| OutcomeBreakdown {
            totals: {
                let mut totals: Vec<(Outcome, usize)> = Outcome::ALL
                    .iter()
                    .map(|outcome| {
                        let count = completed.iter().filter(|i| i.outcomes.get(*outcome)).count();
                        (*outcome, count)
                    })
                    .collect();
                totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
                totals
            },
            assault_by_behaviour: value_counts(
                completed
                    .iter()
                    .filter(|i| i.outcomes.assault)
                    .map(|i| i.behaviour),
                |b| b.to_string(),
            ),
        });

        let summary = Summary {
            total: incidents.len(),
            completed: completed.len(),
            modal_behaviour,
            peak_risk: peak_risk(incidents).unwrap_or(newest.risk_level),
            peak_day: mode(incidents.iter().map(|i| i.day), |d| {
                schedule::weekday_name(*d).to_string()
            })
            .unwrap_or(newest.day),
            peak_session: mode(incidents.iter().map(|i| i.session), |s| s.to_string())
                .unwrap_or(newest.session),
            high_risk_setting: mode(
                incidents
                    .iter()
                    .filter(|i| i.risk_level.get() >= 4)
                    .map(|i| i.setting),
                |s| s.to_string(),
            ),
        };

        Some(Self {
            per_day,
            severity,
            by_setting,
            heatmap,
            top_behaviours,
            functions,
            outcomes,
            summary,
            latest,
        })
    }

    /// Stage shown in the interpretation panel, driven by the modal behaviour.
    pub fn pattern_stage(&self) -> Stage {
        stage::classify(self.summary.modal_behaviour, self.summary.peak_risk)
    }

    /// Stage quoted in the report, driven by the latest plan incident.
    pub fn plan_stage(&self) -> Stage {
        stage::classify(self.latest.behaviour, self.summary.peak_risk)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::catalog::{
        Antecedent, Consequence, Effectiveness, SupportType, WindowOfTolerance,
        HOW_TO_RESPOND_DEFAULT,
    };
    use crate::models::{IncidentDraft, Outcomes, StaffRef};

    fn incident(
        day: u32,
        time: (u32, u32),
        behaviour: Behaviour,
        risk: u8,
        setting: Setting,
        outcomes: Option<Outcomes>,
    ) -> Incident {
        IncidentDraft {
            student_id: "stu".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            behaviour,
            antecedent: Antecedent::Tired,
            setting,
            support_type: SupportType::Peer,
            risk_level: RiskLevel::new(risk).unwrap(),
            consequence: Consequence::TimeOut,
            func_hypothesis: FunctionalHypothesis::SeekGet,
            func_primary: None,
            func_secondary: None,
            effectiveness: Effectiveness::Ineffective,
            window_of_tolerance: WindowOfTolerance::Coping,
            context: String::new(),
            notes: None,
            how_to_respond: HOW_TO_RESPOND_DEFAULT.to_string(),
            logged_by: StaffRef::bare("s1"),
            other_staff: Vec::new(),
        }
        .into_incident(outcomes.is_some(), outcomes.unwrap_or_default())
    }

    fn newest_first(incidents: &[Incident]) -> Vec<&Incident> {
        let mut refs: Vec<&Incident> = incidents.iter().collect();
        refs.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
        refs
    }

    #[test]
    fn empty_history_has_no_analysis() {
        assert!(StudentAnalysis::compute(&[]).is_none());
    }

    #[test]
    fn aggregates_one_student() {
        let assault = Outcomes {
            assault: true,
            ..Outcomes::default()
        };
        let incidents = vec![
            // 2026-03-02 is a Monday.
            incident(2, (10, 47), Behaviour::Elopement, 2, Setting::Yard, None),
            incident(2, (10, 31), Behaviour::Elopement, 4, Setting::Yard, Some(assault)),
            incident(3, (9, 5), Behaviour::OutOfSeat, 1, Setting::Classroom, None),
            incident(4, (13, 40), Behaviour::StaffAggression, 5, Setting::Gate, Some(assault)),
            incident(5, (14, 10), Behaviour::OutOfSeat, 1, Setting::Classroom, None),
        ];
        let refs = newest_first(&incidents);
        let analysis = StudentAnalysis::compute(&refs).unwrap();

        assert_eq!(analysis.per_day.len(), 4);
        assert_eq!(analysis.per_day[0], (NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 2));

        let monday = &analysis.heatmap[0];
        assert_eq!((monday.day, monday.slot.as_str(), monday.count), (Weekday::Mon, "10:30", 2));

        assert_eq!(analysis.summary.total, 5);
        assert_eq!(analysis.summary.completed, 2);
        // Elopement and Out of Seat tie; the smaller label wins.
        assert_eq!(analysis.summary.modal_behaviour, Behaviour::Elopement);
        assert_eq!(analysis.summary.peak_risk.get(), 5);
        assert_eq!(analysis.summary.peak_day, Weekday::Mon);
        assert_eq!(analysis.summary.high_risk_setting, Some(Setting::Gate));

        // Newest completed incident is the Wednesday staff aggression.
        assert_eq!(analysis.latest.behaviour, Behaviour::StaffAggression);
        assert_eq!(analysis.plan_stage(), Stage::ActingOut);
        assert_eq!(analysis.pattern_stage(), Stage::ActingOut);

        let breakdown = analysis.outcomes.as_ref().unwrap();
        assert_eq!(breakdown.totals[0], (Outcome::Assault, 2));
        assert_eq!(breakdown.totals.len(), Outcome::ALL.len());
        assert_eq!(
            breakdown.assault_by_behaviour,
            vec![(Behaviour::Elopement, 1), (Behaviour::StaffAggression, 1)]
        );

        assert_eq!(
            analysis.severity.iter().map(|b| b.count).sum::<usize>(),
            5
        );
        assert!(analysis.severity.windows(2).all(|w| w[0].risk_level <= w[1].risk_level));
    }

    #[test]
    fn latest_falls_back_to_newest_when_nothing_completed() {
        let incidents = vec![
            incident(2, (9, 0), Behaviour::OutOfSeat, 1, Setting::Library, None),
            incident(9, (9, 0), Behaviour::NonCompliance, 2, Setting::Library, None),
        ];
        let refs = newest_first(&incidents);
        let analysis = StudentAnalysis::compute(&refs).unwrap();
        assert_eq!(analysis.latest.behaviour, Behaviour::NonCompliance);
        assert!(analysis.outcomes.is_none());
        assert_eq!(analysis.summary.high_risk_setting, None);
        assert_eq!(analysis.pattern_stage(), Stage::Questioning);
    }

    #[test]
    fn top_behaviours_capped_at_five() {
        let incidents: Vec<Incident> = Behaviour::ALL
            .iter()
            .enumerate()
            .map(|(n, b)| incident(1 + n as u32, (9, 0), *b, 1, Setting::Yard, None))
            .collect();
        let refs = newest_first(&incidents);
        let analysis = StudentAnalysis::compute(&refs).unwrap();
        assert_eq!(analysis.top_behaviours.len(), TOP_BEHAVIOURS);
    }
}
