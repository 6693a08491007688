use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::catalog::{
    Antecedent, Area, Behaviour, Consequence, Effectiveness, FunctionPrimary, FunctionSecondary,
    FunctionalHypothesis, Outcome, RiskLevel, SchoolSession, Setting, StaffRole, SupportType,
    WindowOfTolerance,
};
use crate::error::AppError;
use crate::schedule;

fn serialize_time<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&schedule::format_time(*time))
}

fn serialize_weekday<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(schedule::weekday_name(*day))
}

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub area: Area,
    pub grade: String,
    pub teacher: String,
    pub edid: String,
    pub dob: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub role: StaffRole,
    pub active: bool,
    /// Shared account standing for several people; references need a typed name.
    pub special: bool,
}

/// Reference to a staff record as stored on an incident: `s1` or `s_trt:Jane Doe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffRef {
    pub staff_id: String,
    pub manual_name: Option<String>,
}

impl StaffRef {
    pub fn bare(staff_id: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            manual_name: None,
        }
    }

    pub fn named(staff_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            manual_name: Some(name.into()),
        }
    }
}

impl fmt::Display for StaffRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.manual_name {
            Some(name) => write!(f, "{}:{}", self.staff_id, name),
            None => f.write_str(&self.staff_id),
        }
    }
}

impl FromStr for StaffRef {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value.split_once(':') {
            Some((id, name)) if !id.trim().is_empty() => {
                let name = name.trim();
                Ok(if name.is_empty() {
                    StaffRef::bare(id.trim())
                } else {
                    StaffRef::named(id.trim(), name)
                })
            }
            Some(_) => Err(AppError::StaffNotFound(value.to_string())),
            None if value.is_empty() => Err(AppError::MissingField("staff")),
            None => Ok(StaffRef::bare(value)),
        }
    }
}

impl Serialize for StaffRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcomes {
    pub send_home: bool,
    pub leave_area: bool,
    pub assault: bool,
    pub property_damage: bool,
    pub staff_injury: bool,
    pub sapol_callout: bool,
    pub ambulance: bool,
}

impl Outcomes {
    pub fn get(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::SendHome => self.send_home,
            Outcome::LeaveArea => self.leave_area,
            Outcome::Assault => self.assault,
            Outcome::PropertyDamage => self.property_damage,
            Outcome::StaffInjury => self.staff_injury,
            Outcome::SapolCallout => self.sapol_callout,
            Outcome::Ambulance => self.ambulance,
        }
    }

    pub fn set(&mut self, outcome: Outcome, value: bool) {
        let flag = match outcome {
            Outcome::SendHome => &mut self.send_home,
            Outcome::LeaveArea => &mut self.leave_area,
            Outcome::Assault => &mut self.assault,
            Outcome::PropertyDamage => &mut self.property_damage,
            Outcome::StaffInjury => &mut self.staff_injury,
            Outcome::SapolCallout => &mut self.sapol_callout,
            Outcome::Ambulance => &mut self.ambulance,
        };
        *flag = value;
    }

    pub fn from_checked(checked: &[Outcome]) -> Self {
        let mut outcomes = Outcomes::default();
        for outcome in checked {
            outcomes.set(*outcome, true);
        }
        outcomes
    }

    pub fn any(&self) -> bool {
        Outcome::ALL.iter().any(|outcome| self.get(*outcome))
    }
}

/// One observed moment within an unfolding critical incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChronologyLayer {
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveTime,
    pub location: Option<Setting>,
    pub antecedent: Option<Antecedent>,
    pub behaviour: Option<Behaviour>,
    pub consequence: Option<Consequence>,
    pub context: Option<String>,
}

impl ChronologyLayer {
    pub fn has_observation(&self) -> bool {
        self.location.is_some()
            || self.antecedent.is_some()
            || self.behaviour.is_some()
            || self.consequence.is_some()
            || self.context.as_deref().is_some_and(|text| !text.trim().is_empty())
    }

    /// `L: Yard; A: N/A; B: Elopement; C: N/A`
    pub fn describe(&self) -> String {
        fn or_na<T: fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
        }
        format!(
            "L: {}; A: {}; B: {}; C: {}",
            or_na(self.location),
            or_na(self.antecedent),
            or_na(self.behaviour),
            or_na(self.consequence)
        )
    }
}

/// Parses `HH:MM|location|antecedent|behaviour|consequence|context`; empty
/// parts are left unset and trailing parts may be omitted.
impl FromStr for ChronologyLayer {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(6, '|').map(str::trim);
        let time = schedule::parse_time(parts.next().unwrap_or_default())?;

        fn optional<T: FromStr<Err = AppError>>(part: Option<&str>) -> Result<Option<T>, AppError> {
            match part {
                Some(text) if !text.is_empty() && text != "-" => text.parse().map(Some),
                _ => Ok(None),
            }
        }

        Ok(ChronologyLayer {
            time,
            location: optional(parts.next())?,
            antecedent: optional(parts.next())?,
            behaviour: optional(parts.next())?,
            consequence: optional(parts.next())?,
            context: parts
                .next()
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        })
    }
}

/// Base incident fields captured by the logging form, before the record is
/// stamped with an id and its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentDraft {
    pub student_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub behaviour: Behaviour,
    pub antecedent: Antecedent,
    pub setting: Setting,
    pub support_type: SupportType,
    pub risk_level: RiskLevel,
    pub consequence: Consequence,
    pub func_hypothesis: FunctionalHypothesis,
    pub func_primary: Option<FunctionPrimary>,
    pub func_secondary: Option<FunctionSecondary>,
    pub effectiveness: Effectiveness,
    pub window_of_tolerance: WindowOfTolerance,
    pub context: String,
    pub notes: Option<String>,
    pub how_to_respond: String,
    pub logged_by: StaffRef,
    pub other_staff: Vec<StaffRef>,
}

impl IncidentDraft {
    /// Stamps a fresh id and the derived day/session. Outcome flags only
    /// survive on completed records.
    pub fn into_incident(self, completed: bool, outcomes: Outcomes) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            day: schedule::weekday_of(self.date),
            session: schedule::session_from_time(self.time),
            is_abch_completed: completed,
            outcomes: if completed { outcomes } else { Outcomes::default() },
            student_id: self.student_id,
            date: self.date,
            time: self.time,
            behaviour: self.behaviour,
            antecedent: self.antecedent,
            setting: self.setting,
            support_type: self.support_type,
            risk_level: self.risk_level,
            consequence: self.consequence,
            func_hypothesis: self.func_hypothesis,
            func_primary: self.func_primary,
            func_secondary: self.func_secondary,
            effectiveness: self.effectiveness,
            window_of_tolerance: self.window_of_tolerance,
            context: self.context,
            notes: self.notes,
            how_to_respond: self.how_to_respond,
            logged_by: self.logged_by,
            other_staff: self.other_staff,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: Uuid,
    pub student_id: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveTime,
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    pub session: SchoolSession,
    pub behaviour: Behaviour,
    pub antecedent: Antecedent,
    pub setting: Setting,
    pub support_type: SupportType,
    pub risk_level: RiskLevel,
    pub consequence: Consequence,
    pub func_hypothesis: FunctionalHypothesis,
    pub func_primary: Option<FunctionPrimary>,
    pub func_secondary: Option<FunctionSecondary>,
    pub effectiveness: Effectiveness,
    pub window_of_tolerance: WindowOfTolerance,
    pub context: String,
    pub notes: Option<String>,
    pub how_to_respond: String,
    pub logged_by: StaffRef,
    pub other_staff: Vec<StaffRef>,
    pub is_abch_completed: bool,
    pub outcomes: Outcomes,
}

impl Incident {
    /// Pending critical incident: high risk, never taken through the follow-up.
    pub fn awaits_follow_up(&self) -> bool {
        !self.is_abch_completed && self.risk_level.requires_abch()
    }

    pub fn to_draft(&self) -> IncidentDraft {
        IncidentDraft {
            student_id: self.student_id.clone(),
            date: self.date,
            time: self.time,
            behaviour: self.behaviour,
            antecedent: self.antecedent,
            setting: self.setting,
            support_type: self.support_type,
            risk_level: self.risk_level,
            consequence: self.consequence,
            func_hypothesis: self.func_hypothesis,
            func_primary: self.func_primary,
            func_secondary: self.func_secondary,
            effectiveness: self.effectiveness,
            window_of_tolerance: self.window_of_tolerance,
            context: self.context.clone(),
            notes: self.notes.clone(),
            how_to_respond: self.how_to_respond.clone(),
            logged_by: self.logged_by.clone(),
            other_staff: self.other_staff.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_ref_round_trips_special_names() {
        let named: StaffRef = "s_trt:Jane Doe".parse().unwrap();
        assert_eq!(named, StaffRef::named("s_trt", "Jane Doe"));
        assert_eq!(named.to_string(), "s_trt:Jane Doe");

        let bare: StaffRef = "s2".parse().unwrap();
        assert_eq!(bare.manual_name, None);
        assert!("".parse::<StaffRef>().is_err());
    }

    #[test]
    fn outcomes_track_checked_flags() {
        let outcomes = Outcomes::from_checked(&[Outcome::Assault, Outcome::Ambulance]);
        assert!(outcomes.assault && outcomes.ambulance);
        assert!(!outcomes.send_home);
        assert!(outcomes.any());
        assert!(!Outcomes::default().any());
    }

    #[test]
    fn layer_parses_from_pipe_format() {
        let layer: ChronologyLayer = "10:15|Yard||Elopement|-|Ran to the gate | then stopped"
            .parse()
            .unwrap();
        assert_eq!(layer.time, NaiveTime::from_hms_opt(10, 15, 0).unwrap());
        assert_eq!(layer.location, Some(Setting::Yard));
        assert_eq!(layer.antecedent, None);
        assert_eq!(layer.behaviour, Some(Behaviour::Elopement));
        assert_eq!(layer.consequence, None);
        assert_eq!(layer.context.as_deref(), Some("Ran to the gate | then stopped"));

        let bare: ChronologyLayer = "09:00".parse().unwrap();
        assert!(!bare.has_observation());
        assert!("9am|Yard".parse::<ChronologyLayer>().is_err());
        assert!("09:00|Moon".parse::<ChronologyLayer>().is_err());
    }

    #[test]
    fn empty_layer_has_no_observation() {
        let mut layer = ChronologyLayer {
            time: NaiveTime::from_hms_opt(10, 5, 0).unwrap(),
            location: None,
            antecedent: None,
            behaviour: None,
            consequence: None,
            context: Some("   ".to_string()),
        };
        assert!(!layer.has_observation());
        layer.behaviour = Some(Behaviour::Elopement);
        assert!(layer.has_observation());
        assert_eq!(layer.describe(), "L: N/A; A: N/A; B: Elopement; C: N/A");
    }
}
