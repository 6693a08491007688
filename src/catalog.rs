use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppError;

pub const HOW_TO_RESPOND_DEFAULT: &str = "No detailed plan required or specified.";
pub const BASIC_CONTEXT_DEFAULT: &str = "Basic log captured. No detailed context entered.";

/// Declares a fixed vocabulary with display labels.
///
/// Parsing accepts the label itself (case-insensitive) or any spelling with
/// the same letters and digits, so `physical-aggression-staff` resolves to
/// `Physical Aggression (Staff)`.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                lookup_label($name::ALL, value, |item| item.label()).ok_or_else(|| {
                    AppError::UnknownValue {
                        kind: stringify!($name),
                        value: value.to_string(),
                    }
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn lookup_label<T: Copy>(
    items: &[T],
    value: &str,
    label: impl Fn(&T) -> &'static str,
) -> Option<T> {
    let trimmed = value.trim();
    if let Some(found) = items.iter().find(|item| label(item).eq_ignore_ascii_case(trimmed)) {
        return Some(*found);
    }

    let wanted = normalize(trimmed);
    if wanted.is_empty() {
        return None;
    }
    items.iter().copied().find(|item| normalize(label(item)) == wanted)
}

labelled_enum!(
    /// School zone a student belongs to.
    Area {
        Jp => "JP",
        Py => "PY",
        Sy => "SY",
    }
);

labelled_enum!(
    StaffRole {
        Jp => "JP",
        Py => "PY",
        Sy => "SY",
        Adm => "ADM",
        Trt => "TRT",
        Sso => "SSO",
    }
);

labelled_enum!(
    /// Role a user signs into the staff area with.
    Role {
        Jp => "JP",
        Py => "PY",
        Sy => "SY",
        Adm => "ADM",
    }
);

impl Role {
    /// Area whose students this role browses; administrators have none.
    pub fn area(&self) -> Option<Area> {
        match self {
            Role::Jp => Some(Area::Jp),
            Role::Py => Some(Area::Py),
            Role::Sy => Some(Area::Sy),
            Role::Adm => None,
        }
    }
}

labelled_enum!(
    Behaviour {
        VerbalRefusal => "Verbal Refusal",
        Elopement => "Elopement",
        PropertyDestruction => "Property Destruction",
        PeerAggression => "Aggression (Peer)",
        SelfInjurious => "Self-Injurious Behaviour",
        OutOfSeat => "Out of Seat",
        NonCompliance => "Non-Compliance",
        StaffAggression => "Physical Aggression (Staff)",
    }
);

labelled_enum!(
    WindowOfTolerance {
        HypoAroused => "Hypo-aroused",
        HyperAroused => "Hyper-aroused",
        Coping => "Coping",
    }
);

labelled_enum!(
    Setting {
        Classroom => "Classroom",
        Gate => "Gate",
        Yard => "Yard",
        Playground => "Playground",
        Toilets => "Toilets",
        Admin => "Admin",
        SpillOut => "Spill out",
        Kitchen => "Kitchen",
        Library => "Library",
        Excursion => "Excursion",
        Swimming => "Swimming",
        BusVan => "Bus/Van",
        SpecialistLesson => "Specialist Lesson",
    }
);

labelled_enum!(
    SupportType {
        Unstructured => "Unstructured",
        SmallGroup => "Small Group",
        Independent => "Independent",
        LargeGroup => "Large Group",
        Peer => "Peer",
        OneToOne => "1:1",
    }
);

labelled_enum!(
    Antecedent {
        PeerInteraction => "Peer Interaction",
        Tired => "Tired",
        Hungry => "Hungry",
        Transition => "Transition",
        RoutineChange => "Routine Change",
        EnvironmentalDisturbance => "Environmental Disturbance",
        LimitSetting => "Limit Setting",
        GroupWork => "Group Work",
        AdultDemand => "Adult Demand",
        NoMedication => "No Medication",
        TaskDemand => "Task Demand",
        Other => "Other",
    }
);

labelled_enum!(
    FunctionalHypothesis {
        SeekGet => "Seek/Get Something",
        AvoidEscape => "Avoid/Escape Something",
        SelfStimulation => "Self Stimulation",
    }
);

labelled_enum!(
    FunctionPrimary {
        Sensory => "Sensory",
        Social => "Social",
        TangibleActivity => "Tangible/Activity",
    }
);

labelled_enum!(
    FunctionSecondary {
        Peer => "Peer",
        Adult => "Adult",
        Unspecified => "-",
    }
);

labelled_enum!(
    Consequence {
        Redirection => "Redirection/Prompt",
        TimeOut => "Time-Out (Brief)",
        PlannedIgnoring => "Ignored (Planned)",
        PreferredActivity => "Preferred Activity Access",
    }
);

labelled_enum!(
    Effectiveness {
        HighlyEffective => "Highly Effective",
        ModeratelyEffective => "Moderately Effective",
        Ineffective => "Ineffective",
        Worsened => "Worsened Behaviour",
    }
);

labelled_enum!(
    /// Part of the school day an incident falls in.
    SchoolSession {
        Morning => "Morning (8:30-11:00)",
        Middle => "Middle (11:01-1:00)",
        Afternoon => "Afternoon (1:01-3:00)",
        OutsideHours => "Outside Hours",
    }
);

labelled_enum!(
    /// Severe outcomes recorded on a completed critical incident.
    Outcome {
        SendHome => "Send Home",
        LeaveArea => "Leave Area",
        Assault => "Assault",
        PropertyDamage => "Property Damage",
        StaffInjury => "Staff Injury",
        SapolCallout => "Sapol Callout",
        Ambulance => "Ambulance",
    }
);

impl Outcome {
    /// Checklist wording shown on the follow-up form.
    pub fn checklist_label(&self) -> &'static str {
        match self {
            Outcome::SendHome => "Sent home",
            Outcome::LeaveArea => "Required student to leave area (Exclusion)",
            Outcome::Assault => "Physical assault (Student to Staff/Peer)",
            Outcome::PropertyDamage => "Property damage (Significant)",
            Outcome::StaffInjury => "Staff Injury (Required first aid/medical)",
            Outcome::SapolCallout => "SAPOL Callout",
            Outcome::Ambulance => "Ambulance Callout",
        }
    }
}

/// Incident risk on the 1 (low) to 5 (extreme) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RiskLevel(u8);

impl RiskLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    /// Lowest level that routes a standard log through the ABCH follow-up.
    pub const ABCH_THRESHOLD: u8 = 3;

    pub fn new(level: u8) -> Result<Self, AppError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(AppError::InvalidRiskLevel(level as i64))
        }
    }

    pub fn all() -> impl Iterator<Item = RiskLevel> {
        (Self::MIN..=Self::MAX).map(RiskLevel)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn requires_abch(&self) -> bool {
        self.0 >= Self::ABCH_THRESHOLD
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed: i64 = value.trim().parse().map_err(|_| AppError::UnknownValue {
            kind: "RiskLevel",
            value: value.to_string(),
        })?;
        u8::try_from(parsed)
            .map_err(|_| AppError::InvalidRiskLevel(parsed))
            .and_then(RiskLevel::new)
    }
}

pub struct RiskGuideRow {
    pub level: u8,
    pub severity: &'static str,
    pub characteristics: &'static str,
    pub intervention: &'static str,
}

pub const RISK_GUIDE: [RiskGuideRow; 5] = [
    RiskGuideRow {
        level: 1,
        severity: "Low Risk",
        characteristics: "Minor non-compliance, brief distraction, low-level disruption.",
        intervention: "Simple redirection or verbal prompt.",
    },
    RiskGuideRow {
        level: 2,
        severity: "Moderate Risk",
        characteristics: "Repeated refusal, sustained low-level defiance, brief elopement (easily retrieved).",
        intervention: "Planned ignoring, re-engagement strategy, 1:1 check-in.",
    },
    RiskGuideRow {
        level: 3,
        severity: "Substantial Risk",
        characteristics: "Verbal aggression, property destruction (minor), sustained non-compliance, elopement (requires active search).",
        intervention: "Tactical retreat, use of protective break space, referral for support.",
    },
    RiskGuideRow {
        level: 4,
        severity: "High Risk",
        characteristics: "Physical aggression (no injury), significant property destruction, self-injurious behaviour (low severity).",
        intervention: "Physical intervention (only if trained and necessary), emergency call for assistance.",
    },
    RiskGuideRow {
        level: 5,
        severity: "Extreme Risk",
        characteristics: "Physical aggression resulting in injury, substantial risk to the health and safety of others. Pattern of persistent Level 4.",
        intervention: "Emergency intervention or hospitalization, long-term suspension or expulsion, and law enforcement involvement.",
    },
];
