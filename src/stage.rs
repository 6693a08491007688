use crate::catalog::{Behaviour, RiskLevel};

/// Position on the CPI verbal escalation continuum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ActingOut,
    Defensive,
    Questioning,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ActingOut => "High-Risk: Acting Out (Danger)",
            Stage::Defensive => "Peak Risk: Defensive",
            Stage::Questioning => "Low-Risk: Questioning / Refusal",
        }
    }

    /// Recommended staff response for the stage.
    pub fn response(&self) -> &'static str {
        match self {
            Stage::ActingOut => "Nonviolent Physical Crisis Intervention (where appropriate) followed by Therapeutic Rapport to restore the relationship immediately after the crisis.",
            Stage::Defensive => "Use Supportive language and Directive strategies (offering choices, clear limits) to guide the student toward an appropriate choice.",
            Stage::Questioning => "Use Information Seeking and Challenging questions as opportunities for connection and teaching appropriate ways to communicate needs.",
        }
    }
}

pub const ACTING_OUT_BEHAVIOURS: [Behaviour; 3] = [
    Behaviour::StaffAggression,
    Behaviour::SelfInjurious,
    Behaviour::PropertyDestruction,
];

pub const DEFENSIVE_BEHAVIOURS: [Behaviour; 3] = [
    Behaviour::PeerAggression,
    Behaviour::Elopement,
    Behaviour::VerbalRefusal,
];

struct StageRule {
    applies: fn(Behaviour, RiskLevel) -> bool,
    stage: Stage,
}

/// Evaluated top to bottom; the first match wins.
const RULES: [StageRule; 3] = [
    StageRule {
        applies: |behaviour, peak| ACTING_OUT_BEHAVIOURS.contains(&behaviour) || peak.get() >= 4,
        stage: Stage::ActingOut,
    },
    StageRule {
        applies: |behaviour, peak| DEFENSIVE_BEHAVIOURS.contains(&behaviour) || peak.get() == 3,
        stage: Stage::Defensive,
    },
    StageRule {
        applies: |_, _| true,
        stage: Stage::Questioning,
    },
];

pub fn classify(behaviour: Behaviour, peak_risk: RiskLevel) -> Stage {
    RULES
        .iter()
        .find(|rule| (rule.applies)(behaviour, peak_risk))
        .map(|rule| rule.stage)
        .unwrap_or(Stage::Questioning)
}
