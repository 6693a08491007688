use chrono::{NaiveDate, NaiveTime};
use clap::Args;

use crate::catalog::{
    Antecedent, Behaviour, Consequence, Effectiveness, FunctionPrimary, FunctionSecondary,
    FunctionalHypothesis, Outcome, RiskLevel, Setting, SupportType, WindowOfTolerance,
};
use crate::models::{ChronologyLayer, Outcomes, StaffRef};
use crate::schedule;
use crate::workflow::{FollowUpForm, IncidentForm};

/// Fields of the incident log form. Values are matched loosely against the
/// display labels, so `--behaviour elopement` and `--support 1:1` both work.
#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Incident date (YYYY-MM-DD), today when omitted
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Incident time (HH:MM), now when omitted
    #[arg(long, value_parser = schedule::parse_time)]
    pub time: Option<NaiveTime>,
    #[arg(long)]
    pub behaviour: Option<Behaviour>,
    #[arg(long)]
    pub antecedent: Option<Antecedent>,
    #[arg(long)]
    pub setting: Option<Setting>,
    #[arg(long)]
    pub support: Option<SupportType>,
    /// Risk level 1-5; 3 and above requires the ABCH follow-up
    #[arg(long)]
    pub risk: Option<RiskLevel>,
    #[arg(long)]
    pub consequence: Option<Consequence>,
    /// Functional hypothesis
    #[arg(long)]
    pub function: Option<FunctionalHypothesis>,
    #[arg(long)]
    pub primary: Option<FunctionPrimary>,
    #[arg(long)]
    pub secondary: Option<FunctionSecondary>,
    /// Window of tolerance
    #[arg(long)]
    pub wot: Option<WindowOfTolerance>,
    #[arg(long)]
    pub effectiveness: Option<Effectiveness>,
    /// Staff id of the person logging
    #[arg(long)]
    pub logged_by: Option<String>,
    /// Personal name, required when logging as a shared account
    #[arg(long)]
    pub logged_by_name: Option<String>,
    /// Other staff involved, `ID` or `ID:Name` (repeatable)
    #[arg(long = "other-staff")]
    pub other_staff: Vec<StaffRef>,
    #[arg(long)]
    pub context: Option<String>,
    /// Response plan for low-risk logs
    #[arg(long)]
    pub plan: Option<String>,
}

impl LogArgs {
    pub fn into_form(self, today: NaiveDate, now: NaiveTime) -> IncidentForm {
        IncidentForm {
            date: Some(self.date.unwrap_or(today)),
            time: Some(self.time.unwrap_or(now)),
            behaviour: self.behaviour,
            antecedent: self.antecedent,
            setting: self.setting,
            support_type: self.support,
            risk_level: self.risk,
            consequence: self.consequence,
            func_hypothesis: self.function,
            func_primary: self.primary,
            func_secondary: self.secondary,
            window_of_tolerance: self.wot,
            effectiveness: self.effectiveness,
            logged_by: self.logged_by,
            logged_by_name: self.logged_by_name,
            other_staff: self.other_staff,
            context: self.context,
            how_to_respond: self.plan,
        }
    }
}

/// One chronology layer of the follow-up timeline.
#[derive(Args, Debug, Clone, Default)]
pub struct LayerArgs {
    /// Layer time (HH:MM), now when omitted
    #[arg(long, value_parser = schedule::parse_time)]
    pub time: Option<NaiveTime>,
    #[arg(long)]
    pub location: Option<Setting>,
    #[arg(long)]
    pub antecedent: Option<Antecedent>,
    #[arg(long)]
    pub behaviour: Option<Behaviour>,
    #[arg(long)]
    pub consequence: Option<Consequence>,
    #[arg(long)]
    pub context: Option<String>,
}

impl LayerArgs {
    pub fn into_layer(self, now: NaiveTime) -> ChronologyLayer {
        ChronologyLayer {
            time: schedule::to_minute(self.time.unwrap_or(now)),
            location: self.location,
            antecedent: self.antecedent,
            behaviour: self.behaviour,
            consequence: self.consequence,
            context: self.context,
        }
    }
}

/// Closing fields of the ABCH follow-up.
#[derive(Args, Debug, Clone, Default)]
pub struct FinalizeArgs {
    #[arg(long)]
    pub refined_function: Option<FunctionalHypothesis>,
    #[arg(long)]
    pub refined_wot: Option<WindowOfTolerance>,
    /// Action plan; one step per line
    #[arg(long)]
    pub how_to_respond: Option<String>,
    /// Final clinical summary
    #[arg(long)]
    pub summary: Option<String>,
    /// Severe outcome that occurred (repeatable)
    #[arg(long)]
    pub outcome: Vec<Outcome>,
    #[arg(long)]
    pub safety_plan: Option<String>,
    #[arg(long)]
    pub management: Option<String>,
}

impl FinalizeArgs {
    pub fn into_form(self) -> FollowUpForm {
        FollowUpForm {
            func_hypothesis: self.refined_function,
            window_of_tolerance: self.refined_wot,
            how_to_respond: self.how_to_respond.unwrap_or_default(),
            final_summary: self.summary.unwrap_or_default(),
            outcomes: Outcomes::from_checked(&self.outcome),
            safety_risk_plan: self.safety_plan,
            management_outcomes: self.management,
        }
    }
}
