use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, NaiveDate};

use crate::analytics::{self, StudentAnalysis};
use crate::catalog::HOW_TO_RESPOND_DEFAULT;
use crate::models::{Incident, Student};
use crate::stage;
use crate::store::Store;

pub const REVIEW_PERIOD_DAYS: i64 = 30;

/// `BPP_Report_Marcus_A._20260302.txt`
pub fn report_filename(student: &Student, today: NaiveDate) -> String {
    format!(
        "BPP_Report_{}_{}.txt",
        student.name.replace(' ', "_"),
        today.format("%Y%m%d")
    )
}

/// Bulleted action steps from a free-text plan, one per non-empty line.
pub fn action_steps(how_to_respond: &str) -> String {
    let plan = how_to_respond.trim();
    if plan.is_empty() || plan == HOW_TO_RESPOND_DEFAULT {
        return format!("*{HOW_TO_RESPOND_DEFAULT}*");
    }

    plan.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("* {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the Behaviour Profile Plan for a student from their incident
/// history and the incident the plan is based on.
pub fn build_report(
    student: &Student,
    latest: Option<&Incident>,
    incidents: &[&Incident],
    today: NaiveDate,
) -> String {
    let total = incidents.len();
    let abch_count = incidents.iter().filter(|i| i.is_abch_completed).count();
    let modal = analytics::modal_behaviour(incidents);
    let peak = analytics::peak_risk(incidents);

    let or_na = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());
    let from_latest = |field: fn(&Incident) -> String| or_na(latest.map(field));

    let (stage_name, stage_response) = match (latest, peak) {
        (Some(incident), Some(peak)) => {
            let stage = stage::classify(incident.behaviour, peak);
            (stage.as_str(), stage.response())
        }
        _ => ("Unknown", "N/A"),
    };
    let steps = action_steps(latest.map_or(HOW_TO_RESPOND_DEFAULT, |i| i.how_to_respond.as_str()));

    let mut output = String::new();
    let _ = writeln!(output, "# BEHAVIOUR PROFILE PLAN (BPP)");
    let _ = writeln!(output, "## Student: {} (EDID: {})", student.name, student.edid);
    let _ = writeln!(output, "**Date Generated:** {}", today.format("%Y-%m-%d"));
    let _ = writeln!(
        output,
        "**Review Date:** {}",
        (today + Duration::days(REVIEW_PERIOD_DAYS)).format("%Y-%m-%d")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output);

    let _ = writeln!(output, "## 1. Summary of Clinical Findings and Data Analysis");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Metric | Detail |");
    let _ = writeln!(output, "| :--- | :--- |");
    let _ = writeln!(output, "| **Total Incidents Logged** | {total} |");
    let _ = writeln!(output, "| **Critical Incidents (ABCH)** | {abch_count} |");
    let _ = writeln!(
        output,
        "| **Most Frequent Behaviour** | {} |",
        or_na(modal.map(|b| b.to_string()))
    );
    let _ = writeln!(
        output,
        "| **Peak Risk Level Observed** | {} |",
        or_na(peak.map(|r| r.to_string()))
    );
    let _ = writeln!(
        output,
        "| **Primary Hypothesized Function** | {} |",
        from_latest(|i| i.func_hypothesis.to_string())
    );
    let _ = writeln!(
        output,
        "| **Primary Antecedent (Trigger)** | {} |",
        from_latest(|i| i.antecedent.to_string())
    );
    let _ = writeln!(
        output,
        "| **Window of Tolerance State** | {} |",
        from_latest(|i| i.window_of_tolerance.to_string())
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output);

    let _ = writeln!(output, "## 2. Comprehensive Action Plan (How to Respond)");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "This section outlines the immediate and strategic responses derived from the last critical incident analysis."
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "### Primary De-escalation Strategy (The 'H' in ABCH)");
    let _ = writeln!(output, "**Last Updated:** {}", from_latest(|i| i.date.to_string()));
    let _ = writeln!(output, "{steps}");
    let _ = writeln!(output);
    let _ = writeln!(output, "### Crisis Prevention Institute (CPI) Protocol");
    let _ = writeln!(
        output,
        "The student is currently demonstrating behaviours aligning with the **{stage_name}** stage of the CPI Verbal Escalation Continuum."
    );
    let _ = writeln!(output, "* **Recommended Staff Response:** {stage_response}");
    let _ = writeln!(
        output,
        "* **Goal:** Maintain safety and use *Supportive* and *Directive* nonverbal strategies to prevent escalation."
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output);

    let _ = writeln!(output, "## 3. Trauma-Informed (Berry Street) Strategy");
    let _ = writeln!(
        output,
        "The core strategy focuses on **De-escalation and Rhythms** (calming the nervous system) and **Relationships** (re-establishing safety)."
    );
    let _ = writeln!(
        output,
        "* **Focus during escalation:** Ensure a calm, predictable presence. Use neutral body language and provide choices to restore a sense of control."
    );
    let _ = writeln!(
        output,
        "* **Focus post-incident:** Prioritize therapeutic rapport. This involves a planned, brief check-in to repair the relationship and process the event, reinforcing that the student is safe and valued."
    );
    let _ = writeln!(
        output,
        "* **Focus for Proactive Teaching:** Identify and create an area of contribution within the classroom to shift the student's sense of self from 'problem' to 'valued member'."
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output);

    let _ = writeln!(output, "## 4. Chronological Incident Context (Last Detailed Log)");
    let _ = writeln!(output);
    let _ = writeln!(output, "### Incident Date: {}", from_latest(|i| i.date.to_string()));
    let _ = writeln!(output, "### Final Summary: {}", from_latest(|i| i.context.clone()));
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "*This Behaviour Profile Plan is a dynamic document and must be reviewed after any further critical incident or after {REVIEW_PERIOD_DAYS} calendar days.*"
    );

    output
}

/// Writes the student's BPP into `out_dir` under its download filename.
pub fn write_report(
    store: &Store,
    student: &Student,
    out_dir: &Path,
    today: NaiveDate,
) -> anyhow::Result<PathBuf> {
    let incidents = store.incidents_for(&student.id);
    let latest = StudentAnalysis::compute(&incidents).map(|analysis| analysis.latest);
    let report = build_report(student, latest, &incidents, today);

    let out = out_dir.join(report_filename(student, today));
    std::fs::write(&out, report).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(student = %student.id, path = %out.display(), "report written");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::catalog::{
        Antecedent, Area, Behaviour, Consequence, Effectiveness, FunctionalHypothesis, RiskLevel,
        Setting, SupportType, WindowOfTolerance,
    };
    use crate::models::{IncidentDraft, Outcomes, StaffRef};

    fn student() -> Student {
        Student {
            id: "stu_jp_high".to_string(),
            name: "Marcus A.".to_string(),
            area: Area::Jp,
            grade: "R".to_string(),
            teacher: "Smith".to_string(),
            edid: "JP001A".to_string(),
            dob: NaiveDate::from_ymd_opt(2019, 3, 15).unwrap(),
        }
    }

    fn incident(behaviour: Behaviour, risk: u8, plan: &str, completed: bool) -> Incident {
        IncidentDraft {
            student_id: "stu_jp_high".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
            time: NaiveTime::from_hms_opt(11, 15, 0).unwrap(),
            behaviour,
            antecedent: Antecedent::LimitSetting,
            setting: Setting::Classroom,
            support_type: SupportType::OneToOne,
            risk_level: RiskLevel::new(risk).unwrap(),
            consequence: Consequence::TimeOut,
            func_hypothesis: FunctionalHypothesis::AvoidEscape,
            func_primary: None,
            func_secondary: None,
            effectiveness: Effectiveness::Worsened,
            window_of_tolerance: WindowOfTolerance::HyperAroused,
            context: "Chronological Log:\n".to_string(),
            notes: None,
            how_to_respond: plan.to_string(),
            logged_by: StaffRef::bare("s1"),
            other_staff: Vec::new(),
        }
        .into_incident(completed, Outcomes::default())
    }

    #[test]
    fn filename_replaces_spaces() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(report_filename(&student(), today), "BPP_Report_Marcus_A._20260302.txt");
    }

    #[test]
    fn action_steps_become_bullets() {
        assert_eq!(
            action_steps("Offer choices\n\n  Use break card "),
            "* Offer choices\n* Use break card"
        );
        assert_eq!(action_steps(HOW_TO_RESPOND_DEFAULT), format!("*{HOW_TO_RESPOND_DEFAULT}*"));
        assert_eq!(action_steps("   "), format!("*{HOW_TO_RESPOND_DEFAULT}*"));
    }

    #[test]
    fn report_includes_summary_stage_and_review_date() {
        let plan = incident(Behaviour::Elopement, 3, "Offer two choices", true);
        let other = incident(Behaviour::Elopement, 2, HOW_TO_RESPOND_DEFAULT, false);
        let incidents = vec![&plan, &other];
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let report = build_report(&student(), Some(&plan), &incidents, today);

        assert!(report
            .starts_with("# BEHAVIOUR PROFILE PLAN (BPP)\n## Student: Marcus A. (EDID: JP001A)"));
        assert!(report.contains("**Date Generated:** 2026-03-02"));
        assert!(report.contains("**Review Date:** 2026-04-01"));
        assert!(report.contains("| **Total Incidents Logged** | 2 |"));
        assert!(report.contains("| **Critical Incidents (ABCH)** | 1 |"));
        assert!(report.contains("| **Peak Risk Level Observed** | 3 |"));
        assert!(report.contains("**Peak Risk: Defensive**"));
        assert!(report.contains("* Offer two choices"));
        assert!(report.contains("### Incident Date: 2026-02-27"));
    }

    #[test]
    fn report_is_written_under_its_filename() {
        let store = Store::new(
            crate::mock::student_roster(),
            crate::mock::staff_roster(),
            vec![incident(Behaviour::PeerAggression, 4, "Move peers away", true)],
        );
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let dir = std::env::temp_dir().join(format!("bpp-report-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let student = store.student("stu_jp_high").unwrap();
        let path = write_report(&store, student, &dir, today).unwrap();
        assert!(path.ends_with("BPP_Report_Marcus_A._20260302.txt"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("**High-Risk: Acting Out (Danger)**"));
        assert!(text.contains("* Move peers away"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn report_without_history_uses_placeholders() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let report = build_report(&student(), None, &[], today);
        assert!(report.contains("| **Most Frequent Behaviour** | N/A |"));
        assert!(report.contains("**Unknown** stage"));
        assert!(report.contains(&format!("*{HOW_TO_RESPOND_DEFAULT}*")));
    }
}
