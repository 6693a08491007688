use std::fmt::Write;

use chrono::NaiveDate;

use crate::analytics::StudentAnalysis;
use crate::catalog::{Area, Behaviour, Outcome, RISK_GUIDE};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{Incident, Student};
use crate::report;
use crate::schedule;
use crate::session::{Session, View};
use crate::store::Store;

const BAR_WIDTH: usize = 30;

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(width)
}

fn count_table<K: std::fmt::Display>(output: &mut String, title: &str, rows: &[(K, usize)]) {
    let _ = writeln!(output, "##### {title}");
    let max = rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let width = rows
        .iter()
        .map(|(key, _)| key.to_string().len())
        .max()
        .unwrap_or(0);
    for (key, count) in rows {
        let _ = writeln!(
            output,
            "  {:<width$} {:>3} {}",
            key.to_string(),
            count,
            bar(*count, max)
        );
    }
    let _ = writeln!(output);
}

/// Renders whatever the session currently routes to.
pub fn render(
    session: &Session,
    store: &Store,
    config: &Config,
    today: NaiveDate,
) -> AppResult<String> {
    match session.route() {
        View::Landing => Ok(landing(store, config)),
        View::AreaStudents(area) => Ok(area_students(store, area)),
        View::AdminDashboard => Ok(admin_dashboard(store)),
        View::StudentAnalysis(id) => student_analysis(store, &id, today),
        View::LogForm(id) | View::QuickLogForm(id) => log_form(store, &id),
        View::FollowUp(id) => follow_up(session, store, &id),
        View::StaffManagement => Ok(staff_management(store)),
        View::AddStaff => Ok(
            "### Add New Staff Account (Placeholder)\nForm to add new staff members will go here.\n"
                .to_string(),
        ),
        View::AllIncidents => Ok(all_incidents(store)),
    }
}

pub fn landing(store: &Store, config: &Config) -> String {
    let mut output = String::new();
    if let Some(warning) = config.background_warning() {
        let _ = writeln!(output, "WARNING: {warning}");
        let _ = writeln!(output);
    }
    let _ = writeln!(output, "## Behaviour Support & Data Analysis Tool");
    let _ = writeln!(output, "### Please select your area or a student to log an incident.");
    let _ = writeln!(output);
    let _ = writeln!(output, "Staff Area Login: `area JP|PY|SY|ADM`");
    let _ = writeln!(output, "Quick Incident Log: `quick <student name>`");
    let _ = writeln!(output);

    let mut names: Vec<&str> = store.students().iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    let _ = writeln!(output, "Students: {}", names.join(", "));
    output
}

pub fn area_students(store: &Store, area: Area) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "### Students in the {area} Area");
    let students = store.students_in(area);
    if students.is_empty() {
        let _ = writeln!(output, "No students assigned to this area.");
        return output;
    }

    for student in students {
        let _ = writeln!(
            output,
            "- {} [{}] Grade: {} | Teacher: {} | Incidents: {}",
            student.name,
            student.id,
            student.grade,
            student.teacher,
            store.incidents_for(&student.id).len()
        );
    }
    output
}

pub fn admin_dashboard(store: &Store) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "### System Administration Dashboard");
    let _ = writeln!(output, "Total Incidents Logged: {}", store.len());
    let _ = writeln!(output, "Detailed ABCH Logs: {}", store.completed_count());
    let _ = writeln!(output, "Total Staff Accounts: {}", store.staff().len());
    let _ = writeln!(output);

    if store.incidents().is_empty() {
        let _ = writeln!(output, "No incident data available.");
        return output;
    }
    let all: Vec<&Incident> = store.incidents().iter().collect();
    let mut top: Vec<(Behaviour, usize)> = Behaviour::ALL
        .iter()
        .map(|b| (*b, all.iter().filter(|i| i.behaviour == *b).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
    top.truncate(5);
    count_table(&mut output, "Top 5 Most Frequent Behaviours (All Students)", &top);
    output
}

pub fn risk_guide() -> String {
    let mut output = String::new();
    let _ = writeln!(output, "##### Behaviour Risk Level Guide");
    let _ = writeln!(
        output,
        "| Level | Severity | Common Characteristics | Example Intervention/Impact |"
    );
    let _ = writeln!(output, "| :---: | :--- | :--- | :--- |");
    for row in &RISK_GUIDE {
        let _ = writeln!(
            output,
            "| **{}** | **{}** | {} | *{}* |",
            row.level, row.severity, row.characteristics, row.intervention
        );
    }
    output
}

fn student_header(output: &mut String, student: &Student) {
    let _ = writeln!(output, "### Student Profile: {} ({})", student.name, student.edid);
    let _ = writeln!(output, "Area: {} | Grade: {}", student.area, student.grade);
    let _ = writeln!(output, "Teacher: {} | DOB: {}", student.teacher, student.dob);
    let _ = writeln!(output);
}

pub fn student_analysis(store: &Store, student_id: &str, today: NaiveDate) -> AppResult<String> {
    let student = store.student(student_id)?;
    let incidents = store.incidents_for(&student.id);
    let mut output = String::new();
    student_header(&mut output, student);
    let _ = writeln!(output, "### Comprehensive Data Analysis for: {}", student.name);

    let Some(analysis) = StudentAnalysis::compute(&incidents) else {
        let _ = writeln!(output, "No incident data available for this student yet.");
        return Ok(output);
    };
    let latest = analysis.latest;

    let _ = writeln!(output, "#### Behaviour Profile Plan (BPP) Status");
    let _ = writeln!(output, "Latest BPP-Update Incident: {}", latest.date);
    let _ = writeln!(output, "Primary Antecedent: {}", latest.antecedent);
    let _ = writeln!(output, "Primary Function: {}", latest.func_hypothesis);
    let _ = writeln!(output, "Plan Stage: {}", analysis.plan_stage().as_str());
    let _ = writeln!(
        output,
        "Report: `report` writes {}",
        report::report_filename(student, today)
    );
    let _ = writeln!(output);

    count_table(&mut output, "Incidents Per Day", &analysis.per_day);

    let severity: Vec<(String, usize)> = analysis
        .severity
        .iter()
        .map(|bucket| (format!("Level {} / {}", bucket.risk_level, bucket.label()), bucket.count))
        .collect();
    count_table(&mut output, "Risk Level Distribution vs. ABCH Activation", &severity);
    count_table(&mut output, "Incident Frequency by Location", &analysis.by_setting);

    let heat: Vec<(String, usize)> = analysis
        .heatmap
        .iter()
        .map(|cell| (format!("{} {}", schedule::weekday_name(cell.day), cell.slot), cell.count))
        .collect();
    count_table(&mut output, "Incident Heatmap by Time Slot and Day", &heat);
    count_table(&mut output, "Most Frequent Behaviours", &analysis.top_behaviours);
    count_table(&mut output, "Function of Behaviour Distribution", &analysis.functions);

    if let Some(breakdown) = &analysis.outcomes {
        let _ = writeln!(output, "#### Clinical Deep Dive: Critical Incident Outcomes");
        count_table(
            &mut output,
            "Frequency of Incident Outcomes (ABCH Logs Only)",
            &breakdown.totals,
        );
        if breakdown.assault_by_behaviour.is_empty() {
            let _ = writeln!(output, "No incidents logged with documented assault outcomes.");
            let _ = writeln!(output);
        } else {
            count_table(
                &mut output,
                "Behaviours that Escalated to Documented Assault (ABCH Logs Only)",
                &breakdown.assault_by_behaviour,
            );
        }
    }

    let summary = &analysis.summary;
    let _ = writeln!(output, "#### Clinical Interpretation & Next Steps");
    let _ = writeln!(
        output,
        "- Primary Concern: {} is the most frequent behaviour, suggesting a targeted intervention is needed.",
        summary.modal_behaviour
    );
    let _ = writeln!(
        output,
        "- Timing: Incidents peak on {} during the {}.",
        schedule::weekday_name(summary.peak_day),
        summary.peak_session
    );
    let _ = writeln!(
        output,
        "- Context: The highest concentration of risk incidents occurs in the {} setting.",
        summary
            .high_risk_setting
            .map_or_else(|| "N/A".to_string(), |s| s.to_string())
    );
    let _ = writeln!(
        output,
        "- Function: The most hypothesized function is {}, indicating the intervention must teach a replacement behaviour that achieves this function appropriately.",
        latest.func_hypothesis
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Proactive Strategy Focus (Berry Street): Relationships and Rhythms.");
    let _ = writeln!(
        output,
        "- Relational Shift: Systematically identify and create an area of contribution within the classroom to shift the student's sense of self from 'problem' to 'valued member'."
    );
    let _ = writeln!(output);

    let stage = analysis.pattern_stage();
    let _ = writeln!(output, "#### Crisis Prevention Institute (CPI) Protocol Staging");
    let _ = writeln!(
        output,
        "The student's data indicates a pattern aligning with the {} stage.",
        stage.as_str()
    );
    let _ = writeln!(output, "* Recommended Protocol: {}", stage.response());
    Ok(output)
}

pub fn log_form(store: &Store, student_id: &str) -> AppResult<String> {
    let student = store.student(student_id)?;
    let mut output = String::new();
    let _ = writeln!(output, "#### Log Incident for {}", student.name);
    let _ = writeln!(
        output,
        "Submit with `log --behaviour .. --antecedent .. --setting .. --support .. --risk N --consequence .. --function .. --wot .. --effectiveness .. --logged-by ID`"
    );
    let _ = writeln!(output, "Risk level 3 and above proceeds to the mandatory ABCH follow-up.");
    let _ = writeln!(output);
    output.push_str(&risk_guide());
    Ok(output)
}

pub fn follow_up(session: &Session, store: &Store, student_id: &str) -> AppResult<String> {
    let student = store.student(student_id)?;
    let mut output = String::new();
    let _ = writeln!(output, "## Critical Incident ABCH Follow-up (Step 2 of 2)");

    let Some(staged) = session.abch.staged() else {
        let _ = writeln!(
            output,
            "No staged incident for {}. Run `follow-up` to load the most recent pending high-risk incident.",
            student.name
        );
        return Ok(output);
    };
    let draft = &staged.draft;
    if let Some(id) = staged.recovered_from {
        let _ = writeln!(
            output,
            "WARNING: No live incident data found. Loaded the most recent high-risk incident ({id}) for ABCH completion."
        );
    }
    let _ = writeln!(
        output,
        "Student: {} | Date: {} | Time: {}",
        student.name,
        draft.date,
        schedule::format_time(draft.time)
    );
    let _ = writeln!(
        output,
        "Initial Behaviour: {} | Initial Risk: Level {}",
        draft.behaviour, draft.risk_level
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "##### Incident Timeline (Current Logged Layers)");
    if staged.chronology.is_empty() {
        let _ = writeln!(output, "No layers yet. Add one with `layer --time HH:MM ...`.");
    }
    for (index, layer) in staged.chronology.iter().enumerate() {
        let _ = writeln!(
            output,
            "Layer {} ({}): {}",
            index + 1,
            schedule::format_time(layer.time),
            layer.describe()
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "##### Incident Details & Outcomes Checklist");
    for outcome in Outcome::ALL {
        let _ = writeln!(output, "- [{}] {}", outcome.label(), outcome.checklist_label());
    }
    let _ = writeln!(
        output,
        "Finalize with `finalize --how-to-respond .. --summary .. [--outcome ..]` (both texts mandatory)."
    );
    Ok(output)
}

pub fn staff_management(store: &Store) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "### Staff Management (Placeholder)");
    let _ = writeln!(output, "| ID | Name | Role | Active | Special |");
    let _ = writeln!(output, "| :--- | :--- | :--- | :--- | :--- |");
    for member in store.staff() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            member.id, member.name, member.role, member.active, member.special
        );
    }
    output
}

pub fn all_incidents(store: &Store) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "### Full Incident Log (All Students)");
    let _ = writeln!(
        output,
        "| Date | Time | Student | Risk | Behaviour | Antecedent | Consequence | ABCH | Logged By | Setting |"
    );
    let _ = writeln!(
        output,
        "| :--- | :--- | :--- | :---: | :--- | :--- | :--- | :---: | :--- | :--- |"
    );
    for incident in store.incidents() {
        let student = store
            .student(&incident.student_id)
            .map(|s| s.name.as_str())
            .unwrap_or("Unknown");
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            incident.date,
            schedule::format_time(incident.time),
            student,
            incident.risk_level,
            incident.behaviour,
            incident.antecedent,
            incident.consequence,
            incident.is_abch_completed,
            incident.logged_by,
            incident.setting
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::catalog::Role;
    use crate::mock;
    use crate::session::{Mode, Page};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn store() -> Store {
        Store::from_mock(&mock::generate(&mut StdRng::seed_from_u64(8), today()))
    }

    #[test]
    fn student_without_incidents_renders_empty_state() {
        let store = Store::new(mock::student_roster(), mock::staff_roster(), Vec::new());
        let view = student_analysis(&store, "stu_jp_low", today()).unwrap();
        assert!(view.contains("No incident data available for this student yet."));
    }

    #[test]
    fn analysis_view_shows_stage_and_report_name() {
        let view = student_analysis(&store(), "stu_jp_high", today()).unwrap();
        assert!(view.contains("BPP_Report_Marcus_A._20260601.txt"));
        assert!(view.contains("Crisis Prevention Institute (CPI) Protocol Staging"));
        assert!(view.contains("Incident Heatmap by Time Slot and Day"));
    }

    #[test]
    fn unknown_student_is_a_lookup_miss() {
        assert!(student_analysis(&store(), "ghost", today()).is_err());
    }

    #[test]
    fn render_follows_the_router() {
        let store = store();
        let config = Config::new("Cargo.toml", None);
        let mut session = Session::new();
        assert!(render(&session, &store, &config, today())
            .unwrap()
            .contains("Behaviour Support & Data Analysis Tool"));

        session.navigate_to(Page::StaffArea, Some(Role::Adm), Mode::Home, None);
        let dashboard = render(&session, &store, &config, today()).unwrap();
        assert!(dashboard.contains("Total Incidents Logged: 31"));

        session.navigate_to(Page::StaffArea, Some(Role::Sy), Mode::Home, None);
        let list = render(&session, &store, &config, today()).unwrap();
        assert!(list.contains("Ethan B.") && list.contains("Mia P."));
        assert!(!list.contains("Marcus A."));
    }

    #[test]
    fn bars_scale_to_the_largest_count() {
        assert_eq!(bar(5, 5).len(), BAR_WIDTH);
        assert_eq!(bar(0, 5), "");
        assert_eq!(bar(3, 0), "");
    }
}
