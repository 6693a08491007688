use std::io;

use anyhow::Context;
use serde::Serialize;

use crate::models::Incident;
use crate::schedule;
use crate::store::Store;

/// One line of the administrator's incident log.
#[derive(Debug, Serialize)]
struct IncidentRow<'a> {
    date: String,
    time: String,
    student: &'a str,
    risk_level: u8,
    behaviour: &'static str,
    antecedent: &'static str,
    consequence: &'static str,
    abch: bool,
    logged_by: String,
    setting: &'static str,
}

impl<'a> IncidentRow<'a> {
    fn new(incident: &Incident, student: &'a str) -> Self {
        Self {
            date: incident.date.to_string(),
            time: schedule::format_time(incident.time),
            student,
            risk_level: incident.risk_level.get(),
            behaviour: incident.behaviour.label(),
            antecedent: incident.antecedent.label(),
            consequence: incident.consequence.label(),
            abch: incident.is_abch_completed,
            logged_by: incident.logged_by.to_string(),
            setting: incident.setting.label(),
        }
    }
}

pub fn write_csv<W: io::Write>(store: &Store, writer: W) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut written = 0usize;

    for incident in store.incidents() {
        let student = store
            .student(&incident.student_id)
            .map(|s| s.name.as_str())
            .unwrap_or("Unknown");
        csv_writer
            .serialize(IncidentRow::new(incident, student))
            .with_context(|| format!("failed to write incident {}", incident.id))?;
        written += 1;
    }

    csv_writer.flush()?;
    Ok(written)
}

/// Full incident records, every field included.
pub fn write_json<W: io::Write>(store: &Store, writer: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, store.incidents())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::mock;

    fn store() -> Store {
        let today = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        Store::from_mock(&mock::generate(&mut StdRng::seed_from_u64(13), today))
    }

    #[test]
    fn csv_has_header_and_one_row_per_incident() {
        let store = store();
        let mut buffer = Vec::new();
        let written = write_csv(&store, &mut buffer).unwrap();
        assert_eq!(written, store.len());

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,time,student,risk_level,behaviour,antecedent,consequence,abch,logged_by,setting"
        );
        assert_eq!(lines.count(), store.len());
        assert!(text.contains("Marcus A."));
    }

    #[test]
    fn json_uses_display_labels() {
        let store = store();
        let mut buffer = Vec::new();
        write_json(&store, &mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), store.len());
        let first = &records[0];
        assert_eq!(first["student_id"], "stu_jp_high");
        assert!(first["time"].as_str().unwrap().len() == 5);
        assert!(first["day"].as_str().unwrap().ends_with("day"));
        assert!(first["outcomes"]["assault"].is_boolean());
    }
}
