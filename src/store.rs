use uuid::Uuid;

use crate::catalog::Area;
use crate::error::{AppError, AppResult};
use crate::mock::MockData;
use crate::models::{Incident, Staff, Student};

/// Rosters plus the append-only incident list for one process.
#[derive(Debug, Clone, Default)]
pub struct Store {
    students: Vec<Student>,
    staff: Vec<Staff>,
    incidents: Vec<Incident>,
}

impl Store {
    pub fn new(students: Vec<Student>, staff: Vec<Staff>, incidents: Vec<Incident>) -> Self {
        Self {
            students,
            staff,
            incidents,
        }
    }

    pub fn from_mock(data: &MockData) -> Self {
        Self::new(
            data.students.clone(),
            data.staff.clone(),
            data.incidents.clone(),
        )
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn staff(&self) -> &[Staff] {
        &self.staff
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn completed_count(&self) -> usize {
        self.incidents.iter().filter(|i| i.is_abch_completed).count()
    }

    pub fn student(&self, student_id: &str) -> AppResult<&Student> {
        self.students
            .iter()
            .find(|s| s.id == student_id)
            .ok_or_else(|| AppError::StudentNotFound(student_id.to_string()))
    }

    /// Accepts either the student id or the display name (case-insensitive).
    pub fn find_student(&self, key: &str) -> AppResult<&Student> {
        let key = key.trim();
        self.students
            .iter()
            .find(|s| s.id == key || s.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| AppError::StudentNotFound(key.to_string()))
    }

    pub fn staff_member(&self, staff_id: &str) -> AppResult<&Staff> {
        self.staff
            .iter()
            .find(|s| s.id == staff_id)
            .ok_or_else(|| AppError::StaffNotFound(staff_id.to_string()))
    }

    pub fn students_in(&self, area: Area) -> Vec<&Student> {
        self.students.iter().filter(|s| s.area == area).collect()
    }

    /// A student's incidents, newest first.
    pub fn incidents_for(&self, student_id: &str) -> Vec<&Incident> {
        let mut incidents: Vec<&Incident> = self
            .incidents
            .iter()
            .filter(|i| i.student_id == student_id)
            .collect();
        incidents.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
        incidents
    }

    /// Newest high-risk record for the student that never went through the
    /// follow-up. With several pending records the newest one wins.
    pub fn latest_pending_follow_up(&self, student_id: &str) -> Option<&Incident> {
        self.incidents_for(student_id)
            .into_iter()
            .find(|i| i.awaits_follow_up())
    }

    pub fn append(&mut self, incident: Incident) -> Uuid {
        let id = incident.id;
        tracing::info!(
            incident = %id,
            student = %incident.student_id,
            risk = incident.risk_level.get(),
            completed = incident.is_abch_completed,
            "incident appended"
        );
        self.incidents.push(incident);
        id
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::mock;

    fn store() -> Store {
        let today = NaiveDate::from_ymd_opt(2026, 5, 11).unwrap();
        Store::from_mock(&mock::generate(&mut StdRng::seed_from_u64(5), today))
    }

    #[test]
    fn finds_students_by_id_or_name() {
        let store = store();
        assert_eq!(store.find_student("marcus a.").unwrap().id, "stu_jp_high");
        assert_eq!(store.find_student("stu_sy_low").unwrap().name, "Mia P.");
        assert!(matches!(
            store.student("nobody"),
            Err(AppError::StudentNotFound(_))
        ));
        assert!(matches!(
            store.staff_member("s9"),
            Err(AppError::StaffNotFound(_))
        ));
    }

    #[test]
    fn student_incidents_are_newest_first() {
        let store = store();
        let incidents = store.incidents_for("stu_jp_high");
        assert_eq!(incidents.len(), 16);
        for pair in incidents.windows(2) {
            assert!((pair[0].date, pair[0].time) >= (pair[1].date, pair[1].time));
        }
    }

    #[test]
    fn pending_follow_up_picks_newest_eligible() {
        let mut store = store();
        let mut older = store.incidents_for("stu_py_low")[0].to_draft();
        older.risk_level = crate::catalog::RiskLevel::new(4).unwrap();
        older.date = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        older.time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut newer = older.clone();
        newer.time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();

        store.append(older.into_incident(false, Default::default()));
        let newer_id = store.append(newer.into_incident(false, Default::default()));

        let pending = store.latest_pending_follow_up("stu_py_low").unwrap();
        assert_eq!(pending.id, newer_id);
    }

    #[test]
    fn areas_partition_the_roster() {
        let store = store();
        assert_eq!(store.students_in(Area::Jp).len(), 2);
        assert_eq!(store.students_in(Area::Py).len(), 2);
        assert_eq!(store.students_in(Area::Sy).len(), 2);
    }
}
