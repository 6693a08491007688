use crate::catalog::{Area, Role};
use crate::workflow::AbchWorkflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    StaffArea,
    QuickLog,
    AbchFollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Home,
    Analysis,
    Log,
    StaffManagement,
    AddStaff,
    AllIncidents,
}

/// What the next render shows, resolved from the navigation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Landing,
    AreaStudents(Area),
    AdminDashboard,
    StudentAnalysis(String),
    LogForm(String),
    QuickLogForm(String),
    FollowUp(String),
    StaffManagement,
    AddStaff,
    AllIncidents,
}

/// The single user's navigation state plus the ABCH staging area.
#[derive(Debug, Clone)]
pub struct Session {
    pub page: Page,
    pub role: Option<Role>,
    pub mode: Mode,
    pub selected_student: Option<String>,
    pub abch: AbchWorkflow,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            page: Page::Landing,
            role: None,
            mode: Mode::Home,
            selected_student: None,
            abch: AbchWorkflow::AwaitingInitialLog,
        }
    }

    /// Applies a navigation transition in one step. The role is only
    /// replaced when one is given. Leaving for any page other than the
    /// follow-up step drops the staged ABCH draft and its chronology.
    pub fn navigate_to(
        &mut self,
        page: Page,
        role: Option<Role>,
        mode: Mode,
        student: Option<String>,
    ) {
        if page != Page::AbchFollowUp && self.abch.has_staged_draft() {
            tracing::debug!("leaving follow-up, staged ABCH draft discarded");
            self.abch = AbchWorkflow::AwaitingInitialLog;
        }

        self.page = page;
        if role.is_some() {
            self.role = role;
        }
        self.mode = mode;
        self.selected_student = student;
        tracing::debug!(
            ?page,
            ?mode,
            role = ?self.role,
            student = ?self.selected_student,
            "navigated"
        );
    }

    pub fn go_home(&mut self) {
        self.navigate_to(Page::Landing, None, Mode::Home, None);
    }

    /// Leaves the staff area entirely, forgetting the signed-in role.
    pub fn sign_out(&mut self) {
        self.role = None;
        self.go_home();
    }

    pub fn route(&self) -> View {
        let student = self.selected_student.clone();
        match (self.page, self.role, self.mode, student) {
            (Page::Landing, _, _, _) => View::Landing,
            (Page::QuickLog, _, _, Some(id)) => View::QuickLogForm(id),
            (Page::AbchFollowUp, _, _, Some(id)) => View::FollowUp(id),
            (Page::StaffArea, Some(Role::Adm), Mode::Home, _) => View::AdminDashboard,
            (Page::StaffArea, Some(role), Mode::Home, _) => match role.area() {
                Some(area) => View::AreaStudents(area),
                None => View::Landing,
            },
            (Page::StaffArea, Some(_), Mode::Analysis, Some(id)) => View::StudentAnalysis(id),
            (Page::StaffArea, Some(_), Mode::Log, Some(id)) => View::LogForm(id),
            (Page::StaffArea, Some(Role::Adm), Mode::StaffManagement, _) => View::StaffManagement,
            (Page::StaffArea, Some(Role::Adm), Mode::AddStaff, _) => View::AddStaff,
            (Page::StaffArea, Some(Role::Adm), Mode::AllIncidents, _) => View::AllIncidents,
            _ => View::Landing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::FollowUpDraft;

    #[test]
    fn routes_staff_area_modes() {
        let mut session = Session::new();
        assert_eq!(session.route(), View::Landing);

        session.navigate_to(Page::StaffArea, Some(Role::Py), Mode::Home, None);
        assert_eq!(session.route(), View::AreaStudents(Area::Py));

        session.navigate_to(Page::StaffArea, None, Mode::Analysis, Some("stu_py_low".into()));
        assert_eq!(session.role, Some(Role::Py));
        assert_eq!(session.route(), View::StudentAnalysis("stu_py_low".into()));

        session.navigate_to(Page::StaffArea, Some(Role::Adm), Mode::Home, None);
        assert_eq!(session.route(), View::AdminDashboard);
        session.navigate_to(Page::StaffArea, None, Mode::AllIncidents, None);
        assert_eq!(session.route(), View::AllIncidents);
    }

    #[test]
    fn admin_only_modes_fall_back_to_landing() {
        let mut session = Session::new();
        session.navigate_to(Page::StaffArea, Some(Role::Jp), Mode::StaffManagement, None);
        assert_eq!(session.route(), View::Landing);
        session.navigate_to(Page::StaffArea, None, Mode::Analysis, None);
        assert_eq!(session.route(), View::Landing);
    }

    #[test]
    fn leaving_follow_up_clears_staging() {
        let mut session = Session::new();
        session.abch = AbchWorkflow::AwaitingFollowUp(Box::new(FollowUpDraft::sample()));
        session.navigate_to(Page::AbchFollowUp, None, Mode::Home, Some("stu_jp_high".into()));
        assert!(session.abch.has_staged_draft());

        session.navigate_to(Page::Landing, None, Mode::Home, None);
        assert!(!session.abch.has_staged_draft());
        assert!(matches!(session.abch, AbchWorkflow::AwaitingInitialLog));
    }

    #[test]
    fn sign_out_forgets_role() {
        let mut session = Session::new();
        session.navigate_to(Page::StaffArea, Some(Role::Sy), Mode::Home, None);
        session.sign_out();
        assert_eq!(session.role, None);
        assert_eq!(session.page, Page::Landing);
    }
}
