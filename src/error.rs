use thiserror::Error;

/// Failures surfaced to staff by the forms, the router and the lookups.
///
/// None of these are transient; every variant is a local validation or
/// lookup problem that the user corrects by hand.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("missing mandatory field: {0}")]
    MissingField(&'static str),
    #[error("name required for special role: {0}")]
    MissingSpecialName(String),
    #[error("cannot find a preliminary incident log to complete the ABCH follow-up for {student}")]
    MissingDraft { student: String },
    #[error("student not found: {0}")]
    StudentNotFound(String),
    #[error("staff member not found: {0}")]
    StaffNotFound(String),
    #[error("risk level must be between 1 and 5, got {0}")]
    InvalidRiskLevel(i64),
    #[error("unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
    #[error("invalid time: {0} (expected HH:MM)")]
    InvalidTime(String),
    #[error("no ABCH follow-up is in progress")]
    NoFollowUpInProgress,
}

pub type AppResult<T> = Result<T, AppError>;
