use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The recurrence rule could not be parsed or never fires.
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// A job with this id is already registered.
    #[error("Duplicate job id: {id}")]
    DuplicateJob { id: String },

    /// No job with the given ID is registered.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// Reading or writing the activity log failed.
    #[error("Activity log error: {0}")]
    ActivityLog(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
