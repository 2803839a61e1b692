use thiserror::Error;

use crate::occurrence::OccurrenceError;
use crate::store::StoreError;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The schedule store failed a query or write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The template's recurrence rule is malformed or cannot be evaluated.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] OccurrenceError),

    /// No template with the given ID exists in the store.
    #[error("Template not found: {id}")]
    TemplateNotFound { id: String },

    /// No notification with the given ID exists in the store.
    #[error("Notification not found: {id}")]
    NotificationNotFound { id: String },

    /// The operation would exceed a configured limit (e.g. max_executions reached).
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// A tick interval of zero or one that overflows the timer.
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchedulerError {
    /// True when the failure is a connectivity problem with the store rather
    /// than something specific to one record.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, SchedulerError::Store(StoreError::Unavailable(_)))
    }

    /// Short error code string sent to clients in control RES frames.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
            SchedulerError::Store(_) => "DATABASE_ERROR",
            SchedulerError::InvalidSchedule(_) => "INVALID_SCHEDULE",
            SchedulerError::TemplateNotFound { .. }
            | SchedulerError::NotificationNotFound { .. } => "NOT_FOUND",
            SchedulerError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            SchedulerError::InvalidInterval(_) => "INVALID_PARAMS",
            SchedulerError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(e: rusqlite::Error) -> Self {
        SchedulerError::Store(StoreError::from(e))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
