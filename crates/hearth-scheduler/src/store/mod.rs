//! Durable schedule storage.
//!
//! [`ScheduleStore`] is everything a tick needs from persistence. The SQLite
//! implementation in [`sqlite`] adds the user-facing CRUD the host exposes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::{NotificationId, ReminderId, TemplateId};
use rusqlite::ffi::ErrorCode;
use thiserror::Error;

use crate::types::{EventReminder, NewNotification, Notification, RecurringTemplate, SourceType};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Store failures, split by whether retrying later can help.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing database cannot be reached right now (busy, locked,
    /// missing, I/O failure). Aborts the current pipeline.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A statement failed for reasons specific to the data involved.
    #[error("query failed: {0}")]
    Query(String),

    /// A stored row could not be mapped into its record type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if matches!(
            e,
            rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::InvalidColumnType(..)
                | rusqlite::Error::IntegralValueOutOfRange(..)
        ) {
            return StoreError::Corrupt(e.to_string());
        }
        match e.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase
                | ErrorCode::ReadOnly,
            ) => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Query(e.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A due row whose columns could not be mapped. Only its ID is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRow {
    pub id: String,
    pub error: String,
}

/// Result of a due query: the records that could be read, plus the IDs of
/// those that could not, so the tick can report them instead of losing them.
#[derive(Debug, Clone)]
pub struct DueBatch<T> {
    pub items: Vec<T>,
    pub corrupt: Vec<CorruptRow>,
}

impl<T> Default for DueBatch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            corrupt: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for DueBatch<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            corrupt: Vec::new(),
        }
    }
}

/// Persistence operations the scheduler depends on.
///
/// Writes that touch schedule state return `false` when no row matched, which
/// the scheduler treats as "the record changed underneath us" and skips.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Active, unpaused, not exhausted templates with `next_execution <= now`,
    /// earliest first. Rows that match but cannot be read come back in
    /// `corrupt`.
    async fn find_templates_due_for_execution(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<RecurringTemplate>>;

    /// Unprocessed reminders with `trigger_at <= now`, earliest first.
    async fn find_unprocessed_reminders_due(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<EventReminder>>;

    async fn fetch_template(&self, id: &TemplateId) -> StoreResult<Option<RecurringTemplate>>;

    async fn fetch_reminder(&self, id: &ReminderId) -> StoreResult<Option<EventReminder>>;

    async fn insert_notification(
        &self,
        notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> StoreResult<NotificationId>;

    /// Most recent notification produced by the given source, if any.
    async fn find_notification_by_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> StoreResult<Option<Notification>>;

    /// Set `last_executed`, advance `next_execution` and increment
    /// `execution_count` of an active, unpaused template.
    async fn update_template_after_execution(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
        next_execution: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Record the final execution of a template and deactivate it.
    /// `next_execution` is left untouched.
    async fn deactivate_template(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Flip `is_processed` and link the produced notification, only if the
    /// reminder is still unprocessed.
    async fn mark_reminder_processed(
        &self,
        id: &ReminderId,
        notification_id: &NotificationId,
    ) -> StoreResult<bool>;
}
