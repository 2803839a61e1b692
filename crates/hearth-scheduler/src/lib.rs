//! `hearth-scheduler`: recurring notification and event reminder scheduler
//! with SQLite persistence.
//!
//! # Overview
//!
//! Recurring templates and one-shot event reminders live in SQLite. On every
//! tick the [`engine::SchedulerEngine`] selects what is due, writes one
//! notification per due item, then advances the template (or marks the
//! reminder processed). [`runner::SchedulerHandle`] drives ticks on a timer
//! and exposes start/stop/status/force controls.
//!
//! # Frequencies
//!
//! | Frequency | Behaviour                                                       |
//! |-----------|-----------------------------------------------------------------|
//! | `DAILY`   | Every day at `show_time`, optionally only on given weekdays     |
//! | `WEEKLY`  | Every 7 days at `show_time`, optionally snapped to weekdays     |
//! | `MONTHLY` | Every month on `month_day` (clamped to short months)            |
//!
//! All calendar arithmetic runs in one configured time zone.

pub mod clock;
pub mod db;
pub mod engine;
pub mod error;
pub mod materializer;
pub mod occurrence;
pub mod reminders;
pub mod report;
pub mod runner;
pub mod selector;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use occurrence::{compute_next, OccurrenceError, RecurrenceRule};
pub use reminders::{plan_event_reminders, EventSchedule, ReminderPolicy};
pub use report::{ItemOutcome, OutcomeStatus, PipelineReport, TickReport};
pub use runner::{SchedulerHandle, SchedulerStatus};
pub use store::{CorruptRow, DueBatch, ScheduleStore, SqliteStore, StoreError};
pub use types::{
    EventReminder, Frequency, NewEventReminder, NewNotification, NewTemplate, Notification,
    NotificationType, Priority, RecurringTemplate, ReminderKind, SourceType,
};
