//! Planning the start/end reminders of an external event.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use hearth_core::config::ReminderConfig;
use hearth_core::EventId;
use serde::{Deserialize, Serialize};

use crate::occurrence::{localize, OccurrenceError};
use crate::types::{NewEventReminder, ReminderKind};

/// The dates of an event as the UI knows them, in the application time zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSchedule {
    pub event_id: EventId,
    pub event_name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// When reminders trigger relative to the event's dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Hours before local midnight of the start date.
    pub start_lead_hours: i64,
    /// Local hour on the end date.
    pub end_hour: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from(&ReminderConfig::default())
    }
}

impl From<&ReminderConfig> for ReminderPolicy {
    fn from(cfg: &ReminderConfig) -> Self {
        Self {
            start_lead_hours: cfg.start_lead_hours,
            end_hour: cfg.end_hour,
        }
    }
}

/// Reminders for `event`: one `start` reminder if it has a start date, one
/// `end` reminder if it has an end date.
///
/// The result is meant for `SqliteStore::replace_event_reminders`, which
/// swaps out whatever pair the event had before.
pub fn plan_event_reminders<Z: TimeZone>(
    event: &EventSchedule,
    policy: ReminderPolicy,
    tz: &Z,
) -> Result<Vec<NewEventReminder>, OccurrenceError> {
    let mut planned = Vec::with_capacity(2);

    if let Some(start) = event.start_date {
        let midnight = start
            .and_hms_opt(0, 0, 0)
            .ok_or(OccurrenceError::Unrepresentable)?;
        let midnight = localize(tz, midnight)?;
        planned.push(NewEventReminder {
            event_name: event.event_name.clone(),
            reminder_kind: ReminderKind::Start,
            trigger_at: shift_hours(midnight, -policy.start_lead_hours)?,
        });
    }

    if let Some(end) = event.end_date {
        let at = NaiveTime::from_hms_opt(policy.end_hour, 0, 0)
            .ok_or(OccurrenceError::Unrepresentable)?;
        planned.push(NewEventReminder {
            event_name: event.event_name.clone(),
            reminder_kind: ReminderKind::End,
            trigger_at: localize(tz, end.and_time(at))?,
        });
    }

    Ok(planned)
}

fn shift_hours(at: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, OccurrenceError> {
    Duration::try_hours(hours)
        .and_then(|d| at.checked_add_signed(d))
        .ok_or(OccurrenceError::Unrepresentable)
}
