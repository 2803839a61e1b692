//! Due-item selection. Read-only.
//!
//! The store query already filters and orders; the results are re-checked
//! here so the ordering contract holds for any [`ScheduleStore`]
//! implementation, not just SQLite.

use chrono::{DateTime, Utc};

use crate::store::{DueBatch, ScheduleStore, StoreResult};
use crate::types::{EventReminder, RecurringTemplate};

/// Eligible templates with `next_execution <= now`, earliest first, ties by ID.
/// Unreadable rows are passed through, ordered by ID.
pub async fn due_templates(
    store: &dyn ScheduleStore,
    now: DateTime<Utc>,
) -> StoreResult<DueBatch<RecurringTemplate>> {
    let mut due = store.find_templates_due_for_execution(now).await?;
    due.items.retain(|t| t.is_due(now));
    due.items.sort_by(|a, b| {
        a.next_execution
            .cmp(&b.next_execution)
            .then_with(|| a.id.cmp(&b.id))
    });
    due.corrupt.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(due)
}

/// Unprocessed reminders with `trigger_at <= now`, earliest first, ties by ID.
/// Unreadable rows are passed through, ordered by ID.
pub async fn due_reminders(
    store: &dyn ScheduleStore,
    now: DateTime<Utc>,
) -> StoreResult<DueBatch<EventReminder>> {
    let mut due = store.find_unprocessed_reminders_due(now).await?;
    due.items.retain(|r| r.is_due(now));
    due.items
        .sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then_with(|| a.id.cmp(&b.id)));
    due.corrupt.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(due)
}
