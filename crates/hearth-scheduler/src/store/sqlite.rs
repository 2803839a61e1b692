use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hearth_core::{EventId, NotificationId, ReminderId, TemplateId};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use tracing::{info, instrument, warn};

use crate::{
    db::{init_db, parse_ts, ts},
    error::{Result, SchedulerError},
    occurrence::first_occurrence,
    store::{CorruptRow, DueBatch, ScheduleStore, StoreError, StoreResult},
    types::{
        EventReminder, NewEventReminder, NewNotification, NewTemplate, Notification,
        RecurringTemplate, SourceType, ONE_SHOT,
    },
};

const TEMPLATE_COLUMNS: &str = "id, title, message, notification_type, frequency, show_time,
    weekdays, month_day, is_active, is_paused, last_executed, next_execution,
    execution_count, max_executions, priority, category, tags, created_at, updated_at";

const REMINDER_COLUMNS: &str = "id, event_id, event_name, reminder_kind, trigger_at,
    is_processed, notification_id, created_at";

const NOTIFICATION_COLUMNS: &str = "id, title, message, notification_type, priority,
    category, tags, frequency, source_type, source_id, is_read, created_at";

/// SQLite-backed schedule store.
///
/// Wraps a single connection in a `Mutex`; every statement is short and the
/// scheduler runs at most one tick at a time, so contention is negligible.
/// The UI may hold its own connection to the same file.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap `conn`, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Run `f` against the underlying connection, for maintenance statements
    /// the typed API does not cover.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let db = self.db.lock().unwrap();
        Ok(f(&db)?)
    }

    // --- templates ---------------------------------------------------------

    /// Persist a new template with its first occurrence after `now`.
    #[instrument(skip(self, new, tz), fields(title = %new.title))]
    pub fn create_template<Z: TimeZone>(
        &self,
        new: &NewTemplate,
        now: DateTime<Utc>,
        tz: &Z,
    ) -> Result<RecurringTemplate> {
        let rule = new.rule()?.anchored(now, tz);
        let next = first_occurrence(&rule, now, tz)?;
        let id = TemplateId::new();
        let now_str = ts(now);
        let weekdays = new
            .weekdays
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tags = serde_json::to_string(&new.tags)?;

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO recurring_templates
             (id, title, message, notification_type, frequency, show_time, weekdays,
              month_day, is_active, is_paused, last_executed, next_execution,
              execution_count, max_executions, priority, category, tags,
              created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,1,0,NULL,?9,0,?10,?11,?12,?13,?14,?14)",
            rusqlite::params![
                id.as_str(),
                new.title,
                new.message,
                new.notification_type.to_string(),
                new.frequency.to_string(),
                new.show_time,
                weekdays,
                rule.month_day,
                ts(next),
                new.max_executions,
                new.priority.ordinal(),
                new.category,
                tags,
                now_str,
            ],
        )?;
        info!(template_id = %id, next_execution = %next, "template created");
        query_template(&db, &id)?.ok_or_else(|| SchedulerError::TemplateNotFound {
            id: id.to_string(),
        })
    }

    pub fn get_template(&self, id: &TemplateId) -> Result<RecurringTemplate> {
        let db = self.db.lock().unwrap();
        query_template(&db, id)?.ok_or_else(|| SchedulerError::TemplateNotFound {
            id: id.to_string(),
        })
    }

    /// All templates ordered by creation time.
    pub fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map([], or_corrupt(row_to_template))?;
        readable_rows(rows, "recurring_templates")
    }

    /// Replace a template's editable fields and reschedule it from `now`.
    ///
    /// Counters are preserved; lowering `max_executions` to or below the
    /// current count deactivates the template.
    #[instrument(skip(self, new, tz), fields(template_id = %id))]
    pub fn update_template<Z: TimeZone>(
        &self,
        id: &TemplateId,
        new: &NewTemplate,
        now: DateTime<Utc>,
        tz: &Z,
    ) -> Result<RecurringTemplate> {
        let rule = new.rule()?.anchored(now, tz);
        let next = first_occurrence(&rule, now, tz)?;
        let weekdays = new
            .weekdays
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tags = serde_json::to_string(&new.tags)?;

        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE recurring_templates
             SET title=?1, message=?2, notification_type=?3, frequency=?4, show_time=?5,
                 weekdays=?6, month_day=?7, next_execution=?8, max_executions=?9,
                 priority=?10, category=?11, tags=?12, updated_at=?13,
                 is_active = CASE WHEN ?9 IS NOT NULL AND execution_count >= ?9
                                  THEN 0 ELSE is_active END
             WHERE id=?14",
            rusqlite::params![
                new.title,
                new.message,
                new.notification_type.to_string(),
                new.frequency.to_string(),
                new.show_time,
                weekdays,
                rule.month_day,
                ts(next),
                new.max_executions,
                new.priority.ordinal(),
                new.category,
                tags,
                ts(now),
                id.as_str(),
            ],
        )?;
        if n == 0 {
            return Err(SchedulerError::TemplateNotFound { id: id.to_string() });
        }
        info!(next_execution = %next, "template updated");
        query_template(&db, id)?.ok_or_else(|| SchedulerError::TemplateNotFound {
            id: id.to_string(),
        })
    }

    /// Pause or resume a template.
    ///
    /// Resuming a template whose `next_execution` has already passed
    /// reschedules it to the first occurrence after `now` instead of firing
    /// the stale occurrence.
    #[instrument(skip(self, tz), fields(template_id = %id))]
    pub fn set_template_paused<Z: TimeZone>(
        &self,
        id: &TemplateId,
        paused: bool,
        now: DateTime<Utc>,
        tz: &Z,
    ) -> Result<RecurringTemplate> {
        let current = self.get_template(id)?;
        let next = if !paused && current.next_execution <= now {
            reschedule(&current, now, tz)?
        } else {
            current.next_execution
        };

        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE recurring_templates
             SET is_paused=?1, next_execution=?2, updated_at=?3
             WHERE id=?4",
            rusqlite::params![paused, ts(next), ts(now), id.as_str()],
        )?;
        if n == 0 {
            return Err(SchedulerError::TemplateNotFound { id: id.to_string() });
        }
        info!(paused, "template pause state changed");
        query_template(&db, id)?.ok_or_else(|| SchedulerError::TemplateNotFound {
            id: id.to_string(),
        })
    }

    /// Activate or deactivate a template. Reactivating one that has used up
    /// its `max_executions` is refused.
    #[instrument(skip(self, tz), fields(template_id = %id))]
    pub fn set_template_active<Z: TimeZone>(
        &self,
        id: &TemplateId,
        active: bool,
        now: DateTime<Utc>,
        tz: &Z,
    ) -> Result<RecurringTemplate> {
        let current = self.get_template(id)?;
        if active && current.is_exhausted() {
            return Err(SchedulerError::LimitExceeded(format!(
                "template {id} has already fired {} of {} times",
                current.execution_count,
                current.max_executions.unwrap_or_default()
            )));
        }
        let next = if active && current.next_execution <= now {
            reschedule(&current, now, tz)?
        } else {
            current.next_execution
        };

        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE recurring_templates
             SET is_active=?1, next_execution=?2, updated_at=?3
             WHERE id=?4",
            rusqlite::params![active, ts(next), ts(now), id.as_str()],
        )?;
        if n == 0 {
            return Err(SchedulerError::TemplateNotFound { id: id.to_string() });
        }
        info!(active, "template active state changed");
        query_template(&db, id)?.ok_or_else(|| SchedulerError::TemplateNotFound {
            id: id.to_string(),
        })
    }

    /// Remove a template. Notifications it produced are kept.
    pub fn delete_template(&self, id: &TemplateId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "DELETE FROM recurring_templates WHERE id = ?1",
            [id.as_str()],
        )?;
        if n == 0 {
            return Err(SchedulerError::TemplateNotFound { id: id.to_string() });
        }
        info!(template_id = %id, "template deleted");
        Ok(())
    }

    // --- event reminders ---------------------------------------------------

    /// Replace every reminder of `event_id` with `reminders` in one transaction.
    ///
    /// At most one reminder per kind is allowed; a duplicate kind fails the
    /// whole replacement and leaves the previous reminders in place.
    #[instrument(skip(self, reminders), fields(event_id = %event_id, count = reminders.len()))]
    pub fn replace_event_reminders(
        &self,
        event_id: &EventId,
        reminders: &[NewEventReminder],
        now: DateTime<Utc>,
    ) -> Result<Vec<EventReminder>> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM event_reminders WHERE event_id = ?1",
            [event_id.as_str()],
        )?;
        for reminder in reminders {
            tx.execute(
                "INSERT INTO event_reminders
                 (id, event_id, event_name, reminder_kind, trigger_at,
                  is_processed, notification_id, created_at)
                 VALUES (?1,?2,?3,?4,?5,0,NULL,?6)",
                rusqlite::params![
                    ReminderId::new().as_str(),
                    event_id.as_str(),
                    reminder.event_name,
                    reminder.reminder_kind.to_string(),
                    ts(reminder.trigger_at),
                    ts(now),
                ],
            )?;
        }
        tx.commit()?;
        info!("event reminders replaced");
        query_event_reminders(&db, event_id)
    }

    /// Remove all reminders of an event. Returns how many were removed.
    pub fn delete_event_reminders(&self, event_id: &EventId) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "DELETE FROM event_reminders WHERE event_id = ?1",
            [event_id.as_str()],
        )?;
        info!(event_id = %event_id, removed = n, "event reminders deleted");
        Ok(n)
    }

    pub fn list_event_reminders(&self, event_id: &EventId) -> Result<Vec<EventReminder>> {
        let db = self.db.lock().unwrap();
        query_event_reminders(&db, event_id)
    }

    // --- notifications -----------------------------------------------------

    /// Insert a notification on behalf of a user (or any non-scheduler source).
    pub fn create_notification(
        &self,
        new: &NewNotification,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let db = self.db.lock().unwrap();
        let id = insert_notification_row(&db, new, now)?;
        Ok(new.clone().into_notification(id, now))
    }

    /// Newest first.
    pub fn list_notifications(&self, unread_only: bool, limit: usize) -> Result<Vec<Notification>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE (?1 = 0 OR is_read = 0)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![unread_only, limit as i64],
            or_corrupt(row_to_notification),
        )?;
        readable_rows(rows, "notifications")
    }

    pub fn mark_notification_read(&self, id: &NotificationId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            [id.as_str()],
        )?;
        if n == 0 {
            return Err(SchedulerError::NotificationNotFound { id: id.to_string() });
        }
        Ok(())
    }

    pub fn mark_all_notifications_read(&self) -> Result<usize> {
        let db = self.db.lock().unwrap();
        Ok(db.execute("UPDATE notifications SET is_read = 1 WHERE is_read = 0", [])?)
    }

    pub fn unread_count(&self) -> Result<u64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    pub fn delete_notification(&self, id: &NotificationId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM notifications WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(SchedulerError::NotificationNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn find_templates_due_for_execution(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<RecurringTemplate>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates
             WHERE is_active = 1 AND is_paused = 0 AND next_execution <= ?1
               AND (max_executions IS NULL OR execution_count < max_executions)
             ORDER BY next_execution ASC, id ASC"
        ))?;
        let rows = stmt.query_map([ts(now)], or_corrupt(row_to_template))?;
        Ok(split_rows(rows)?)
    }

    async fn find_unprocessed_reminders_due(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<EventReminder>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {REMINDER_COLUMNS} FROM event_reminders
             WHERE is_processed = 0 AND trigger_at <= ?1
             ORDER BY trigger_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map([ts(now)], or_corrupt(row_to_reminder))?;
        Ok(split_rows(rows)?)
    }

    async fn fetch_template(&self, id: &TemplateId) -> StoreResult<Option<RecurringTemplate>> {
        let db = self.db.lock().unwrap();
        query_template(&db, id).map_err(into_store_error)
    }

    async fn fetch_reminder(&self, id: &ReminderId) -> StoreResult<Option<EventReminder>> {
        let db = self.db.lock().unwrap();
        let reminder = db
            .query_row(
                &format!("SELECT {REMINDER_COLUMNS} FROM event_reminders WHERE id = ?1"),
                [id.as_str()],
                row_to_reminder,
            )
            .optional()?;
        Ok(reminder)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> StoreResult<NotificationId> {
        let db = self.db.lock().unwrap();
        insert_notification_row(&db, notification, created_at).map_err(into_store_error)
    }

    async fn find_notification_by_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> StoreResult<Option<Notification>> {
        let db = self.db.lock().unwrap();
        let found = db
            .query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE source_type = ?1 AND source_id = ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1"
                ),
                rusqlite::params![source_type.to_string(), source_id],
                row_to_notification,
            )
            .optional()?;
        Ok(found)
    }

    async fn update_template_after_execution(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
        next_execution: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE recurring_templates
             SET last_executed=?1, next_execution=?2,
                 execution_count = execution_count + 1, updated_at=?1
             WHERE id=?3 AND is_active = 1 AND is_paused = 0",
            rusqlite::params![ts(executed_at), ts(next_execution), id.as_str()],
        )?;
        Ok(n > 0)
    }

    async fn deactivate_template(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE recurring_templates
             SET is_active = 0, last_executed=?1,
                 execution_count = execution_count + 1, updated_at=?1
             WHERE id=?2 AND is_active = 1",
            rusqlite::params![ts(executed_at), id.as_str()],
        )?;
        Ok(n > 0)
    }

    async fn mark_reminder_processed(
        &self,
        id: &ReminderId,
        notification_id: &NotificationId,
    ) -> StoreResult<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE event_reminders SET is_processed = 1, notification_id = ?1
             WHERE id = ?2 AND is_processed = 0",
            rusqlite::params![notification_id.as_str(), id.as_str()],
        )?;
        Ok(n > 0)
    }
}

// --- private helpers -------------------------------------------------------

fn reschedule<Z: TimeZone>(
    template: &RecurringTemplate,
    now: DateTime<Utc>,
    tz: &Z,
) -> Result<DateTime<Utc>> {
    Ok(first_occurrence(&template.anchored_rule(tz)?, now, tz)?)
}

fn into_store_error(e: SchedulerError) -> StoreError {
    match e {
        SchedulerError::Store(inner) => inner,
        other => StoreError::Query(other.to_string()),
    }
}

fn query_template(db: &Connection, id: &TemplateId) -> Result<Option<RecurringTemplate>> {
    let template = db
        .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE id = ?1"),
            [id.as_str()],
            row_to_template,
        )
        .optional()?;
    Ok(template)
}

fn query_event_reminders(db: &Connection, event_id: &EventId) -> Result<Vec<EventReminder>> {
    let mut stmt = db.prepare(&format!(
        "SELECT {REMINDER_COLUMNS} FROM event_reminders
         WHERE event_id = ?1 ORDER BY trigger_at, id"
    ))?;
    let rows = stmt.query_map([event_id.as_str()], or_corrupt(row_to_reminder))?;
    readable_rows(rows, "event_reminders")
}

type MappedRow<T> = std::result::Result<T, CorruptRow>;

/// Wrap a row mapper so a row that fails to map is returned by ID rather
/// than failing the whole query.
fn or_corrupt<T>(
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> impl Fn(&Row<'_>) -> rusqlite::Result<MappedRow<T>> {
    move |row: &Row<'_>| match map(row) {
        Ok(item) => Ok(Ok(item)),
        Err(e) => Ok(Err(CorruptRow {
            id: row.get(0)?,
            error: e.to_string(),
        })),
    }
}

fn split_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<MappedRow<T>>>,
) -> rusqlite::Result<DueBatch<T>> {
    let mut batch = DueBatch::default();
    for row in rows {
        match row? {
            Ok(item) => batch.items.push(item),
            Err(bad) => batch.corrupt.push(bad),
        }
    }
    Ok(batch)
}

/// Readable rows of a listing; unreadable ones are logged by ID and left out.
fn readable_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<MappedRow<T>>>,
    table: &str,
) -> Result<Vec<T>> {
    let batch = split_rows(rows)?;
    for bad in &batch.corrupt {
        warn!(table, id = %bad.id, error = %bad.error, "skipping unreadable row");
    }
    Ok(batch.items)
}

fn insert_notification_row(
    db: &Connection,
    new: &NewNotification,
    created_at: DateTime<Utc>,
) -> Result<NotificationId> {
    let id = NotificationId::new();
    let tags = serde_json::to_string(&new.tags)?;
    db.execute(
        "INSERT INTO notifications
         (id, title, message, notification_type, priority, category, tags,
          frequency, source_type, source_id, is_read, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,0,?11)",
        rusqlite::params![
            id.as_str(),
            new.title,
            new.message,
            new.notification_type.to_string(),
            new.priority.ordinal(),
            new.category,
            tags,
            ONE_SHOT,
            new.source_type.to_string(),
            new.source_id,
            ts(created_at),
        ],
    )?;
    Ok(id)
}

/// Parse a TEXT column, reporting failures as a rusqlite conversion error.
fn parse_col<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_opt_col<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<Option<T>>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse(&s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
    })
    .transpose()
}

fn priority_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<crate::types::Priority> {
    let raw: i64 = row.get(idx)?;
    u8::try_from(raw)
        .map_err(|e| e.to_string())
        .and_then(crate::types::Priority::try_from)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, e.into()))
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<RecurringTemplate> {
    Ok(RecurringTemplate {
        id: TemplateId(row.get(0)?),
        title: row.get(1)?,
        message: row.get(2)?,
        notification_type: parse_col(row, 3, str::parse)?,
        frequency: row.get(4)?,
        show_time: row.get(5)?,
        weekdays: parse_opt_col(row, 6, |s| serde_json::from_str::<Vec<u8>>(s))?,
        month_day: row.get(7)?,
        is_active: row.get(8)?,
        is_paused: row.get(9)?,
        last_executed: parse_opt_col(row, 10, parse_ts)?,
        next_execution: parse_col(row, 11, parse_ts)?,
        execution_count: row.get(12)?,
        max_executions: row.get(13)?,
        priority: priority_col(row, 14)?,
        category: row.get(15)?,
        tags: parse_col(row, 16, |s| serde_json::from_str::<Vec<String>>(s))?,
        created_at: parse_col(row, 17, parse_ts)?,
        updated_at: parse_col(row, 18, parse_ts)?,
    })
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<EventReminder> {
    Ok(EventReminder {
        id: ReminderId(row.get(0)?),
        event_id: EventId(row.get(1)?),
        event_name: row.get(2)?,
        reminder_kind: parse_col(row, 3, str::parse)?,
        trigger_at: parse_col(row, 4, parse_ts)?,
        is_processed: row.get(5)?,
        notification_id: row.get::<_, Option<String>>(6)?.map(NotificationId),
        created_at: parse_col(row, 7, parse_ts)?,
    })
}

fn row_to_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        title: row.get(1)?,
        message: row.get(2)?,
        notification_type: parse_col(row, 3, str::parse)?,
        priority: priority_col(row, 4)?,
        category: row.get(5)?,
        tags: parse_col(row, 6, |s| serde_json::from_str::<Vec<String>>(s))?,
        frequency: row.get(7)?,
        source_type: parse_col(row, 8, str::parse)?,
        source_id: row.get(9)?,
        is_read: row.get(10)?,
        created_at: parse_col(row, 11, parse_ts)?,
    })
}
