use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `recurring_templates`, `event_reminders` and `notifications`
/// tables (idempotent) plus the indexes the due-item queries poll on every
/// tick.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS recurring_templates (
            id                TEXT    NOT NULL PRIMARY KEY,
            title             TEXT    NOT NULL,
            message           TEXT    NOT NULL,
            notification_type TEXT    NOT NULL DEFAULT 'info',
            frequency         TEXT    NOT NULL,   -- DAILY | WEEKLY | MONTHLY
            show_time         TEXT,               -- local HH:MM
            weekdays          TEXT,               -- JSON array of 0-6, NULL = every day
            month_day         INTEGER,            -- 1-31, MONTHLY only
            is_active         INTEGER NOT NULL DEFAULT 1,
            is_paused         INTEGER NOT NULL DEFAULT 0,
            last_executed     TEXT,
            next_execution    TEXT    NOT NULL,
            execution_count   INTEGER NOT NULL DEFAULT 0,
            max_executions    INTEGER,            -- NULL means unlimited
            priority          INTEGER NOT NULL DEFAULT 2,
            category          TEXT,
            tags              TEXT    NOT NULL DEFAULT '[]',
            created_at        TEXT    NOT NULL,
            updated_at        TEXT    NOT NULL
        ) STRICT;

        -- SELECT … WHERE is_active = 1 AND is_paused = 0 AND next_execution <= ?
        CREATE INDEX IF NOT EXISTS idx_templates_due
            ON recurring_templates (is_active, is_paused, next_execution);

        CREATE TABLE IF NOT EXISTS event_reminders (
            id              TEXT    NOT NULL PRIMARY KEY,
            event_id        TEXT    NOT NULL,
            event_name      TEXT    NOT NULL,
            reminder_kind   TEXT    NOT NULL CHECK (reminder_kind IN ('start', 'end')),
            trigger_at      TEXT    NOT NULL,
            is_processed    INTEGER NOT NULL DEFAULT 0,
            notification_id TEXT,
            created_at      TEXT    NOT NULL,
            UNIQUE (event_id, reminder_kind)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_reminders_due
            ON event_reminders (is_processed, trigger_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id                TEXT    NOT NULL PRIMARY KEY,
            title             TEXT    NOT NULL,
            message           TEXT    NOT NULL,
            notification_type TEXT    NOT NULL DEFAULT 'info',
            priority          INTEGER NOT NULL DEFAULT 2,
            category          TEXT,
            tags              TEXT    NOT NULL DEFAULT '[]',
            frequency         TEXT    NOT NULL DEFAULT 'ONCE',
            source_type       TEXT    NOT NULL DEFAULT 'manual',
            source_id         TEXT,
            is_read           INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_notifications_source
            ON notifications (source_type, source_id);
        CREATE INDEX IF NOT EXISTS idx_notifications_created
            ON notifications (created_at);
        ",
    )?;
    Ok(())
}

/// Fixed-width UTC text (`2026-03-02T09:00:00.000Z`) so that string order in
/// SQLite equals time order.
pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
