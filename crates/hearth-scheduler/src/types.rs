use chrono::{DateTime, TimeZone, Utc};
use hearth_core::{EventId, NotificationId, ReminderId, TemplateId};
use serde::{Deserialize, Serialize};

use crate::occurrence::{OccurrenceError, RecurrenceRule};

/// Frequency value stored on every materialized notification.
pub const ONE_SHOT: &str = "ONCE";

/// How often a recurring template fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = OccurrenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            other => Err(OccurrenceError::UnknownFrequency(other.to_string())),
        }
    }
}

/// Display style of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationType::Info => "info",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::Success => "success",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationType::Info),
            "warning" => Ok(NotificationType::Warning),
            "error" => Ok(NotificationType::Error),
            "success" => Ok(NotificationType::Success),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

/// Ordinal priority, serialised as 1–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn ordinal(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Normal),
            3 => Ok(Priority::High),
            other => Err(format!("priority must be 1-3, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.ordinal()
    }
}

/// What produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Manual,
    Template,
    EventStart,
    EventEnd,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Manual => "manual",
            SourceType::Template => "template",
            SourceType::EventStart => "event_start",
            SourceType::EventEnd => "event_end",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SourceType::Manual),
            "template" => Ok(SourceType::Template),
            "event_start" => Ok(SourceType::EventStart),
            "event_end" => Ok(SourceType::EventEnd),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Which edge of an event a reminder is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Start,
    End,
}

impl ReminderKind {
    pub fn source_type(self) -> SourceType {
        match self {
            ReminderKind::Start => SourceType::EventStart,
            ReminderKind::End => SourceType::EventEnd,
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReminderKind::Start => "start",
            ReminderKind::End => "end",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(ReminderKind::Start),
            "end" => Ok(ReminderKind::End),
            other => Err(format!("unknown reminder kind: {other}")),
        }
    }
}

/// A persisted recurring notification rule.
///
/// The schedule fields (`frequency`, `show_time`, `weekdays`, `month_day`)
/// are kept exactly as stored; the UI writes them directly, so they are only
/// validated when the rule is evaluated via [`RecurringTemplate::rule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: TemplateId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    /// `DAILY`, `WEEKLY` or `MONTHLY`.
    pub frequency: String,
    /// Local `HH:MM` at which the template fires.
    pub show_time: Option<String>,
    /// Weekday ordinals, 0 = Sunday … 6 = Saturday.
    pub weekdays: Option<Vec<u8>>,
    /// Day of month (1–31) for `MONTHLY`.
    pub month_day: Option<u32>,
    pub is_active: bool,
    pub is_paused: bool,
    pub last_executed: Option<DateTime<Utc>>,
    pub next_execution: DateTime<Utc>,
    pub execution_count: u32,
    pub max_executions: Option<u32>,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringTemplate {
    /// Validate the stored schedule fields into an evaluable rule.
    pub fn rule(&self) -> std::result::Result<RecurrenceRule, OccurrenceError> {
        RecurrenceRule::parse(
            &self.frequency,
            self.show_time.as_deref(),
            self.weekdays.as_deref(),
            self.month_day,
        )
    }

    /// [`Self::rule`], with an open `MONTHLY` day pinned to the day the
    /// template was created. Rows written before the day was stored keep a
    /// stable anchor this way.
    pub fn anchored_rule<Z: TimeZone>(
        &self,
        tz: &Z,
    ) -> std::result::Result<RecurrenceRule, OccurrenceError> {
        Ok(self.rule()?.anchored(self.created_at, tz))
    }

    /// True once `execution_count` has reached `max_executions`.
    pub fn is_exhausted(&self) -> bool {
        self.max_executions
            .is_some_and(|max| self.execution_count >= max)
    }

    /// True when the upcoming firing is the last one allowed.
    pub fn fires_last_time(&self) -> bool {
        self.max_executions
            .is_some_and(|max| self.execution_count.saturating_add(1) >= max)
    }

    /// Active, not paused, not exhausted.
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_paused && !self.is_exhausted()
    }

    /// Eligible and `next_execution <= now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_eligible() && self.next_execution <= now
    }
}

/// User input for creating or editing a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub notification_type: NotificationType,
    pub frequency: Frequency,
    /// Local `HH:MM`.
    pub show_time: String,
    #[serde(default)]
    pub weekdays: Option<Vec<u8>>,
    #[serde(default)]
    pub month_day: Option<u32>,
    #[serde(default)]
    pub max_executions: Option<u32>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTemplate {
    pub fn rule(&self) -> std::result::Result<RecurrenceRule, OccurrenceError> {
        RecurrenceRule::parse(
            &self.frequency.to_string(),
            Some(&self.show_time),
            self.weekdays.as_deref(),
            self.month_day,
        )
    }
}

/// A one-shot reminder tied to an external event's start or end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReminder {
    pub id: ReminderId,
    pub event_id: EventId,
    pub event_name: String,
    pub reminder_kind: ReminderKind,
    pub trigger_at: DateTime<Utc>,
    pub is_processed: bool,
    /// Set atomically with `is_processed`.
    pub notification_id: Option<NotificationId>,
    pub created_at: DateTime<Utc>,
}

impl EventReminder {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_processed && self.trigger_at <= now
    }
}

/// A reminder about to be written by [`crate::store::SqliteStore::replace_event_reminders`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEventReminder {
    pub event_name: String,
    pub reminder_kind: ReminderKind,
    pub trigger_at: DateTime<Utc>,
}

/// A user-visible, one-shot notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Always [`ONE_SHOT`].
    pub frequency: String,
    pub source_type: SourceType,
    /// Template or reminder ID; `None` for manual notifications.
    pub source_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a notification insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "manual_source")]
    pub source_type: SourceType,
    #[serde(default)]
    pub source_id: Option<String>,
}

fn manual_source() -> SourceType {
    SourceType::Manual
}

impl NewNotification {
    /// Assemble the stored record once the store has assigned an ID.
    pub fn into_notification(self, id: NotificationId, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            title: self.title,
            message: self.message,
            notification_type: self.notification_type,
            priority: self.priority,
            category: self.category,
            tags: self.tags,
            frequency: ONE_SHOT.to_string(),
            source_type: self.source_type,
            source_id: self.source_id,
            is_read: false,
            created_at,
        }
    }
}
