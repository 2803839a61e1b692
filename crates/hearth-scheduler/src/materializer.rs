//! Turning due templates and reminders into stored notifications.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::ScheduleStore;
use crate::types::{
    EventReminder, NewNotification, Notification, NotificationType, Priority, RecurringTemplate,
    ReminderKind, SourceType,
};

/// Category attached to every event reminder notification.
pub const EVENT_CATEGORY: &str = "events";

/// Notification fields produced by one firing of `template`.
pub fn template_notification(template: &RecurringTemplate) -> NewNotification {
    NewNotification {
        title: template.title.clone(),
        message: template.message.clone(),
        notification_type: template.notification_type,
        priority: template.priority,
        category: template.category.clone(),
        tags: template.tags.clone(),
        source_type: SourceType::Template,
        source_id: Some(template.id.to_string()),
    }
}

/// Notification fields produced by `reminder`.
pub fn reminder_notification(reminder: &EventReminder) -> NewNotification {
    let name = &reminder.event_name;
    let message = match reminder.reminder_kind {
        ReminderKind::Start => format!("\"{name}\" will begin soon."),
        ReminderKind::End => format!("\"{name}\" ends today."),
    };
    NewNotification {
        title: format!("Reminder: {name}"),
        message,
        notification_type: NotificationType::Info,
        priority: Priority::Normal,
        category: Some(EVENT_CATEGORY.to_string()),
        tags: vec![],
        source_type: reminder.reminder_kind.source_type(),
        source_id: Some(reminder.id.to_string()),
    }
}

/// Insert one notification for a firing of `template`.
///
/// Template bookkeeping is left to the caller.
pub async fn materialize_from_template(
    store: &dyn ScheduleStore,
    template: &RecurringTemplate,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let new = template_notification(template);
    let id = store.insert_notification(&new, now).await?;
    debug!(template_id = %template.id, notification_id = %id, "template materialized");
    Ok(new.into_notification(id, now))
}

/// Result of [`materialize_from_reminder`].
#[derive(Debug, Clone)]
pub struct MaterializedReminder {
    pub notification: Notification,
    /// The notification already existed from an earlier attempt whose
    /// mark-processed step failed; nothing new was inserted.
    pub recovered: bool,
    /// The reminder was flipped to processed by this call. `false` means
    /// something else processed or removed it in the meantime.
    pub linked: bool,
}

/// Insert (or recover) the notification for `reminder`, then mark the
/// reminder processed and link the two.
///
/// A notification left behind by a previous attempt is reused, so a reminder
/// never produces more than one notification.
pub async fn materialize_from_reminder(
    store: &dyn ScheduleStore,
    reminder: &EventReminder,
    now: DateTime<Utc>,
) -> Result<MaterializedReminder> {
    let source_type = reminder.reminder_kind.source_type();
    let existing = store
        .find_notification_by_source(source_type, reminder.id.as_str())
        .await?;

    let (notification, recovered) = match existing {
        Some(n) => {
            info!(
                reminder_id = %reminder.id,
                notification_id = %n.id,
                "reusing notification from an earlier attempt"
            );
            (n, true)
        }
        None => {
            let new = reminder_notification(reminder);
            let id = store.insert_notification(&new, now).await?;
            (new.into_notification(id, now), false)
        }
    };

    let linked = store
        .mark_reminder_processed(&reminder.id, &notification.id)
        .await?;
    if !linked {
        warn!(reminder_id = %reminder.id, "reminder changed before it could be marked processed");
    }

    Ok(MaterializedReminder {
        notification,
        recovered,
        linked,
    })
}
