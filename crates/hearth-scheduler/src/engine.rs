use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::Result,
    materializer,
    occurrence::next_after,
    report::{OutcomeStatus, PipelineReport, TickReport},
    selector,
    store::ScheduleStore,
    types::{EventReminder, Notification, RecurringTemplate},
};

/// One pass of the scheduler: fire due templates, then due event reminders.
///
/// The engine holds no schedule state of its own; everything is re-read from
/// the store on every tick, so a tick can run after any amount of downtime.
pub struct SchedulerEngine {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    /// If set, newly created notifications are sent here for delivery.
    fired_tx: Option<mpsc::Sender<Notification>>,
}

impl SchedulerEngine {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            store,
            clock,
            tz,
            fired_tx: None,
        }
    }

    /// Forward every notification this engine creates to `fired_tx`.
    ///
    /// The sender is non-blocking (`try_send`) so a slow consumer never
    /// stalls a tick.
    pub fn with_delivery(mut self, fired_tx: mpsc::Sender<Notification>) -> Self {
        self.fired_tx = Some(fired_tx);
        self
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Current time at the precision the store persists.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    /// Run both pipelines against a single `now`.
    ///
    /// Never fails as a whole: item errors are recorded in the report and a
    /// store outage aborts only the pipeline that hit it.
    pub async fn tick(&self) -> TickReport {
        let started_at = self.now();
        let templates = self.process_templates(started_at).await;
        let reminders = self.process_reminders(started_at).await;
        let report = TickReport {
            started_at,
            finished_at: self.now(),
            templates,
            reminders,
        };
        info!(
            created = report.notifications_created(),
            failures = report.failures(),
            "scheduler tick complete"
        );
        report
    }

    /// Fire every template due at `now`.
    pub async fn process_templates(&self, now: DateTime<Utc>) -> PipelineReport {
        let due = match selector::due_templates(self.store.as_ref(), now).await {
            Ok(due) => due,
            Err(e) => {
                error!("template selection failed: {e}");
                return PipelineReport::aborted(e.to_string());
            }
        };
        debug!(count = due.items.len(), unreadable = due.corrupt.len(), "templates due");

        let mut report = PipelineReport::default();
        for bad in due.corrupt {
            error!(template_id = %bad.id, "unreadable template row: {}", bad.error);
            report.push(bad.id, unreadable(&bad.error));
        }
        for template in due.items {
            match self.process_template(&template, now).await {
                Ok(status) => report.push(template.id.to_string(), status),
                Err(e) if e.is_store_unavailable() => {
                    error!(template_id = %template.id, "store unavailable, aborting template pass: {e}");
                    report.push(template.id.to_string(), failed(&e));
                    report.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    error!(template_id = %template.id, "template processing failed: {e}");
                    report.push(template.id.to_string(), failed(&e));
                }
            }
        }
        report
    }

    /// Materialize every event reminder due at `now`.
    pub async fn process_reminders(&self, now: DateTime<Utc>) -> PipelineReport {
        let due = match selector::due_reminders(self.store.as_ref(), now).await {
            Ok(due) => due,
            Err(e) => {
                error!("reminder selection failed: {e}");
                return PipelineReport::aborted(e.to_string());
            }
        };
        debug!(count = due.items.len(), unreadable = due.corrupt.len(), "reminders due");

        let mut report = PipelineReport::default();
        for bad in due.corrupt {
            error!(reminder_id = %bad.id, "unreadable reminder row: {}", bad.error);
            report.push(bad.id, unreadable(&bad.error));
        }
        for reminder in due.items {
            match self.process_reminder(&reminder, now).await {
                Ok(status) => report.push(reminder.id.to_string(), status),
                Err(e) if e.is_store_unavailable() => {
                    error!(reminder_id = %reminder.id, "store unavailable, aborting reminder pass: {e}");
                    report.push(reminder.id.to_string(), failed(&e));
                    report.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    error!(reminder_id = %reminder.id, "reminder processing failed: {e}");
                    report.push(reminder.id.to_string(), failed(&e));
                }
            }
        }
        report
    }

    // --- private helpers ---------------------------------------------------

    async fn process_template(
        &self,
        selected: &RecurringTemplate,
        now: DateTime<Utc>,
    ) -> Result<OutcomeStatus> {
        // Re-read: an earlier item in this tick may have taken long enough for
        // the user to pause, edit or delete this one.
        let Some(template) = self.store.fetch_template(&selected.id).await? else {
            return Ok(skipped("template no longer exists"));
        };
        if !template.is_due(now) || template.next_execution != selected.next_execution {
            return Ok(skipped("template changed since selection"));
        }

        let notification =
            materializer::materialize_from_template(self.store.as_ref(), &template, now).await?;
        let notification_id = notification.id.clone();
        self.deliver(notification);

        if template.fires_last_time() {
            if !self.store.deactivate_template(&template.id, now).await? {
                warn!(template_id = %template.id, "template changed before it could be retired");
                return Ok(skipped("template changed before deactivation"));
            }
            info!(
                template_id = %template.id,
                run = template.execution_count + 1,
                "template reached max executions"
            );
            return Ok(OutcomeStatus::Exhausted { notification_id });
        }

        let next = template
            .anchored_rule(&self.tz)
            .and_then(|rule| next_after(&rule, template.next_execution, now, &self.tz));
        match next {
            Ok(next_execution) => {
                let updated = self
                    .store
                    .update_template_after_execution(&template.id, now, next_execution)
                    .await?;
                if !updated {
                    warn!(template_id = %template.id, "template changed before it could be rescheduled");
                    return Ok(skipped("template changed before reschedule"));
                }
                info!(
                    template_id = %template.id,
                    run = template.execution_count + 1,
                    next = %next_execution,
                    "template fired"
                );
                Ok(OutcomeStatus::Fired {
                    notification_id,
                    next_execution,
                })
            }
            Err(e) => {
                warn!(template_id = %template.id, "cannot compute next occurrence, deactivating: {e}");
                if !self.store.deactivate_template(&template.id, now).await? {
                    return Ok(skipped("template changed before deactivation"));
                }
                Ok(OutcomeStatus::Deactivated {
                    notification_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn process_reminder(
        &self,
        selected: &EventReminder,
        now: DateTime<Utc>,
    ) -> Result<OutcomeStatus> {
        let Some(reminder) = self.store.fetch_reminder(&selected.id).await? else {
            return Ok(skipped("reminder no longer exists"));
        };
        if !reminder.is_due(now) {
            return Ok(skipped("reminder changed since selection"));
        }

        let done = materializer::materialize_from_reminder(self.store.as_ref(), &reminder, now).await?;
        let notification_id = done.notification.id.clone();

        if done.recovered {
            if !done.linked {
                return Ok(skipped("reminder changed before it could be marked processed"));
            }
            return Ok(OutcomeStatus::Recovered { notification_id });
        }

        // Fresh notification: it exists now whatever happened to the reminder.
        self.deliver(done.notification);
        if !done.linked {
            return Ok(skipped("reminder changed before it could be marked processed"));
        }
        info!(
            reminder_id = %reminder.id,
            event_id = %reminder.event_id,
            kind = %reminder.reminder_kind,
            "event reminder processed"
        );
        Ok(OutcomeStatus::Processed { notification_id })
    }

    fn deliver(&self, notification: Notification) {
        if let Some(ref tx) = self.fired_tx {
            let id = notification.id.clone();
            // try_send never blocks the tick; the notification is already stored.
            if tx.try_send(notification).is_err() {
                warn!(notification_id = %id, "delivery channel full or closed, notification not forwarded");
            }
        }
    }
}

fn skipped(reason: &str) -> OutcomeStatus {
    OutcomeStatus::Skipped {
        reason: reason.to_string(),
    }
}

fn unreadable(error: &str) -> OutcomeStatus {
    OutcomeStatus::Failed {
        error: format!("unreadable row: {error}"),
    }
}

fn failed(e: &crate::error::SchedulerError) -> OutcomeStatus {
    OutcomeStatus::Failed {
        error: e.to_string(),
    }
}
