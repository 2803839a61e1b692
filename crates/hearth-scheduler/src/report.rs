//! Per-tick outcome reporting.

use chrono::{DateTime, Utc};
use hearth_core::NotificationId;
use serde::Serialize;

/// What happened during one tick, pipeline by pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub templates: PipelineReport,
    pub reminders: PipelineReport,
}

impl TickReport {
    /// Notifications inserted by this tick. Recovered ones are not counted.
    pub fn notifications_created(&self) -> usize {
        self.templates
            .outcomes
            .iter()
            .chain(&self.reminders.outcomes)
            .filter(|o| o.status.created_notification())
            .count()
    }

    pub fn failures(&self) -> usize {
        self.templates.failures() + self.reminders.failures()
    }

    /// No item failed and neither pipeline aborted.
    pub fn is_clean(&self) -> bool {
        self.failures() == 0 && self.templates.aborted.is_none() && self.reminders.aborted.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub outcomes: Vec<ItemOutcome>,
    /// Set when the pipeline stopped early because the store went away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl PipelineReport {
    pub(crate) fn aborted(reason: String) -> Self {
        Self {
            outcomes: Vec::new(),
            aborted: Some(reason),
        }
    }

    pub(crate) fn push(&mut self, item_id: impl Into<String>, status: OutcomeStatus) {
        self.outcomes.push(ItemOutcome {
            item_id: item_id.into(),
            status,
        });
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed { .. }))
            .count()
    }

    /// Status recorded for `item_id`, if it was visited.
    pub fn status_of(&self, item_id: &str) -> Option<&OutcomeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.item_id == item_id)
            .map(|o| &o.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub item_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Template fired and was rescheduled.
    Fired {
        notification_id: NotificationId,
        next_execution: DateTime<Utc>,
    },
    /// Template fired for the last allowed time and was deactivated.
    Exhausted { notification_id: NotificationId },
    /// Template fired but its rule could not produce a next occurrence.
    Deactivated {
        notification_id: NotificationId,
        reason: String,
    },
    /// Reminder produced a notification and was marked processed.
    Processed { notification_id: NotificationId },
    /// Reminder was marked processed using a notification from an earlier
    /// attempt.
    Recovered { notification_id: NotificationId },
    /// Item changed between selection and processing.
    Skipped { reason: String },
    Failed { error: String },
}

impl OutcomeStatus {
    pub fn notification_id(&self) -> Option<&NotificationId> {
        match self {
            OutcomeStatus::Fired {
                notification_id, ..
            }
            | OutcomeStatus::Exhausted { notification_id }
            | OutcomeStatus::Deactivated {
                notification_id, ..
            }
            | OutcomeStatus::Processed { notification_id }
            | OutcomeStatus::Recovered { notification_id } => Some(notification_id),
            OutcomeStatus::Skipped { .. } | OutcomeStatus::Failed { .. } => None,
        }
    }

    fn created_notification(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::Fired { .. }
                | OutcomeStatus::Exhausted { .. }
                | OutcomeStatus::Deactivated { .. }
                | OutcomeStatus::Processed { .. }
        )
    }
}
