use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hearth_core::config::HearthConfig;
use hearth_protocol::frames::EventFrame;
use hearth_scheduler::{ReminderPolicy, SchedulerHandle, SqliteStore};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// Central shared state, passed as `Arc<AppState>` to every control handler.
pub struct AppState {
    pub config: HearthConfig,
    pub tz: Tz,
    pub store: Arc<SqliteStore>,
    pub scheduler: SchedulerHandle,
    pub reminder_policy: ReminderPolicy,
    pub event_seq: AtomicU64,
    /// Outbound lines for stdout (responses and pushed events).
    pub out: mpsc::Sender<String>,
}

impl AppState {
    pub fn new(
        config: HearthConfig,
        tz: Tz,
        store: Arc<SqliteStore>,
        scheduler: SchedulerHandle,
        out: mpsc::Sender<String>,
    ) -> Self {
        let reminder_policy = ReminderPolicy::from(&config.reminders);
        Self {
            config,
            tz,
            store,
            scheduler,
            reminder_policy,
            event_seq: AtomicU64::new(0),
            out,
        }
    }

    /// Monotonically increasing sequence for pushed events.
    pub fn next_seq(&self) -> u64 {
        self.event_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// The scheduler's notion of "now", shared with user-initiated writes.
    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.engine().now()
    }

    /// Queue a frame for stdout.
    pub async fn send<T: Serialize>(&self, frame: &T) {
        let line = match serde_json::to_string(frame) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "frame serialization failed, frame dropped");
                return;
            }
        };
        if self.out.send(line).await.is_err() {
            warn!("output channel closed, frame dropped");
        }
    }

    /// Push an event frame with the next sequence number.
    pub async fn emit(&self, event: &str, payload: impl Serialize) {
        let frame = EventFrame::new(event, payload, self.next_seq());
        self.send(&frame).await;
    }
}
