//! Periodic driver around [`SchedulerEngine`].

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::{
    engine::SchedulerEngine,
    error::{Result, SchedulerError},
    report::TickReport,
};

/// Snapshot returned by [`SchedulerHandle::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    /// The timer task is alive and will fire again.
    pub has_timer_armed: bool,
    pub interval_minutes: Option<u64>,
    pub ticks_completed: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// Cloneable control surface for a running scheduler.
///
/// `start`/`stop` toggle a background timer task; `force_tick` runs a tick on
/// the caller's task. Every tick, timed or forced, takes the same async lock,
/// so two ticks never overlap.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<Inner>,
}

struct Inner {
    engine: SchedulerEngine,
    tick_lock: tokio::sync::Mutex<()>,
    state: Mutex<RunState>,
}

#[derive(Default)]
struct RunState {
    timer: Option<Timer>,
    interval_minutes: Option<u64>,
    ticks_completed: u64,
    last_report: Option<TickReport>,
}

struct Timer {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn new(engine: SchedulerEngine) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                tick_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(RunState::default()),
            }),
        }
    }

    pub fn engine(&self) -> &SchedulerEngine {
        &self.inner.engine
    }

    /// Arm the periodic timer and run one tick immediately.
    ///
    /// Returns the immediate tick's report, or `None` if the scheduler was
    /// already running (no-op).
    pub async fn start(&self, interval_minutes: u64) -> Result<Option<TickReport>> {
        let period = interval_period(interval_minutes)?;
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.timer.is_some() {
                info!("scheduler already running");
                return Ok(None);
            }
            let (shutdown, rx) = watch::channel(false);
            let task = tokio::spawn(run_timer(Arc::downgrade(&self.inner), period, rx));
            state.timer = Some(Timer { shutdown, task });
            state.interval_minutes = Some(interval_minutes);
        }
        info!(interval_minutes, "scheduler started");

        // The first timed tick is one full period away, so this cannot race it.
        Ok(Some(self.inner.run_tick().await))
    }

    /// Disarm the periodic timer. A tick already in progress runs to
    /// completion. Returns `false` if the scheduler was not running.
    pub fn stop(&self) -> bool {
        let timer = {
            let mut state = self.inner.state.lock().unwrap();
            state.interval_minutes = None;
            state.timer.take()
        };
        match timer {
            Some(timer) => {
                let _ = timer.shutdown.send(true);
                info!("scheduler stopped");
                true
            }
            None => {
                debug!("scheduler already stopped");
                false
            }
        }
    }

    /// Run one tick now, whatever the timer state.
    pub async fn force_tick(&self) -> TickReport {
        self.inner.run_tick().await
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock().unwrap();
        SchedulerStatus {
            is_running: state.timer.is_some(),
            has_timer_armed: state.timer.as_ref().is_some_and(|t| !t.task.is_finished()),
            interval_minutes: state.interval_minutes,
            ticks_completed: state.ticks_completed,
            last_tick_at: state.last_report.as_ref().map(|r| r.started_at),
        }
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.inner.state.lock().unwrap().last_report.clone()
    }
}

impl Inner {
    async fn run_tick(&self) -> TickReport {
        let _guard = self.tick_lock.lock().await;
        let report = self.engine.tick().await;
        let mut state = self.state.lock().unwrap();
        state.ticks_completed += 1;
        state.last_report = Some(report.clone());
        report
    }
}

fn interval_period(interval_minutes: u64) -> Result<Duration> {
    if interval_minutes == 0 {
        return Err(SchedulerError::InvalidInterval(
            "interval_minutes must be at least 1".to_string(),
        ));
    }
    interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            SchedulerError::InvalidInterval(format!("{interval_minutes} minutes is too long"))
        })
}

/// Timer loop. Exits on shutdown or once every handle has been dropped.
async fn run_timer(inner: Weak<Inner>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    // A tick that overruns the period swallows the fires it missed.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.run_tick().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("scheduler timer exited");
}
