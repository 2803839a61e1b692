//! Start/stop/status/force-tick behaviour of the periodic driver, on paused
//! tokio time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hearth_core::{NotificationId, ReminderId, TemplateId};
use hearth_scheduler::store::{DueBatch, StoreResult};
use hearth_scheduler::{
    Clock, EventReminder, Frequency, ManualClock, NewNotification, NewTemplate, Notification,
    RecurringTemplate, ScheduleStore, SchedulerEngine, SchedulerError, SchedulerHandle,
    SourceType, SqliteStore,
};
use rusqlite::Connection;

/// SQLite, but every read-then-write step of a tick gives up the task first,
/// so a second tick polled alongside gets every chance to interleave.
struct YieldingStore {
    inner: Arc<SqliteStore>,
}

#[async_trait]
impl ScheduleStore for YieldingStore {
    async fn find_templates_due_for_execution(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<RecurringTemplate>> {
        tokio::task::yield_now().await;
        self.inner.find_templates_due_for_execution(now).await
    }

    async fn find_unprocessed_reminders_due(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<EventReminder>> {
        self.inner.find_unprocessed_reminders_due(now).await
    }

    async fn fetch_template(&self, id: &TemplateId) -> StoreResult<Option<RecurringTemplate>> {
        tokio::task::yield_now().await;
        self.inner.fetch_template(id).await
    }

    async fn fetch_reminder(&self, id: &ReminderId) -> StoreResult<Option<EventReminder>> {
        self.inner.fetch_reminder(id).await
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> StoreResult<NotificationId> {
        tokio::task::yield_now().await;
        self.inner.insert_notification(notification, created_at).await
    }

    async fn find_notification_by_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> StoreResult<Option<Notification>> {
        self.inner
            .find_notification_by_source(source_type, source_id)
            .await
    }

    async fn update_template_after_execution(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
        next_execution: DateTime<Utc>,
    ) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner
            .update_template_after_execution(id, executed_at, next_execution)
            .await
    }

    async fn deactivate_template(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.inner.deactivate_template(id, executed_at).await
    }

    async fn mark_reminder_processed(
        &self,
        id: &ReminderId,
        notification_id: &NotificationId,
    ) -> StoreResult<bool> {
        self.inner.mark_reminder_processed(id, notification_id).await
    }
}

fn stand_up() -> NewTemplate {
    NewTemplate {
        title: "Stand up".to_string(),
        message: "Stretch your legs".to_string(),
        notification_type: Default::default(),
        frequency: Frequency::Daily,
        show_time: "09:00".to_string(),
        weekdays: None,
        month_day: None,
        max_executions: None,
        priority: Default::default(),
        category: None,
        tags: vec![],
    }
}

fn setup() -> (Arc<SqliteStore>, Arc<ManualClock>, SchedulerHandle) {
    let store = Arc::new(SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
    ));
    let engine = SchedulerEngine::new(store.clone(), clock.clone(), chrono_tz::UTC);
    (store, clock, SchedulerHandle::new(engine))
}

/// Let spawned tasks run to their next await point.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn start_ticks_immediately_then_on_every_interval() {
    let (_store, _clock, handle) = setup();

    let first = handle.start(5).await.unwrap();
    assert!(first.is_some());
    let status = handle.status();
    assert!(status.is_running);
    assert!(status.has_timer_armed);
    assert_eq!(status.interval_minutes, Some(5));
    assert_eq!(status.ticks_completed, 1);

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    settle().await;
    assert_eq!(handle.status().ticks_completed, 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(handle.status().ticks_completed, 2);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    assert_eq!(handle.status().ticks_completed, 3);

    assert!(handle.stop());
}

#[tokio::test(start_paused = true)]
async fn start_twice_is_a_noop() {
    let (_store, _clock, handle) = setup();
    assert!(handle.start(1).await.unwrap().is_some());
    assert!(handle.start(10).await.unwrap().is_none());

    let status = handle.status();
    assert_eq!(status.interval_minutes, Some(1));
    assert_eq!(status.ticks_completed, 1);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_disarms_the_timer() {
    let (_store, _clock, handle) = setup();
    handle.start(1).await.unwrap();
    assert!(handle.stop());
    assert!(!handle.stop());

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    settle().await;

    let status = handle.status();
    assert!(!status.is_running);
    assert!(!status.has_timer_armed);
    assert_eq!(status.interval_minutes, None);
    assert_eq!(status.ticks_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop() {
    let (_store, _clock, handle) = setup();
    handle.start(1).await.unwrap();
    handle.stop();
    assert!(handle.start(2).await.unwrap().is_some());
    assert_eq!(handle.status().interval_minutes, Some(2));
    assert_eq!(handle.status().ticks_completed, 2);
    handle.stop();
}

#[tokio::test]
async fn zero_interval_is_rejected_and_stays_stopped() {
    let (_store, _clock, handle) = setup();
    assert!(matches!(
        handle.start(0).await,
        Err(SchedulerError::InvalidInterval(_))
    ));
    assert!(!handle.status().is_running);
}

#[tokio::test(start_paused = true)]
async fn force_tick_leaves_the_timer_alone() {
    let (store, clock, handle) = setup();
    let t = store
        .create_template(&stand_up(), clock.now(), &chrono_tz::UTC)
        .unwrap();

    // Stopped: forcing does not start anything.
    clock.advance(chrono::Duration::hours(2));
    let report = handle.force_tick().await;
    assert_eq!(report.notifications_created(), 1);
    assert!(!handle.status().is_running);
    assert_eq!(store.get_template(&t.id).unwrap().execution_count, 1);

    // Running: forcing does not disturb the schedule.
    handle.start(5).await.unwrap();
    handle.force_tick().await;
    assert!(handle.status().has_timer_armed);
    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    settle().await;
    assert_eq!(handle.status().ticks_completed, 4);
    assert_eq!(
        handle.last_report().map(|r| r.started_at),
        handle.status().last_tick_at
    );
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn clones_share_one_scheduler() {
    let (_store, _clock, handle) = setup();
    handle.start(1).await.unwrap();
    let other = handle.clone();
    drop(handle);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(other.status().ticks_completed, 2);
    assert!(other.stop());
}

#[tokio::test]
async fn concurrent_ticks_fire_a_due_template_once() {
    let store = Arc::new(SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
    ));
    let t = store
        .create_template(&stand_up(), clock.now(), &chrono_tz::UTC)
        .unwrap();
    let yielding = Arc::new(YieldingStore {
        inner: store.clone(),
    });
    let handle = SchedulerHandle::new(SchedulerEngine::new(
        yielding,
        clock.clone(),
        chrono_tz::UTC,
    ));
    clock.advance(chrono::Duration::hours(2));

    let other = handle.clone();
    let (a, b) = tokio::join!(handle.force_tick(), other.force_tick());

    assert_eq!(a.notifications_created() + b.notifications_created(), 1);
    assert_eq!(store.list_notifications(false, 10).unwrap().len(), 1);
    assert_eq!(store.get_template(&t.id).unwrap().execution_count, 1);
    assert_eq!(handle.status().ticks_completed, 2);
}

#[tokio::test(start_paused = true)]
async fn forced_tick_and_timer_tick_do_not_overlap() {
    let store = Arc::new(SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
    ));
    let handle = SchedulerHandle::new(SchedulerEngine::new(
        Arc::new(YieldingStore {
            inner: store.clone(),
        }),
        clock.clone(),
        chrono_tz::UTC,
    ));
    handle.start(1).await.unwrap();

    let t = store
        .create_template(&stand_up(), clock.now(), &chrono_tz::UTC)
        .unwrap();
    clock.advance(chrono::Duration::hours(2));

    // The timer fires while the forced tick is between its reads and writes.
    let forced = handle.force_tick();
    let timed = async {
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
    };
    let (report, ()) = tokio::join!(forced, timed);
    settle().await;

    assert_eq!(report.notifications_created(), 1);
    assert_eq!(handle.status().ticks_completed, 3);
    assert_eq!(store.list_notifications(false, 10).unwrap().len(), 1);
    assert_eq!(store.get_template(&t.id).unwrap().execution_count, 1);
    handle.stop();
}
