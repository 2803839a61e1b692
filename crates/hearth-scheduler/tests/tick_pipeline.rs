//! Tick behaviour against a real SQLite store, with faults injected through
//! a wrapping `ScheduleStore`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hearth_core::{EventId, NotificationId, ReminderId, TemplateId};
use hearth_scheduler::store::{DueBatch, StoreResult};
use hearth_scheduler::{
    Clock, EventReminder, Frequency, ManualClock, NewEventReminder, NewNotification, NewTemplate,
    Notification, OutcomeStatus, RecurringTemplate, ReminderKind, ScheduleStore, SchedulerEngine,
    SourceType, SqliteStore, StoreError,
};
use rusqlite::Connection;

// ---------------------------------------------------------------------------
// Fault-injecting store
// ---------------------------------------------------------------------------

/// Delegates to SQLite unless a fault is armed.
#[derive(Default)]
struct Faults {
    /// Inserts whose `source_id` is in this set fail with a query error.
    failing_sources: Mutex<HashSet<String>>,
    /// Every template reschedule reports the database as unreachable.
    reschedule_unavailable: AtomicBool,
    /// The next mark-processed call fails once.
    fail_next_mark: AtomicBool,
    /// Templates that look deleted when re-read.
    vanished: Mutex<HashSet<String>>,
    /// Templates that look paused when re-read.
    paused_on_fetch: Mutex<HashSet<String>>,
    /// Templates the user switches off just before the scheduler retires them.
    deactivated_before_retire: Mutex<HashSet<String>>,
}

struct FlakyStore {
    inner: Arc<SqliteStore>,
    faults: Arc<Faults>,
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn find_templates_due_for_execution(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<RecurringTemplate>> {
        self.inner.find_templates_due_for_execution(now).await
    }

    async fn find_unprocessed_reminders_due(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<DueBatch<EventReminder>> {
        self.inner.find_unprocessed_reminders_due(now).await
    }

    async fn fetch_template(&self, id: &TemplateId) -> StoreResult<Option<RecurringTemplate>> {
        if self.faults.vanished.lock().unwrap().contains(id.as_str()) {
            return Ok(None);
        }
        let mut found = self.inner.fetch_template(id).await?;
        if self.faults.paused_on_fetch.lock().unwrap().contains(id.as_str()) {
            if let Some(t) = found.as_mut() {
                t.is_paused = true;
            }
        }
        Ok(found)
    }

    async fn fetch_reminder(&self, id: &ReminderId) -> StoreResult<Option<EventReminder>> {
        self.inner.fetch_reminder(id).await
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> StoreResult<NotificationId> {
        if let Some(source) = &notification.source_id {
            if self.faults.failing_sources.lock().unwrap().contains(source) {
                return Err(StoreError::Query(format!("injected insert failure for {source}")));
            }
        }
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
        if self.faults.reschedule_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database is locked".to_string()));
        }
        self.inner
            .update_template_after_execution(id, executed_at, next_execution)
            .await
    }

    async fn deactivate_template(
        &self,
        id: &TemplateId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if self
            .faults
            .deactivated_before_retire
            .lock()
            .unwrap()
            .contains(id.as_str())
        {
            self.inner
                .set_template_active(id, false, executed_at, &chrono_tz::UTC)
                .unwrap();
        }
        self.inner.deactivate_template(id, executed_at).await
    }

    async fn mark_reminder_processed(
        &self,
        id: &ReminderId,
        notification_id: &NotificationId,
    ) -> StoreResult<bool> {
        if self.faults.fail_next_mark.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Query("injected mark failure".to_string()));
        }
        self.inner.mark_reminder_processed(id, notification_id).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<SqliteStore>,
    faults: Arc<Faults>,
    clock: Arc<ManualClock>,
    engine: SchedulerEngine,
}

/// Monday 2026-03-02 08:00 UTC.
fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn harness() -> Harness {
    let store = Arc::new(SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let faults = Arc::new(Faults::default());
    let clock = Arc::new(ManualClock::new(monday_morning()));
    let flaky = Arc::new(FlakyStore {
        inner: store.clone(),
        faults: faults.clone(),
    });
    let engine = SchedulerEngine::new(flaky, clock.clone(), chrono_tz::UTC);
    Harness {
        store,
        faults,
        clock,
        engine,
    }
}

fn template(title: &str, frequency: Frequency, show_time: &str) -> NewTemplate {
    NewTemplate {
        title: title.to_string(),
        message: format!("{title}!"),
        notification_type: Default::default(),
        frequency,
        show_time: show_time.to_string(),
        weekdays: None,
        month_day: None,
        max_executions: None,
        priority: Default::default(),
        category: Some("habits".to_string()),
        tags: vec!["daily".to_string()],
    }
}

impl Harness {
    fn add(&self, new: &NewTemplate) -> RecurringTemplate {
        self.store
            .create_template(new, self.clock.now(), &chrono_tz::UTC)
            .unwrap()
    }

    fn add_reminder(&self, event: &str, kind: ReminderKind, trigger_at: DateTime<Utc>) -> EventReminder {
        let mut added = self
            .store
            .replace_event_reminders(
                &EventId::from(event),
                &[NewEventReminder {
                    event_name: format!("{event} event"),
                    reminder_kind: kind,
                    trigger_at,
                }],
                self.clock.now(),
            )
            .unwrap();
        added.remove(0)
    }

    fn notifications(&self) -> Vec<Notification> {
        self.store.list_notifications(false, 100).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn due_daily_template_produces_one_notification_and_advances() {
    let h = harness();
    let t = h.add(&template("Vitamins", Frequency::Daily, "09:00"));

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    let report = h.engine.tick().await;
    assert!(report.is_clean());

    let notes = h.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].source_type, SourceType::Template);
    assert_eq!(notes[0].source_id.as_deref(), Some(t.id.as_str()));
    assert_eq!(notes[0].title, "Vitamins");
    assert_eq!(notes[0].category.as_deref(), Some("habits"));
    assert_eq!(notes[0].frequency, "ONCE");

    let after = h.store.get_template(&t.id).unwrap();
    assert!(after.next_execution > h.clock.now());
    assert_eq!(after.next_execution, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
    assert_eq!(after.execution_count, 1);
    assert_eq!(after.last_executed, Some(h.clock.now()));

    // Same instant again: nothing left to do.
    let again = h.engine.tick().await;
    assert_eq!(again.notifications_created(), 0);
}

#[tokio::test]
async fn daily_template_with_weekdays_fires_only_on_listed_days() {
    let h = harness();
    let mut new = template("Gym", Frequency::Daily, "18:00");
    // Monday, Wednesday, Friday
    new.weekdays = Some(vec![1, 3, 5]);
    let t = h.add(&new);
    assert_eq!(t.next_execution, Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap());

    let mut fired_on = Vec::new();
    for day in 2..=8 {
        h.clock.set(Utc.with_ymd_and_hms(2026, 3, day, 20, 0, 0).unwrap());
        if h.engine.tick().await.notifications_created() == 1 {
            fired_on.push(day);
        }
    }
    assert_eq!(fired_on, vec![2, 4, 6]);
}

#[tokio::test]
async fn max_executions_deactivates_after_final_firing() {
    let h = harness();
    let mut new = template("Course", Frequency::Daily, "09:00");
    new.max_executions = Some(2);
    let t = h.add(&new);

    for day in 2..=5 {
        h.clock.set(Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap());
        h.engine.tick().await;
    }

    let after = h.store.get_template(&t.id).unwrap();
    assert!(!after.is_active);
    assert_eq!(after.execution_count, 2);
    assert_eq!(after.next_execution, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
    assert_eq!(h.notifications().len(), 2);
}

#[tokio::test]
async fn one_failing_template_does_not_block_the_others() {
    let h = harness();
    let a = h.add(&template("A", Frequency::Daily, "09:00"));
    let b = h.add(&template("B", Frequency::Daily, "09:00"));
    let c = h.add(&template("C", Frequency::Daily, "09:00"));
    h.faults
        .failing_sources
        .lock()
        .unwrap()
        .insert(b.id.to_string());

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(report.templates.aborted.is_none());
    assert_eq!(report.failures(), 1);
    assert!(matches!(
        report.templates.status_of(a.id.as_str()),
        Some(OutcomeStatus::Fired { .. })
    ));
    assert!(matches!(
        report.templates.status_of(b.id.as_str()),
        Some(OutcomeStatus::Failed { .. })
    ));
    assert!(matches!(
        report.templates.status_of(c.id.as_str()),
        Some(OutcomeStatus::Fired { .. })
    ));

    // The failed one was not advanced and is retried once the fault clears.
    assert_eq!(h.store.get_template(&b.id).unwrap().execution_count, 0);
    h.faults.failing_sources.lock().unwrap().clear();
    let retry = h.engine.tick().await;
    assert_eq!(retry.templates.outcomes.len(), 1);
    assert!(matches!(
        retry.templates.status_of(b.id.as_str()),
        Some(OutcomeStatus::Fired { .. })
    ));
    assert_eq!(h.notifications().len(), 3);
}

#[tokio::test]
async fn unavailable_store_aborts_only_the_template_pass() {
    let h = harness();
    h.add(&template("A", Frequency::Daily, "09:00"));
    h.add(&template("B", Frequency::Daily, "09:00"));
    let r = h.add_reminder("launch", ReminderKind::Start, monday_morning());
    h.faults.reschedule_unavailable.store(true, Ordering::SeqCst);

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(report.templates.aborted.is_some());
    assert_eq!(report.templates.outcomes.len(), 1);
    assert!(report.reminders.aborted.is_none());
    assert!(matches!(
        report.reminders.status_of(r.id.as_str()),
        Some(OutcomeStatus::Processed { .. })
    ));
}

#[tokio::test]
async fn template_deleted_mid_tick_is_skipped() {
    let h = harness();
    let t = h.add(&template("Gone", Frequency::Daily, "09:00"));
    h.faults.vanished.lock().unwrap().insert(t.id.to_string());

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(report.is_clean());
    assert!(matches!(
        report.templates.status_of(t.id.as_str()),
        Some(OutcomeStatus::Skipped { .. })
    ));
    assert!(h.notifications().is_empty());
}

#[tokio::test]
async fn template_paused_mid_tick_is_skipped() {
    let h = harness();
    let t = h.add(&template("Paused", Frequency::Daily, "09:00"));
    h.faults.paused_on_fetch.lock().unwrap().insert(t.id.to_string());

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(matches!(
        report.templates.status_of(t.id.as_str()),
        Some(OutcomeStatus::Skipped { .. })
    ));
    assert!(h.notifications().is_empty());
    assert_eq!(h.store.get_template(&t.id).unwrap().execution_count, 0);
}

#[tokio::test]
async fn template_switched_off_before_retirement_is_skipped() {
    let h = harness();
    let mut new = template("Last call", Frequency::Daily, "09:00");
    new.max_executions = Some(1);
    let t = h.add(&new);
    h.faults
        .deactivated_before_retire
        .lock()
        .unwrap()
        .insert(t.id.to_string());

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(matches!(
        report.templates.status_of(t.id.as_str()),
        Some(OutcomeStatus::Skipped { .. })
    ));
    let after = h.store.get_template(&t.id).unwrap();
    assert!(!after.is_active);
    assert_eq!(after.execution_count, 0);
}

#[tokio::test]
async fn unreadable_due_template_is_reported_every_tick() {
    let h = harness();
    let broken = h.add(&template("Broken", Frequency::Daily, "09:00"));
    let fine = h.add(&template("Fine", Frequency::Daily, "09:00"));
    h.store
        .with_conn(|conn| {
            conn.execute(
                "UPDATE recurring_templates SET weekdays = '[\"mon\"]' WHERE id = ?1",
                [broken.id.as_str()],
            )
        })
        .unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    let report = h.engine.tick().await;

    assert!(!report.is_clean());
    assert_eq!(report.failures(), 1);
    assert!(matches!(
        report.templates.status_of(broken.id.as_str()),
        Some(OutcomeStatus::Failed { .. })
    ));
    assert!(matches!(
        report.templates.status_of(fine.id.as_str()),
        Some(OutcomeStatus::Fired { .. })
    ));
    assert_eq!(h.notifications().len(), 1);

    // Still due, still unreadable: it shows up again rather than vanishing.
    h.clock.advance(Duration::minutes(1));
    let again = h.engine.tick().await;
    assert_eq!(again.failures(), 1);
    assert!(again.templates.status_of(broken.id.as_str()).is_some());

    // Listings leave it out instead of failing.
    assert_eq!(h.store.list_templates().unwrap().len(), 1);
}

#[tokio::test]
async fn unreadable_due_reminder_is_reported() {
    let h = harness();
    let r = h.add_reminder("retreat", ReminderKind::Start, monday_morning());
    h.store
        .with_conn(|conn| {
            conn.execute(
                "UPDATE event_reminders SET trigger_at = '2026-03-01' WHERE id = ?1",
                [r.id.as_str()],
            )
        })
        .unwrap();

    let report = h.engine.tick().await;
    assert!(matches!(
        report.reminders.status_of(r.id.as_str()),
        Some(OutcomeStatus::Failed { .. })
    ));
}

#[tokio::test]
async fn monthly_template_from_the_31st_returns_to_the_31st() {
    let h = harness();
    h.clock.set(Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap());
    let t = h.add(&template("Rent", Frequency::Monthly, "09:00"));
    assert_eq!(t.month_day, Some(31));
    assert_eq!(t.next_execution, Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap());

    let mut seen = vec![t.next_execution];
    for _ in 0..3 {
        let due = h.store.get_template(&t.id).unwrap().next_execution;
        h.clock.set(due + Duration::minutes(1));
        h.engine.tick().await;
        seen.push(h.store.get_template(&t.id).unwrap().next_execution);
    }

    let expected: Vec<DateTime<Utc>> = [(1, 31), (2, 28), (3, 31), (4, 30)]
        .into_iter()
        .map(|(m, d)| Utc.with_ymd_and_hms(2026, m, d, 9, 0, 0).unwrap())
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn monthly_row_without_month_day_anchors_on_creation_day() {
    let h = harness();
    h.clock.set(Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap());
    let t = h.add(&template("Rent", Frequency::Monthly, "09:00"));
    // Rows written by other clients may leave the day open.
    h.store
        .with_conn(|conn| {
            conn.execute(
                "UPDATE recurring_templates SET month_day = NULL,
                        next_execution = '2026-02-28T09:00:00.000Z'
                 WHERE id = ?1",
                [t.id.as_str()],
            )
        })
        .unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2026, 2, 28, 9, 1, 0).unwrap());
    h.engine.tick().await;
    assert_eq!(
        h.store.get_template(&t.id).unwrap().next_execution,
        Utc.with_ymd_and_hms(2026, 3, 31, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn paused_template_is_not_selected_and_resume_skips_backlog() {
    let h = harness();
    let t = h.add(&template("Walk", Frequency::Daily, "09:00"));
    h.store
        .set_template_paused(&t.id, true, h.clock.now(), &chrono_tz::UTC)
        .unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap());
    assert!(h.engine.tick().await.templates.outcomes.is_empty());

    let resumed = h
        .store
        .set_template_paused(&t.id, false, h.clock.now(), &chrono_tz::UTC)
        .unwrap();
    assert_eq!(
        resumed.next_execution,
        Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()
    );
    assert_eq!(h.engine.tick().await.notifications_created(), 0);
}

// ---------------------------------------------------------------------------
// Event reminders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn due_start_reminder_is_processed_and_linked() {
    let h = harness();
    let r = h.add_reminder("retreat", ReminderKind::Start, monday_morning() - Duration::hours(1));

    let report = h.engine.tick().await;
    let Some(OutcomeStatus::Processed { notification_id }) =
        report.reminders.status_of(r.id.as_str())
    else {
        panic!("expected processed, got {:?}", report.reminders);
    };

    let notes = h.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(&notes[0].id, notification_id);
    assert_eq!(notes[0].source_type, SourceType::EventStart);
    assert_eq!(notes[0].title, "Reminder: retreat event");
    assert_eq!(notes[0].category.as_deref(), Some("events"));

    let stored = h
        .store
        .list_event_reminders(&EventId::from("retreat"))
        .unwrap();
    assert!(stored[0].is_processed);
    assert_eq!(stored[0].notification_id.as_ref(), Some(notification_id));
}

#[tokio::test]
async fn reminder_is_materialized_at_most_once() {
    let h = harness();
    h.add_reminder("retreat", ReminderKind::End, monday_morning());

    h.engine.tick().await;
    h.clock.advance(Duration::hours(1));
    h.engine.tick().await;
    h.clock.advance(Duration::days(30));
    h.engine.tick().await;

    let notes = h.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].source_type, SourceType::EventEnd);
}

#[tokio::test]
async fn future_reminder_waits_for_its_trigger() {
    let h = harness();
    let r = h.add_reminder("retreat", ReminderKind::Start, monday_morning() + Duration::hours(2));

    assert!(h.engine.tick().await.reminders.outcomes.is_empty());
    h.clock.advance(Duration::hours(2));
    let report = h.engine.tick().await;
    assert!(matches!(
        report.reminders.status_of(r.id.as_str()),
        Some(OutcomeStatus::Processed { .. })
    ));
}

#[tokio::test]
async fn failed_mark_is_recovered_without_a_duplicate() {
    let h = harness();
    let r = h.add_reminder("retreat", ReminderKind::Start, monday_morning());
    h.faults.fail_next_mark.store(true, Ordering::SeqCst);

    let first = h.engine.tick().await;
    assert!(matches!(
        first.reminders.status_of(r.id.as_str()),
        Some(OutcomeStatus::Failed { .. })
    ));
    let orphan = h.notifications();
    assert_eq!(orphan.len(), 1);

    let second = h.engine.tick().await;
    let Some(OutcomeStatus::Recovered { notification_id }) =
        second.reminders.status_of(r.id.as_str())
    else {
        panic!("expected recovered, got {:?}", second.reminders);
    };
    assert_eq!(notification_id, &orphan[0].id);
    assert_eq!(h.notifications().len(), 1);

    let stored = h
        .store
        .list_event_reminders(&EventId::from("retreat"))
        .unwrap();
    assert!(stored[0].is_processed);
    assert_eq!(stored[0].notification_id.as_ref(), Some(&orphan[0].id));
}

#[tokio::test]
async fn replacing_reminders_resets_them() {
    let h = harness();
    h.add_reminder("retreat", ReminderKind::Start, monday_morning());
    h.engine.tick().await;

    // Rescheduled event: a fresh reminder for the same kind fires again.
    let fresh = h.add_reminder("retreat", ReminderKind::Start, monday_morning() + Duration::hours(1));
    assert!(!fresh.is_processed);
    h.clock.advance(Duration::hours(1));
    let report = h.engine.tick().await;
    assert!(matches!(
        report.reminders.status_of(fresh.id.as_str()),
        Some(OutcomeStatus::Processed { .. })
    ));
    assert_eq!(h.notifications().len(), 2);
}
