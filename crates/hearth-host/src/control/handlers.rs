//! Concrete control method handlers.
//!
//! Each function extracts its parameters, calls the store or scheduler held by
//! `AppState`, and returns a `ResFrame`. `dispatch::route` is the only caller.

use hearth_core::{EventId, NotificationId, TemplateId};
use hearth_protocol::frames::ResFrame;
use hearth_protocol::methods::{
    ERR_INVALID_PARAMS, EVENT_NOTIFICATION_CREATED, EVENT_SCHEDULER_TICK,
};
use hearth_scheduler::{
    plan_event_reminders, EventSchedule, NewNotification, NewTemplate, SchedulerError, SourceType,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::app::AppState;

/// Map a scheduler failure to an error response, keeping the error's code.
fn map_scheduler_error(req_id: &str, method: &str, e: SchedulerError) -> ResFrame {
    warn!(error = %e, "{method} failed");
    ResFrame::err(req_id, e.code(), &e.to_string())
}

/// Deserialize the whole params object into `T`.
fn parse_params<T: DeserializeOwned>(
    params: Option<&serde_json::Value>,
    req_id: &str,
) -> Result<T, ResFrame> {
    let p = params.ok_or_else(|| ResFrame::err(req_id, ERR_INVALID_PARAMS, "params object required"))?;
    serde_json::from_value(p.clone())
        .map_err(|e| ResFrame::err(req_id, ERR_INVALID_PARAMS, &format!("bad params: {e}")))
}

/// A required, non-empty string field.
fn required_str<'a>(
    params: Option<&'a serde_json::Value>,
    field: &str,
    req_id: &str,
) -> Result<&'a str, ResFrame> {
    match params.and_then(|p| p.get(field)).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ResFrame::err(
            req_id,
            ERR_INVALID_PARAMS,
            &format!("missing or empty '{field}' field"),
        )),
    }
}

// ---------------------------------------------------------------------------
// scheduler.start
// ---------------------------------------------------------------------------

/// Handler for `scheduler.start`.
///
/// Params: `{ "interval_minutes"?: number }` (defaults to the configured interval)
pub async fn handle_scheduler_start(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let interval = match params.and_then(|p| p.get("interval_minutes")) {
        None | Some(serde_json::Value::Null) => app.config.scheduler.interval_minutes,
        Some(v) => match v.as_u64() {
            Some(n) => n,
            None => {
                return ResFrame::err(
                    req_id,
                    ERR_INVALID_PARAMS,
                    "'interval_minutes' must be a positive integer",
                )
            }
        },
    };

    match app.scheduler.start(interval).await {
        Ok(Some(report)) => {
            app.emit(EVENT_SCHEDULER_TICK, &report).await;
            ResFrame::ok(
                req_id,
                serde_json::json!({ "started": true, "status": app.scheduler.status() }),
            )
        }
        Ok(None) => ResFrame::ok(
            req_id,
            serde_json::json!({ "started": false, "status": app.scheduler.status() }),
        ),
        Err(e) => map_scheduler_error(req_id, "scheduler.start", e),
    }
}

// ---------------------------------------------------------------------------
// scheduler.stop
// ---------------------------------------------------------------------------

pub fn handle_scheduler_stop(req_id: &str, app: &AppState) -> ResFrame {
    let stopped = app.scheduler.stop();
    ResFrame::ok(req_id, serde_json::json!({ "stopped": stopped }))
}

// ---------------------------------------------------------------------------
// scheduler.force_process
// ---------------------------------------------------------------------------

/// Handler for `scheduler.force_process`.
///
/// Runs one tick now. `success` is false if any item failed or a pipeline
/// aborted; the full report rides along for diagnostics.
pub async fn handle_scheduler_force_process(req_id: &str, app: &AppState) -> ResFrame {
    let report = app.scheduler.force_tick().await;
    info!(
        created = report.notifications_created(),
        failures = report.failures(),
        "forced tick finished"
    );
    ResFrame::ok(
        req_id,
        serde_json::json!({ "success": report.is_clean(), "report": report }),
    )
}

// ---------------------------------------------------------------------------
// templates.*
// ---------------------------------------------------------------------------

pub fn handle_templates_list(req_id: &str, app: &AppState) -> ResFrame {
    match app.store.list_templates() {
        Ok(templates) => ResFrame::ok(req_id, serde_json::json!({ "templates": templates })),
        Err(e) => map_scheduler_error(req_id, "templates.list", e),
    }
}

/// Handler for `templates.create`.
///
/// Params: a `NewTemplate` object (`title`, `message`, `frequency`,
/// `show_time`, optional `weekdays` / `month_day` / `max_executions` / ...).
pub fn handle_templates_create(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let new: NewTemplate = match parse_params(params, req_id) {
        Ok(n) => n,
        Err(res) => return res,
    };
    if new.title.trim().is_empty() {
        return ResFrame::err(req_id, ERR_INVALID_PARAMS, "title cannot be empty");
    }

    match app.store.create_template(&new, app.now(), &app.tz) {
        Ok(template) => ResFrame::ok(req_id, serde_json::json!({ "template": template })),
        Err(e) => map_scheduler_error(req_id, "templates.create", e),
    }
}

/// Handler for `templates.update`.
///
/// Params: `{ "id": string, ...NewTemplate }`. The schedule is re-validated
/// and `next_execution` recomputed from now; counters are kept.
pub fn handle_templates_update(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = match required_str(params, "id", req_id) {
        Ok(s) => TemplateId::from(s),
        Err(res) => return res,
    };
    let new: NewTemplate = match parse_params(params, req_id) {
        Ok(n) => n,
        Err(res) => return res,
    };
    if new.title.trim().is_empty() {
        return ResFrame::err(req_id, ERR_INVALID_PARAMS, "title cannot be empty");
    }

    match app.store.update_template(&id, &new, app.now(), &app.tz) {
        Ok(template) => ResFrame::ok(req_id, serde_json::json!({ "template": template })),
        Err(e) => map_scheduler_error(req_id, "templates.update", e),
    }
}

/// Handler for `templates.set_paused`.
///
/// Params: `{ "id": string, "paused": bool }`
pub fn handle_templates_set_paused(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = match required_str(params, "id", req_id) {
        Ok(s) => TemplateId::from(s),
        Err(res) => return res,
    };
    let paused = match params.and_then(|p| p.get("paused")).and_then(|v| v.as_bool()) {
        Some(b) => b,
        None => return ResFrame::err(req_id, ERR_INVALID_PARAMS, "missing 'paused' field"),
    };

    match app.store.set_template_paused(&id, paused, app.now(), &app.tz) {
        Ok(template) => ResFrame::ok(req_id, serde_json::json!({ "template": template })),
        Err(e) => map_scheduler_error(req_id, "templates.set_paused", e),
    }
}

/// Handler for `templates.set_active`.
///
/// Params: `{ "id": string, "active": bool }`
pub fn handle_templates_set_active(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = match required_str(params, "id", req_id) {
        Ok(s) => TemplateId::from(s),
        Err(res) => return res,
    };
    let active = match params.and_then(|p| p.get("active")).and_then(|v| v.as_bool()) {
        Some(b) => b,
        None => return ResFrame::err(req_id, ERR_INVALID_PARAMS, "missing 'active' field"),
    };

    match app.store.set_template_active(&id, active, app.now(), &app.tz) {
        Ok(template) => ResFrame::ok(req_id, serde_json::json!({ "template": template })),
        Err(e) => map_scheduler_error(req_id, "templates.set_active", e),
    }
}

/// Handler for `templates.delete`.
///
/// Params: `{ "id": string }`
pub fn handle_templates_delete(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = match required_str(params, "id", req_id) {
        Ok(s) => TemplateId::from(s),
        Err(res) => return res,
    };

    match app.store.delete_template(&id) {
        Ok(()) => ResFrame::ok(req_id, serde_json::json!({ "ok": true })),
        Err(e) => map_scheduler_error(req_id, "templates.delete", e),
    }
}

// ---------------------------------------------------------------------------
// events.*
// ---------------------------------------------------------------------------

/// Handler for `events.set_reminders`.
///
/// Params: `{ "event_id": string, "event_name": string, "start_date"?: "YYYY-MM-DD",
/// "end_date"?: "YYYY-MM-DD" }`
///
/// Replaces whatever reminders the event had with freshly planned ones.
pub fn handle_events_set_reminders(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let event: EventSchedule = match parse_params(params, req_id) {
        Ok(e) => e,
        Err(res) => return res,
    };

    let planned = match plan_event_reminders(&event, app.reminder_policy, &app.tz) {
        Ok(p) => p,
        Err(e) => return map_scheduler_error(req_id, "events.set_reminders", e.into()),
    };

    match app
        .store
        .replace_event_reminders(&event.event_id, &planned, app.now())
    {
        Ok(reminders) => ResFrame::ok(req_id, serde_json::json!({ "reminders": reminders })),
        Err(e) => map_scheduler_error(req_id, "events.set_reminders", e),
    }
}

/// Handler for `events.list_reminders`.
///
/// Params: `{ "event_id": string }`
pub fn handle_events_list_reminders(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let event_id = match required_str(params, "event_id", req_id) {
        Ok(s) => EventId::from(s),
        Err(res) => return res,
    };

    match app.store.list_event_reminders(&event_id) {
        Ok(reminders) => ResFrame::ok(req_id, serde_json::json!({ "reminders": reminders })),
        Err(e) => map_scheduler_error(req_id, "events.list_reminders", e),
    }
}

/// Handler for `events.delete_reminders`.
///
/// Params: `{ "event_id": string }`
pub fn handle_events_delete_reminders(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let event_id = match required_str(params, "event_id", req_id) {
        Ok(s) => EventId::from(s),
        Err(res) => return res,
    };

    match app.store.delete_event_reminders(&event_id) {
        Ok(removed) => ResFrame::ok(req_id, serde_json::json!({ "removed": removed })),
        Err(e) => map_scheduler_error(req_id, "events.delete_reminders", e),
    }
}

// ---------------------------------------------------------------------------
// notifications.*
// ---------------------------------------------------------------------------

/// Handler for `notifications.list`.
///
/// Params: `{ "unread_only"?: bool, "limit"?: number }`
pub fn handle_notifications_list(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    const DEFAULT_LIMIT: usize = 50;
    const MAX_LIMIT: usize = 500;

    let unread_only = params
        .and_then(|p| p.get("unread_only"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let limit = params
        .and_then(|p| p.get("limit"))
        .and_then(|v| v.as_u64())
        .map(|n| (n as usize).min(MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT);

    let listed = app
        .store
        .list_notifications(unread_only, limit)
        .and_then(|notifications| Ok((notifications, app.store.unread_count()?)));
    match listed {
        Ok((notifications, unread)) => ResFrame::ok(
            req_id,
            serde_json::json!({ "notifications": notifications, "unread": unread }),
        ),
        Err(e) => map_scheduler_error(req_id, "notifications.list", e),
    }
}

/// Handler for `notifications.create`.
///
/// Params: `{ "title": string, "message": string, "notification_type"?,
/// "priority"?, "category"?, "tags"? }`. Always stored as a manual
/// notification and pushed like scheduled ones.
pub async fn handle_notifications_create(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let mut new: NewNotification = match parse_params(params, req_id) {
        Ok(n) => n,
        Err(res) => return res,
    };
    if new.title.trim().is_empty() {
        return ResFrame::err(req_id, ERR_INVALID_PARAMS, "title cannot be empty");
    }
    new.source_type = SourceType::Manual;
    new.source_id = None;

    match app.store.create_notification(&new, app.now()) {
        Ok(notification) => {
            app.emit(EVENT_NOTIFICATION_CREATED, &notification).await;
            ResFrame::ok(req_id, serde_json::json!({ "notification": notification }))
        }
        Err(e) => map_scheduler_error(req_id, "notifications.create", e),
    }
}

/// Handler for `notifications.mark_read`.
///
/// Params: `{ "id"?: string }`; without an id every notification is marked read.
pub fn handle_notifications_mark_read(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = params
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());

    let result = match id {
        Some(id) => app
            .store
            .mark_notification_read(&NotificationId::from(id))
            .map(|()| 1),
        None => app.store.mark_all_notifications_read(),
    };
    match result {
        Ok(marked) => ResFrame::ok(req_id, serde_json::json!({ "marked": marked })),
        Err(e) => map_scheduler_error(req_id, "notifications.mark_read", e),
    }
}

/// Handler for `notifications.delete`.
///
/// Params: `{ "id": string }`
pub fn handle_notifications_delete(
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &AppState,
) -> ResFrame {
    let id = match required_str(params, "id", req_id) {
        Ok(s) => NotificationId::from(s),
        Err(res) => return res,
    };

    match app.store.delete_notification(&id) {
        Ok(()) => ResFrame::ok(req_id, serde_json::json!({ "ok": true })),
        Err(e) => map_scheduler_error(req_id, "notifications.delete", e),
    }
}
