use std::sync::Arc;

use hearth_protocol::frames::ResFrame;
use hearth_protocol::methods::*;

use crate::app::AppState;
use crate::control::handlers;

/// Route a control method call to its handler. All handlers live in
/// `control/handlers.rs`.
pub async fn route(
    method: &str,
    params: Option<&serde_json::Value>,
    req_id: &str,
    app: &Arc<AppState>,
) -> ResFrame {
    match method {
        // ------------------------------------------------------------------
        // Utility
        // ------------------------------------------------------------------
        PING => ResFrame::ok(req_id, serde_json::json!({ "pong": true })),

        // ------------------------------------------------------------------
        // Scheduler
        // ------------------------------------------------------------------
        SCHEDULER_START => handlers::handle_scheduler_start(params, req_id, app).await,

        SCHEDULER_STOP => handlers::handle_scheduler_stop(req_id, app),

        SCHEDULER_STATUS => ResFrame::ok(req_id, app.scheduler.status()),

        SCHEDULER_FORCE_PROCESS => handlers::handle_scheduler_force_process(req_id, app).await,

        // ------------------------------------------------------------------
        // Recurring templates
        // ------------------------------------------------------------------
        TEMPLATES_LIST => handlers::handle_templates_list(req_id, app),

        TEMPLATES_CREATE => handlers::handle_templates_create(params, req_id, app),

        TEMPLATES_UPDATE => handlers::handle_templates_update(params, req_id, app),

        TEMPLATES_SET_PAUSED => handlers::handle_templates_set_paused(params, req_id, app),

        TEMPLATES_SET_ACTIVE => handlers::handle_templates_set_active(params, req_id, app),

        TEMPLATES_DELETE => handlers::handle_templates_delete(params, req_id, app),

        // ------------------------------------------------------------------
        // Event reminders
        // ------------------------------------------------------------------
        EVENTS_SET_REMINDERS => handlers::handle_events_set_reminders(params, req_id, app),

        EVENTS_LIST_REMINDERS => handlers::handle_events_list_reminders(params, req_id, app),

        EVENTS_DELETE_REMINDERS => handlers::handle_events_delete_reminders(params, req_id, app),

        // ------------------------------------------------------------------
        // Notifications
        // ------------------------------------------------------------------
        NOTIFICATIONS_LIST => handlers::handle_notifications_list(params, req_id, app),

        NOTIFICATIONS_CREATE => handlers::handle_notifications_create(params, req_id, app).await,

        NOTIFICATIONS_MARK_READ => handlers::handle_notifications_mark_read(params, req_id, app),

        NOTIFICATIONS_DELETE => handlers::handle_notifications_delete(params, req_id, app),

        // ------------------------------------------------------------------
        // Fallthrough
        // ------------------------------------------------------------------
        _ => ResFrame::err(
            req_id,
            ERR_METHOD_NOT_FOUND,
            &format!("method '{}' not found", method),
        ),
    }
}
