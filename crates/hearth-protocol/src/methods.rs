// Control method names understood by hearth-host.

// utility
pub const PING: &str = "ping";

// scheduler
pub const SCHEDULER_START: &str = "scheduler.start";
pub const SCHEDULER_STOP: &str = "scheduler.stop";
pub const SCHEDULER_STATUS: &str = "scheduler.status";
pub const SCHEDULER_FORCE_PROCESS: &str = "scheduler.force_process";

// recurring templates
pub const TEMPLATES_LIST: &str = "templates.list";
pub const TEMPLATES_CREATE: &str = "templates.create";
pub const TEMPLATES_UPDATE: &str = "templates.update";
pub const TEMPLATES_SET_PAUSED: &str = "templates.set_paused";
pub const TEMPLATES_SET_ACTIVE: &str = "templates.set_active";
pub const TEMPLATES_DELETE: &str = "templates.delete";

// event reminders
pub const EVENTS_SET_REMINDERS: &str = "events.set_reminders";
pub const EVENTS_LIST_REMINDERS: &str = "events.list_reminders";
pub const EVENTS_DELETE_REMINDERS: &str = "events.delete_reminders";

// notifications
pub const NOTIFICATIONS_LIST: &str = "notifications.list";
pub const NOTIFICATIONS_CREATE: &str = "notifications.create";
pub const NOTIFICATIONS_DELETE: &str = "notifications.delete";
pub const NOTIFICATIONS_MARK_READ: &str = "notifications.mark_read";

// pushed events
pub const EVENT_NOTIFICATION_CREATED: &str = "notification.created";
pub const EVENT_SCHEDULER_TICK: &str = "scheduler.tick";

// error codes
pub const ERR_METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
pub const ERR_INVALID_PARAMS: &str = "INVALID_PARAMS";
pub const ERR_INVALID_FRAME: &str = "INVALID_FRAME";
pub const ERR_INTERNAL: &str = "INTERNAL_ERROR";
