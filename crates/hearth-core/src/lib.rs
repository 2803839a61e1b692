//! `hearth-core`: configuration, errors and identifiers shared by every
//! Hearth crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::HearthConfig;
pub use error::{HearthError, Result};
pub use types::{EventId, NotificationId, ReminderId, TemplateId};
