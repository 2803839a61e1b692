//! Wire types for the hearth host control channel.
//!
//! One JSON frame per line: clients send `req` frames, the host answers each
//! with a `res` frame carrying the same `id`, and pushes `event` frames
//! (e.g. `notification.created`) whenever it has something to report.

pub mod frames;
pub mod methods;
