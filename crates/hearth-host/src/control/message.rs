use std::sync::Arc;

use hearth_protocol::frames::{Inbound, ResFrame};
use hearth_protocol::methods::ERR_INVALID_FRAME;
use tracing::warn;

use crate::app::AppState;
use crate::control::dispatch;

/// Process one inbound line. Returns the response to send, if any.
///
/// Lines that are not JSON, or frames that are not requests, are logged and
/// dropped; a `req` frame missing its method is answered with
/// `INVALID_FRAME` when it at least carries an `id`.
pub async fn handle(line: &str, app: &Arc<AppState>) -> Option<ResFrame> {
    match Inbound::parse(line) {
        Ok(Inbound::Request(req)) => {
            Some(dispatch::route(&req.method, req.params.as_ref(), &req.id, app).await)
        }
        Ok(Inbound::Malformed { id }) => {
            warn!("request frame without method or id");
            id.map(|id| ResFrame::err(id, ERR_INVALID_FRAME, "request needs 'id' and 'method'"))
        }
        Ok(Inbound::Ignored { kind }) => {
            warn!(frame_type = %kind, "ignoring non-request frame");
            None
        }
        Err(e) => {
            warn!(error = %e, "malformed frame");
            None
        }
    }
}
