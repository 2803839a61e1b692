//! Control channel: JSON request frames in, response/event frames out, one per
//! line.

pub mod dispatch;
pub mod handlers;
pub mod message;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::AppState;

/// Serve requests from `reader` until EOF.
///
/// Requests are handled one at a time, in order; each produces exactly one
/// response line on `app.out`.
pub async fn serve<R>(reader: R, app: Arc<AppState>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(res) = message::handle(trimmed, &app).await {
            app.send(&res).await;
        }
    }
    debug!("control input closed");
    Ok(())
}

/// Drain `rx` to `writer`, one line per message, flushing after each.
pub async fn write_lines<W>(mut rx: mpsc::Receiver<String>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!(error = %e, "control output failed, stopping writer");
            break;
        }
    }
}
