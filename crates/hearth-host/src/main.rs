use std::sync::Arc;

use clap::Parser;
use hearth_protocol::methods::EVENT_NOTIFICATION_CREATED;
use hearth_scheduler::{Notification, SchedulerEngine, SchedulerHandle, SqliteStore, SystemClock};
use tokio::io::BufReader;
use tracing::{info, warn};

mod app;
mod control;

/// Notification scheduler host: ticks the scheduler and serves the control
/// channel as JSON lines on stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "hearth-host", version)]
struct Cli {
    /// Config file (default: ~/.hearth/hearth.toml)
    #[arg(long, env = "HEARTH_CONFIG")]
    config: Option<String>,

    /// Run a single tick, print its report and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the control channel, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_host=info,hearth_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = hearth_core::HearthConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        hearth_core::HearthConfig::default()
    });
    let tz = config.scheduler.tz()?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=3000;",
    )?;
    let store = Arc::new(SqliteStore::new(db)?);

    // Fired-notification channel: SchedulerEngine → delivery task
    let (fired_tx, mut fired_rx) =
        tokio::sync::mpsc::channel::<Notification>(config.scheduler.delivery_buffer.max(1));
    let engine = SchedulerEngine::new(store.clone(), Arc::new(SystemClock), tz).with_delivery(fired_tx);
    let scheduler = SchedulerHandle::new(engine);

    if cli.once {
        let report = scheduler.force_tick().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // Outbound lines: responses and events share one writer so lines never interleave.
    let (out_tx, out_rx) = tokio::sync::mpsc::channel::<String>(256);
    let writer = tokio::spawn(control::write_lines(out_rx, tokio::io::stdout()));

    let interval_minutes = config.scheduler.interval_minutes;
    let autostart = config.scheduler.autostart;
    let state = Arc::new(app::AppState::new(
        config,
        tz,
        store,
        scheduler.clone(),
        out_tx,
    ));

    // The delivery task only holds a weak reference so that dropping the
    // state at shutdown closes the output channel.
    let state_for_delivery = Arc::downgrade(&state);
    tokio::spawn(async move {
        while let Some(notification) = fired_rx.recv().await {
            let Some(state) = state_for_delivery.upgrade() else {
                break;
            };
            state.emit(EVENT_NOTIFICATION_CREATED, &notification).await;
        }
    });

    if autostart {
        match scheduler.start(interval_minutes).await {
            Ok(Some(report)) => info!(
                created = report.notifications_created(),
                failures = report.failures(),
                interval_minutes,
                "scheduler started"
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "scheduler autostart failed"),
        }
    } else {
        info!("scheduler autostart disabled, waiting for scheduler.start");
    }

    info!("hearth host ready on stdin/stdout");
    let interrupted = tokio::select! {
        res = control::serve(BufReader::new(tokio::io::stdin()), Arc::clone(&state)) => {
            if let Err(e) = res {
                warn!(error = %e, "control channel failed");
            }
            false
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            true
        }
    };

    scheduler.stop();
    // Last strong reference: dropping it closes the output channel and lets
    // the writer flush what is queued.
    drop(state);
    let _ = writer.await;

    if interrupted {
        // A pending stdin read sits on a blocking thread the runtime would wait for.
        std::process::exit(0);
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
