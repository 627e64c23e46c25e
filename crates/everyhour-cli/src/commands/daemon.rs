//! Long-running host: fires due alarms and answers line-delimited JSON
//! requests on stdin, one response per line on stdout.

use std::time::Duration;

use chrono::Utc;
use everyhour_core::{Config, CoordinatorService, Database, Event, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::{init_logging, open_coordinator, runtime, CmdResult};

pub fn run(exit_on_eof: bool) -> CmdResult {
    init_logging("info");
    let config = Config::load()?;
    let (mut coordinator, db) = open_coordinator(&config)?;
    let poll = Duration::from_secs(config.daemon.poll_secs.max(1));

    runtime()?.block_on(async move {
        start(&mut coordinator).await;

        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut stdin_open = true;

        info!(poll_secs = poll.as_secs(), "daemon running");
        loop {
            tokio::select! {
                _ = ticker.tick() => fire_due(&mut coordinator, &db).await,
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => {
                        if let Some(response) = answer(&mut coordinator, &line).await {
                            let mut out = serde_json::to_string(&response)?;
                            out.push('\n');
                            stdout.write_all(out.as_bytes()).await?;
                            stdout.flush().await?;
                        }
                    }
                    Ok(None) => {
                        if exit_on_eof {
                            info!("stdin closed, exiting");
                            break;
                        }
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        stdin_open = false;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, exiting");
                    break;
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// First run when no settings were ever stored, otherwise a restart.
async fn start(coordinator: &mut CoordinatorService) {
    let event = match coordinator.has_settings().await {
        Ok(true) => Event::Startup,
        Ok(false) => Event::Installed,
        Err(e) => {
            error!(error = %e, "could not read settings");
            Event::Startup
        }
    };
    if let Err(e) = coordinator.handle_event(&event).await {
        error!(?event, error = %e, "startup failed");
    }
}

async fn fire_due(coordinator: &mut CoordinatorService, db: &Database) {
    let due = match db.take_due_alarms(Utc::now()) {
        Ok(due) => due,
        Err(e) => {
            error!(error = %e, "alarm poll failed");
            return;
        }
    };
    for name in due {
        let event = Event::timer_fired(name);
        if let Err(e) = coordinator.handle_event(&event).await {
            error!(?event, error = %e, "alarm handling failed");
        }
    }
}

/// Blank lines are skipped.
async fn answer(coordinator: &mut CoordinatorService, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let response = match serde_json::from_str(line) {
        Ok(value) => coordinator.handle_request(value).await,
        Err(e) => Response::failure(format!("invalid JSON: {e}")),
    };
    Some(response)
}
