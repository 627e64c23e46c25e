pub mod checkin;
pub mod config;
pub mod daemon;
pub mod history;
pub mod settings;

use std::error::Error;
use std::sync::Arc;

use clap::CommandFactory;
use everyhour_core::{Config, CoordinatorService, Database, Request, Response};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::notify::ConsoleNotifier;

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Install the tracing subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore a second init; only the first subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Single-threaded runtime: events and requests are handled one at a time.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

/// Open the on-disk store and wire a coordinator to it.
pub fn open_coordinator(
    config: &Config,
) -> Result<(CoordinatorService, Arc<Database>), Box<dyn Error>> {
    let db = Arc::new(Database::open()?);
    let coordinator = CoordinatorService::new(db.clone(), db.clone(), Arc::new(ConsoleNotifier))
        .with_scheduler(config.scheduler())
        .with_options(config.coordinator_options());
    Ok((coordinator, db))
}

/// Run one request against the store, print the response and fail on
/// `ok: false`.
pub fn one_shot(request: Request) -> CmdResult {
    init_logging("warn");
    let config = Config::load()?;
    let (mut coordinator, _db) = open_coordinator(&config)?;
    let response = runtime()?.block_on(coordinator.dispatch(request));
    finish(&response)
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a response and turn `ok: false` into an error exit.
pub fn finish(response: &Response) -> CmdResult {
    print_json(response)?;
    match response {
        Response::Failure { error, .. } => Err(error.clone().into()),
        _ => Ok(()),
    }
}

pub fn completions(shell: clap_complete::Shell) -> CmdResult {
    let mut cmd = crate::Cli::command();
    clap_complete::generate(shell, &mut cmd, "everyhour", &mut std::io::stdout());
    Ok(())
}
