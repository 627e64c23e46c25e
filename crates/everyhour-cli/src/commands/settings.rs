use clap::Subcommand;
use everyhour_core::{Config, RawSettings, Request, Response};
use serde_json::Value;

use super::{finish, init_logging, one_shot, open_coordinator, runtime, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the effective reminder cadence
    Get,
    /// Change the reminder cadence (values are clamped)
    Set {
        /// Minutes between reminders (1-720)
        #[arg(long)]
        interval: Option<String>,
        /// Minute of the hour reminders align to (0-59)
        #[arg(long)]
        offset: Option<String>,
    },
}

pub fn run(action: SettingsAction) -> CmdResult {
    match action {
        SettingsAction::Get => one_shot(Request::GetSettings),
        SettingsAction::Set { interval, offset } => {
            if interval.is_none() && offset.is_none() {
                return Err("nothing to change: pass --interval and/or --offset".into());
            }
            init_logging("warn");
            let config = Config::load()?;
            let (mut coordinator, _db) = open_coordinator(&config)?;
            let rt = runtime()?;

            let current = match rt.block_on(coordinator.dispatch(Request::GetSettings)) {
                Response::Settings { settings, .. } => settings,
                other => return finish(&other),
            };
            let mut raw = RawSettings::from(current);
            if let Some(interval) = interval {
                raw.interval_minutes = Some(Value::String(interval));
            }
            if let Some(offset) = offset {
                raw.minute_offset = Some(Value::String(offset));
            }

            let request = Request::SaveSettings { settings: raw };
            let response = rt.block_on(coordinator.dispatch(request));
            finish(&response)
        }
    }
}
