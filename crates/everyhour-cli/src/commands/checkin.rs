use everyhour_core::{Config, Request};

use super::{finish, init_logging, one_shot, open_coordinator, runtime, CmdResult};

pub fn submit(task: &str, unchanged: bool) -> CmdResult {
    let task = task.trim();
    if !unchanged && task.is_empty() {
        return Err("Type a task or use `same`.".into());
    }
    one_shot(Request::submit(task, unchanged))
}

pub fn state() -> CmdResult {
    one_shot(Request::GetState)
}

pub fn clear() -> CmdResult {
    one_shot(Request::ClearHistory)
}

/// Send a request exactly as given, unknown kinds included.
pub fn raw(json: &str) -> CmdResult {
    let value: serde_json::Value = serde_json::from_str(json)?;
    init_logging("warn");
    let config = Config::load()?;
    let (mut coordinator, _db) = open_coordinator(&config)?;
    let response = runtime()?.block_on(coordinator.handle_request(value));
    finish(&response)
}
