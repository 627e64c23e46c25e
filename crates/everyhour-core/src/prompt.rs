//! Prompt text shown when a reminder fires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::Zone;

/// Message used when no task has been recorded yet.
pub const EMPTY_PROMPT: &str = "What are you working on right now?";

/// Default notification title.
pub const DEFAULT_TITLE: &str = "Hourly check-in";

/// A notification ready for the host to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

/// Message body for the given current task.
pub fn compose(current_task: &str) -> String {
    if current_task.is_empty() {
        EMPTY_PROMPT.to_string()
    } else {
        format!("Current: {current_task} — update if changed.")
    }
}

/// Full notification: `"{title} · HH:MM"` plus [`compose`]d message.
pub fn compose_prompt(title: &str, current_task: &str, now: DateTime<Utc>, zone: Zone) -> Prompt {
    Prompt {
        title: format!("{title} · {}", zone.format_hm(now)),
        message: compose(current_task),
    }
}
