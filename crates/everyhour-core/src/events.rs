use serde::{Deserialize, Serialize};

/// Lifecycle events delivered by the host.
/// Each is handled to completion before the next one is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// First run after installation.
    Installed,
    /// Host process (re)started with existing state.
    Startup,
    /// A host timer fired.
    TimerFired { name: String },
}

impl Event {
    pub fn timer_fired(name: impl Into<String>) -> Self {
        Event::TimerFired { name: name.into() }
    }
}
