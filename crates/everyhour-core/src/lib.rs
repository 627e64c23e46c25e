//! # everyhour Core Library
//!
//! Core logic for the everyhour reminder: it wakes on a configurable cadence,
//! asks what you are working on, and keeps an append-only log of the answers
//! next to a "current task" cache.
//!
//! The host (the CLI daemon, or anything else) supplies timers, storage and
//! notifications through the traits in [`host`]; this crate decides when to
//! fire and what to record.
//!
//! ## Key Components
//!
//! - [`settings::normalize`]: clamps raw cadence settings
//! - [`AlarmScheduler`]: aligned and relative fire times, re-arm decision
//! - [`CheckinLedger`]: history plus current task
//! - [`prompt::compose`]: prompt text
//! - [`CoordinatorService`]: lifecycle events and the request protocol
//! - [`Database`]: SQLite storage and alarm table for hosts
//! - [`Config`]: host configuration

pub mod checkin;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod host;
pub mod prompt;
pub mod protocol;
pub mod scheduler;
pub mod settings;
pub mod storage;

#[cfg(test)]
mod test_helpers;

pub use checkin::{CheckinEntry, CheckinLedger, DayActivity, LedgerSnapshot};
pub use coordinator::{CoordinatorOptions, CoordinatorService, CoordinatorState, ALARM_NAME};
pub use error::{ConfigError, CoreError, ProtocolError, StorageError, TimerError};
pub use events::Event;
pub use host::{KeyValueStore, NotificationService, TimerService};
pub use prompt::Prompt;
pub use protocol::{Request, Response};
pub use scheduler::{AlarmScheduler, ScheduledTimer, Zone};
pub use settings::{RawSettings, Settings, MAX_INTERVAL};
pub use storage::{Config, Database};
