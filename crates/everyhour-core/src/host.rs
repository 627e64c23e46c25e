//! Services the coordinator consumes from its host.
//!
//! The host owns the real timer, storage and notification primitives. The
//! coordinator only sees these traits, so tests and alternative hosts can
//! inject their own implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StorageError, TimerError};
use crate::prompt::Prompt;
use crate::scheduler::ScheduledTimer;

/// A set of keyed JSON values read from or written to storage.
pub type Record = Map<String, Value>;

/// When a newly created timer fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerStart {
    /// At an absolute instant.
    At(DateTime<Utc>),
    /// After a delay, in minutes.
    DelayMinutes(u32),
}

/// Parameters for [`TimerService::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSpec {
    pub period_minutes: u32,
    pub start: TimerStart,
}

impl TimerSpec {
    pub fn at(period_minutes: u32, next_fire_at: DateTime<Utc>) -> Self {
        Self {
            period_minutes,
            start: TimerStart::At(next_fire_at),
        }
    }

    /// Resolve the first fire time against `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> ScheduledTimer {
        let next_fire_at = match self.start {
            TimerStart::At(at) => at,
            TimerStart::DelayMinutes(delay) => now + Duration::minutes(i64::from(delay)),
        };
        ScheduledTimer::new(self.period_minutes, next_fire_at)
    }
}

impl From<ScheduledTimer> for TimerSpec {
    fn from(timer: ScheduledTimer) -> Self {
        Self::at(timer.period_minutes, timer.next_fire_at)
    }
}

/// A named timer as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerHandle {
    pub name: String,
    #[serde(flatten)]
    pub timer: ScheduledTimer,
}

/// Named periodic timers. Firing is reported to the coordinator as
/// [`crate::events::Event::TimerFired`].
#[async_trait]
pub trait TimerService: Send + Sync {
    /// Look up a timer by name.
    async fn get(&self, name: &str) -> Result<Option<TimerHandle>, TimerError>;

    /// Create (or replace) a timer.
    async fn create(&self, name: &str, spec: TimerSpec) -> Result<(), TimerError>;

    /// Remove a timer. Returns whether one existed.
    async fn clear(&self, name: &str) -> Result<bool, TimerError>;
}

/// Persistent key-value storage. `set` writes the whole record atomically.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Absent keys are missing from the record.
    async fn get(&self, keys: &[&str]) -> Result<Record, StorageError>;

    /// Write every key of `record` in one atomic step.
    async fn set(&self, record: Record) -> Result<(), StorageError>;
}

/// Fire-and-forget user notifications.
pub trait NotificationService: Send + Sync {
    fn show(&self, prompt: &Prompt);
}
