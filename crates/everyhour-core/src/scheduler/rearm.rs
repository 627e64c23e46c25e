//! Re-arm decision for the host timer.
//!
//! Recreating a host timer resets any countdown the user can see, so an
//! existing timer is kept unless it disagrees with the current settings.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Allowed drift between a timer's next fire and the computed instant.
/// Host alarms are coarse, so anything under about a minute is noise.
pub const REARM_TOLERANCE_SECS: i64 = 65;

/// A periodic timer as scheduled with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTimer {
    pub period_minutes: u32,
    pub next_fire_at: DateTime<Utc>,
}

impl ScheduledTimer {
    pub fn new(period_minutes: u32, next_fire_at: DateTime<Utc>) -> Self {
        Self {
            period_minutes,
            next_fire_at,
        }
    }

    /// Advance `next_fire_at` by whole periods until it is after `now`.
    /// Returns how many periods elapsed.
    pub fn advance_past(&mut self, now: DateTime<Utc>) -> u32 {
        let period = Duration::minutes(i64::from(self.period_minutes.max(1)));
        let mut steps = 0;
        while self.next_fire_at <= now {
            self.next_fire_at = self.next_fire_at + period;
            steps += 1;
        }
        steps
    }
}

/// True when the timer must be cancelled and recreated.
pub fn needs_rearm(
    existing: Option<&ScheduledTimer>,
    settings: &Settings,
    aligned: DateTime<Utc>,
    tolerance: Duration,
) -> bool {
    let Some(timer) = existing else {
        return true;
    };
    if timer.period_minutes != settings.interval_minutes {
        return true;
    }
    (timer.next_fire_at - aligned).abs() > tolerance
}
