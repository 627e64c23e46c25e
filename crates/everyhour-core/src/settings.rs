//! Reminder cadence settings and their normalization.
//!
//! Raw settings arrive from clients and from storage as loosely typed JSON.
//! [`normalize`] turns anything into a valid [`Settings`] record: numbers and
//! numeric strings are rounded and clamped, everything else falls back to the
//! defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound for the reminder interval, in minutes.
pub const MAX_INTERVAL: u32 = 720;

/// Interval used when the raw value is missing or not a finite number.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Minute offset used when the raw value is missing or not a finite number.
pub const DEFAULT_MINUTE_OFFSET: u32 = 0;

const MAX_MINUTE_OFFSET: u32 = 59;

/// Canonical reminder cadence.
///
/// Invariant: `1 <= interval_minutes <= MAX_INTERVAL` and
/// `minute_offset <= 59`. Only [`normalize`] and [`Settings::default`]
/// produce values; deserialized records go through [`normalize`] too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub interval_minutes: u32,
    pub minute_offset: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            minute_offset: DEFAULT_MINUTE_OFFSET,
        }
    }
}

impl Settings {
    /// Interval as a chrono duration.
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.interval_minutes))
    }

    /// Settings as the raw JSON object a client would send.
    pub fn to_raw(&self) -> RawSettings {
        RawSettings {
            interval_minutes: Some(Value::from(self.interval_minutes)),
            minute_offset: Some(Value::from(self.minute_offset)),
        }
    }
}

/// Unvalidated settings as received from a client or read from storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute_offset: Option<Value>,
}

impl RawSettings {
    /// Build raw settings from any JSON value. Non-objects yield empty raw
    /// settings, which normalize to the defaults.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                interval_minutes: map.get("intervalMinutes").cloned(),
                minute_offset: map.get("minuteOffset").cloned(),
            },
            _ => Self::default(),
        }
    }
}

impl From<Settings> for RawSettings {
    fn from(settings: Settings) -> Self {
        settings.to_raw()
    }
}

/// Normalize raw settings into a valid [`Settings`]. Never fails.
pub fn normalize(raw: &RawSettings) -> Settings {
    Settings {
        interval_minutes: clamp_field(
            raw.interval_minutes.as_ref(),
            DEFAULT_INTERVAL_MINUTES,
            1,
            MAX_INTERVAL,
        ),
        minute_offset: clamp_field(
            raw.minute_offset.as_ref(),
            DEFAULT_MINUTE_OFFSET,
            0,
            MAX_MINUTE_OFFSET,
        ),
    }
}

fn clamp_field(value: Option<&Value>, default: u32, min: u32, max: u32) -> u32 {
    match value.and_then(parse_number) {
        // Clamp in f64 space so huge inputs never overflow the cast.
        Some(n) => n.round().clamp(f64::from(min), f64::from(max)) as u32,
        None => default,
    }
}

/// Interpret a JSON value as a finite number.
fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}
