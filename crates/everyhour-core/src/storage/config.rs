//! TOML-based host configuration.
//!
//! Stores tuning knobs that are not part of the reminder cadence itself:
//! - Re-arm tolerance and the clock used for alignment
//! - Notification toggle and title
//! - Daemon polling interval
//!
//! The cadence (interval and minute offset) lives in the key-value store and
//! is changed through the `save-settings` request, not here.
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::coordinator::CoordinatorOptions;
use crate::error::ConfigError;
use crate::prompt::DEFAULT_TITLE;
use crate::scheduler::{AlarmScheduler, Zone, REARM_TOLERANCE_SECS};

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tolerance")]
    pub rearm_tolerance_secs: i64,
    /// Fixed clock for minute alignment, in minutes east of UTC.
    /// Host local time when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// How often the alarm table is checked for due alarms.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

/// Host configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

fn default_tolerance() -> i64 {
    REARM_TOLERANCE_SECS
}
fn default_true() -> bool {
    true
}
fn default_title() -> String {
    DEFAULT_TITLE.into()
}
fn default_poll_secs() -> u64 {
    15
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rearm_tolerance_secs: default_tolerance(),
            utc_offset_minutes: None,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let clears = value.is_empty() || value.eq_ignore_ascii_case("none");
                if clears && (existing.is_null() || NULLABLE_KEYS.contains(&key)) {
                    obj.insert(part.to_string(), serde_json::Value::Null);
                    return Ok(());
                }

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value).ok_or_else(|| {
                        invalid(format!("cannot parse '{value}' as number"))
                    })?,
                    // Unset optional: numbers stay numbers.
                    serde_json::Value::Null => parse_number(value)
                        .unwrap_or_else(|| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the value does not fit the key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.rearm_tolerance_secs < 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.rearm_tolerance_secs".into(),
                message: "must not be negative".into(),
            });
        }
        if let Some(minutes) = self.scheduler.utc_offset_minutes {
            if Zone::from_offset_minutes(minutes).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "scheduler.utc_offset_minutes".into(),
                    message: format!("{minutes} is not a valid UTC offset"),
                });
            }
        }
        if self.daemon.poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "daemon.poll_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Clock used for alignment. Invalid offsets fall back to local time.
    pub fn zone(&self) -> Zone {
        self.scheduler
            .utc_offset_minutes
            .and_then(Zone::from_offset_minutes)
            .unwrap_or_default()
    }

    pub fn scheduler(&self) -> AlarmScheduler {
        AlarmScheduler::new(
            self.zone(),
            Duration::seconds(self.scheduler.rearm_tolerance_secs.max(0)),
        )
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            title: self.notifications.title.clone(),
            notifications_enabled: self.notifications.enabled,
        }
    }
}

/// Keys backed by `Option` fields; "none" or "" clears them.
const NULLABLE_KEYS: &[&str] = &["scheduler.utc_offset_minutes"];

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}
