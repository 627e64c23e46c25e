//! Storage keys and the record shapes written under them.
//!
//! Settings, history and the current task each live under their own key.
//! Values are plain JSON so a store written by an older host stays readable.

use serde_json::Value;

use crate::checkin::{CheckinEntry, CheckinLedger};
use crate::error::{Result, StorageError};
use crate::host::{KeyValueStore, Record};
use crate::settings::{normalize, RawSettings, Settings};

pub const SETTINGS_KEY: &str = "reminderSettings";
pub const HISTORY_KEY: &str = "checkinHistory";
pub const CURRENT_TASK_KEY: &str = "currentTask";

/// Stored settings, normalized. `None` when never written.
pub async fn read_settings(store: &dyn KeyValueStore) -> Result<Option<Settings>> {
    let record = store.get(&[SETTINGS_KEY]).await?;
    Ok(match record.get(SETTINGS_KEY) {
        None | Some(Value::Null) => None,
        Some(value) => Some(normalize(&RawSettings::from_value(value))),
    })
}

pub fn settings_record(settings: &Settings) -> Result<Record> {
    let mut record = Record::new();
    record.insert(SETTINGS_KEY.to_string(), serde_json::to_value(settings)?);
    Ok(record)
}

/// Load the ledger. Missing keys read as empty.
///
/// # Errors
/// Fails when the store fails or the stored history is not a list of entries.
pub async fn read_ledger(store: &dyn KeyValueStore) -> Result<CheckinLedger> {
    let record = store.get(&[CURRENT_TASK_KEY, HISTORY_KEY]).await?;

    let current_task = record
        .get(CURRENT_TASK_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let history: Vec<CheckinEntry> = match record.get(HISTORY_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| StorageError::Corrupt {
            key: HISTORY_KEY.to_string(),
            message: e.to_string(),
        })?,
    };

    Ok(CheckinLedger::from_parts(current_task, history))
}

/// Record holding the whole ledger: history and current task together.
pub fn ledger_record(ledger: &CheckinLedger) -> Result<Record> {
    let mut record = history_record(ledger)?;
    record.insert(
        CURRENT_TASK_KEY.to_string(),
        Value::String(ledger.current_task().to_string()),
    );
    Ok(record)
}

/// Record holding only the history.
pub fn history_record(ledger: &CheckinLedger) -> Result<Record> {
    let mut record = Record::new();
    record.insert(HISTORY_KEY.to_string(), serde_json::to_value(ledger.history())?);
    Ok(record)
}
