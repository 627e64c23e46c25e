//! Check-in ledger: the append-only history plus the current-task cache.
//!
//! The ledger itself never touches storage. The coordinator loads it, applies
//! one operation and writes the touched records back in a single call.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::Zone;

/// A single user check-in. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinEntry {
    /// When the check-in was submitted.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Trimmed task text. Empty for a bare "still the same" answer.
    pub task: String,
    /// The user confirmed the previous task is still current.
    pub unchanged: bool,
}

impl CheckinEntry {
    /// Build an entry, trimming the task text.
    pub fn new(timestamp: DateTime<Utc>, task: &str, unchanged: bool) -> Self {
        Self {
            timestamp,
            task: task.trim().to_string(),
            unchanged,
        }
    }

    /// Short label for list views.
    pub fn label(&self) -> &str {
        if self.unchanged {
            "(unchanged)"
        } else if self.task.is_empty() {
            "(blank)"
        } else {
            &self.task
        }
    }
}

/// Read-only view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub current_task: String,
    pub history_count: usize,
    pub last_entry: Option<CheckinEntry>,
}

/// Hours of one calendar day that have at least one check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayActivity {
    pub day: NaiveDate,
    pub hours: BTreeSet<u32>,
}

impl DayActivity {
    pub fn is_active(&self, hour: u32) -> bool {
        self.hours.contains(&hour)
    }
}

/// Current task plus chronological check-in history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckinLedger {
    current_task: String,
    history: Vec<CheckinEntry>,
}

impl CheckinLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from its persisted parts.
    pub fn from_parts(current_task: String, history: Vec<CheckinEntry>) -> Self {
        Self {
            current_task,
            history,
        }
    }

    pub fn current_task(&self) -> &str {
        &self.current_task
    }

    /// Entries in insertion (chronological) order.
    pub fn history(&self) -> &[CheckinEntry] {
        &self.history
    }

    /// Record a check-in. A non-empty task also becomes the current task.
    pub fn append(&mut self, entry: CheckinEntry) {
        if !entry.task.is_empty() {
            self.current_task.clone_from(&entry.task);
        }
        self.history.push(entry);
    }

    /// Drop all history. The current task survives.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            current_task: self.current_task.clone(),
            history_count: self.history.len(),
            last_entry: self.history.last().cloned(),
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &CheckinEntry> {
        self.history.iter().rev().take(limit)
    }

    /// Active hours for the most recent `days` days that have entries,
    /// newest day first.
    pub fn day_activity(&self, zone: Zone, days: usize) -> Vec<DayActivity> {
        let mut by_day: BTreeMap<NaiveDate, BTreeSet<u32>> = BTreeMap::new();
        for entry in &self.history {
            let (day, hour) = zone.date_hour(entry.timestamp);
            by_day.entry(day).or_default().insert(hour);
        }
        by_day
            .into_iter()
            .rev()
            .take(days)
            .map(|(day, hours)| DayActivity { day, hours })
            .collect()
    }

    /// Number of distinct hours on `day` with at least one check-in.
    pub fn hours_on(&self, day: NaiveDate, zone: Zone) -> usize {
        self.history
            .iter()
            .map(|entry| zone.date_hour(entry.timestamp))
            .filter(|(d, _)| *d == day)
            .map(|(_, hour)| hour)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
