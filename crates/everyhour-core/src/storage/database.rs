//! SQLite-backed host storage.
//!
//! One database file serves two host services:
//! - a key-value table implementing [`KeyValueStore`]
//! - an alarm table implementing [`TimerService`]
//!
//! Alarms are persisted rather than held in memory, so one-shot CLI
//! invocations can re-arm the timer that a running daemon polls.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::data_dir;
use crate::error::{CoreError, StorageError, TimerError};
use crate::host::{KeyValueStore, Record, TimerHandle, TimerService, TimerSpec};
use crate::scheduler::ScheduledTimer;

/// SQLite database for check-in state and alarms.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data dir>/everyhour.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("everyhour.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn().execute_batch(
            "PRAGMA busy_timeout = 5000;

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                name           TEXT PRIMARY KEY,
                period_minutes INTEGER NOT NULL,
                next_fire_at   TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a raw value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
    }

    /// Set a raw value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read one alarm row.
    pub fn alarm(&self, name: &str) -> Result<Option<ScheduledTimer>, TimerError> {
        let row = self
            .conn()
            .query_row(
                "SELECT period_minutes, next_fire_at FROM alarms WHERE name = ?1",
                params![name],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((period, next)) => {
                let next_fire_at = parse_instant(name, &next)?;
                Ok(Some(ScheduledTimer::new(period, next_fire_at)))
            }
            None => Ok(None),
        }
    }

    /// Advance every alarm due at `now` past `now` and return their names.
    ///
    /// Missed periods collapse into a single fire, like a host alarm that
    /// wakes late.
    pub fn take_due_alarms(&self, now: DateTime<Utc>) -> Result<Vec<String>, TimerError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let due: Vec<(String, u32, String)> = {
            let mut stmt = tx.prepare(
                "SELECT name, period_minutes, next_fire_at FROM alarms WHERE next_fire_at <= ?1",
            )?;
            let rows = stmt.query_map(params![format_instant(now)], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            rows.collect::<Result<_, _>>()?
        };

        let mut fired = Vec::with_capacity(due.len());
        for (name, period, next) in due {
            let mut timer = ScheduledTimer::new(period, parse_instant(&name, &next)?);
            timer.advance_past(now);
            tx.execute(
                "UPDATE alarms SET next_fire_at = ?2 WHERE name = ?1",
                params![name, format_instant(timer.next_fire_at)],
            )?;
            fired.push(name);
        }
        tx.commit()?;
        Ok(fired)
    }
}

// Fixed-width RFC 3339 so text comparison in SQL matches time order.
fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_instant(name: &str, raw: &str) -> Result<DateTime<Utc>, TimerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| TimerError::Invalid {
            name: name.to_string(),
            message: format!("bad next_fire_at '{raw}': {e}"),
        })
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, keys: &[&str]) -> Result<Record, StorageError> {
        let mut record = Record::new();
        for key in keys {
            if let Some(raw) = self.kv_get(key)? {
                let value: Value = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
                record.insert(key.to_string(), value);
            }
        }
        Ok(record)
    }

    async fn set(&self, record: Record) -> Result<(), StorageError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for (key, value) in &record {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl TimerService for Database {
    async fn get(&self, name: &str) -> Result<Option<TimerHandle>, TimerError> {
        Ok(self.alarm(name)?.map(|timer| TimerHandle {
            name: name.to_string(),
            timer,
        }))
    }

    async fn create(&self, name: &str, spec: TimerSpec) -> Result<(), TimerError> {
        if spec.period_minutes == 0 {
            return Err(TimerError::Invalid {
                name: name.to_string(),
                message: "period must be at least one minute".to_string(),
            });
        }
        let timer = spec.resolve(Utc::now());
        self.conn().execute(
            "INSERT OR REPLACE INTO alarms (name, period_minutes, next_fire_at) VALUES (?1, ?2, ?3)",
            params![name, timer.period_minutes, format_instant(timer.next_fire_at)],
        )?;
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool, TimerError> {
        let removed = self
            .conn()
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[tokio::test]
    async fn record_roundtrip_skips_missing_keys() {
        let db = Database::open_memory().unwrap();
        let mut record = Record::new();
        record.insert("a".into(), json!([1, 2]));
        record.insert("b".into(), json!("x"));
        KeyValueStore::set(&db, record).await.unwrap();

        let got = KeyValueStore::get(&db, &["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!([1, 2]));
    }

    #[tokio::test]
    async fn corrupt_values_are_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set("a", "{not json").unwrap();
        let err = KeyValueStore::get(&db, &["a"]).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn alarms_create_get_clear() {
        let db = Database::open_memory().unwrap();
        TimerService::create(&db, "x", TimerSpec::at(30, at(10, 15))).await.unwrap();

        let handle = TimerService::get(&db, "x").await.unwrap().unwrap();
        assert_eq!(handle.timer, ScheduledTimer::new(30, at(10, 15)));

        assert!(TimerService::clear(&db, "x").await.unwrap());
        assert!(!TimerService::clear(&db, "x").await.unwrap());
        assert!(TimerService::get(&db, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_period_is_rejected() {
        let db = Database::open_memory().unwrap();
        let err = TimerService::create(&db, "x", TimerSpec::at(0, at(10, 0))).await.unwrap_err();
        assert!(matches!(err, TimerError::Invalid { .. }));
    }

    #[tokio::test]
    async fn due_alarms_fire_once_and_advance() {
        let db = Database::open_memory().unwrap();
        TimerService::create(&db, "due", TimerSpec::at(60, at(9, 15))).await.unwrap();
        TimerService::create(&db, "later", TimerSpec::at(60, at(11, 15))).await.unwrap();

        let fired = db.take_due_alarms(at(10, 20)).unwrap();
        assert_eq!(fired, vec!["due".to_string()]);
        assert_eq!(db.alarm("due").unwrap().unwrap().next_fire_at, at(11, 15));

        assert!(db.take_due_alarms(at(10, 20) + Duration::seconds(30)).unwrap().is_empty());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("everyhour.db");
        Database::open_at(&path).unwrap();
        assert!(path.exists());
    }
}
