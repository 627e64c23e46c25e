//! In-memory host services for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::coordinator::CoordinatorService;
use crate::error::{StorageError, TimerError};
use crate::host::{KeyValueStore, NotificationService, Record, TimerHandle, TimerService, TimerSpec};
use crate::prompt::Prompt;
use crate::scheduler::{AlarmScheduler, ScheduledTimer, Zone, REARM_TOLERANCE_SECS};

/// 2026-03-02 at the given UTC time.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Record>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn snapshot(&self) -> Record {
        self.data.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Record, StorageError> {
        let data = self.data.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| data.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, record: Record) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".into()));
        }
        self.data.lock().unwrap().extend(record);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTimers {
    timers: Mutex<HashMap<String, ScheduledTimer>>,
    creates: AtomicUsize,
    clears: AtomicUsize,
    failing: AtomicBool,
    failing_creates: AtomicUsize,
}

impl FakeTimers {
    pub fn insert(&self, name: &str, timer: ScheduledTimer) {
        self.timers.lock().unwrap().insert(name.to_string(), timer);
    }

    pub fn timer(&self, name: &str) -> Option<ScheduledTimer> {
        self.timers.lock().unwrap().get(name).copied()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only the next `n` creates; gets and clears keep working.
    pub fn fail_next_creates(&self, n: usize) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TimerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TimerError::Unavailable("alarm backend offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TimerService for FakeTimers {
    async fn get(&self, name: &str) -> Result<Option<TimerHandle>, TimerError> {
        self.check()?;
        Ok(self.timer(name).map(|timer| TimerHandle {
            name: name.to_string(),
            timer,
        }))
    }

    async fn create(&self, name: &str, spec: TimerSpec) -> Result<(), TimerError> {
        self.check()?;
        let pending = self.failing_creates.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_creates.store(pending - 1, Ordering::SeqCst);
            return Err(TimerError::Unavailable("alarm quota exceeded".into()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.insert(name, spec.resolve(Utc::now()));
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool, TimerError> {
        self.check()?;
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(self.timers.lock().unwrap().remove(name).is_some())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Prompt>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Prompt> {
        self.shown.lock().unwrap().clone()
    }
}

impl NotificationService for RecordingNotifier {
    fn show(&self, prompt: &Prompt) {
        self.shown.lock().unwrap().push(prompt.clone());
    }
}

/// A coordinator wired to fakes, aligned on UTC.
pub struct Harness {
    pub service: CoordinatorService,
    pub store: Arc<MemoryStore>,
    pub timers: Arc<FakeTimers>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let timers = Arc::new(FakeTimers::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let utc = Zone::from_offset_minutes(0).unwrap();
        let service = CoordinatorService::new(timers.clone(), store.clone(), notifier.clone())
            .with_scheduler(AlarmScheduler::new(utc, Duration::seconds(REARM_TOLERANCE_SECS)));
        Self {
            service,
            store,
            timers,
            notifier,
        }
    }
}
