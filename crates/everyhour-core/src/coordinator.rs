//! Process-wide coordinator.
//!
//! Owns the reminder lifecycle and answers client requests. One instance is
//! constructed at process start with its host services injected, then fed
//! events and requests one at a time.
//!
//! ## State Transitions
//!
//! ```text
//! Uninitialized -> Idle -> Prompting -> Idle
//!                   ^  (timer fired)  (check-in)
//!                   +-- install/startup
//! ```
//!
//! Persisted state (settings, history, current task) lives in the
//! [`KeyValueStore`]. Requests that change state re-arm the alarm first and
//! write one record last; if the write fails the previous alarm is put back,
//! so a failed request leaves both store and alarm as they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::checkin::{CheckinEntry, CheckinLedger};
use crate::error::{Result, TimerError};
use crate::events::Event;
use crate::host::{KeyValueStore, NotificationService, Record, TimerService, TimerSpec};
use crate::prompt::{compose_prompt, Prompt, DEFAULT_TITLE};
use crate::protocol::{Request, Response};
use crate::scheduler::{AlarmScheduler, ScheduledTimer};
use crate::settings::{normalize, RawSettings, Settings};
use crate::storage::records;

/// Name of the single host timer the coordinator manages.
pub const ALARM_NAME: &str = "everyhour-checkin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    Uninitialized,
    /// Timer armed, waiting for it to fire.
    Idle,
    /// A prompt was shown and no check-in has arrived since.
    Prompting,
}

/// Presentation options for prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub title: String,
    pub notifications_enabled: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            notifications_enabled: true,
        }
    }
}

pub struct CoordinatorService {
    timers: Arc<dyn TimerService>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationService>,
    scheduler: AlarmScheduler,
    options: CoordinatorOptions,
    state: CoordinatorState,
}

impl CoordinatorService {
    pub fn new(
        timers: Arc<dyn TimerService>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            timers,
            store,
            notifier,
            scheduler: AlarmScheduler::default(),
            options: CoordinatorOptions::default(),
            state: CoordinatorState::Uninitialized,
        }
    }

    pub fn with_scheduler(mut self, scheduler: AlarmScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Handle a lifecycle event at the current instant.
    pub async fn handle_event(&mut self, event: &Event) -> Result<()> {
        self.handle_event_at(event, Utc::now()).await
    }

    /// Handle a lifecycle event at `now`.
    ///
    /// # Errors
    /// Propagates storage and timer failures; the event may be retried.
    pub async fn handle_event_at(&mut self, event: &Event, now: DateTime<Utc>) -> Result<()> {
        match event {
            Event::Installed | Event::Startup => {
                let settings = self.ensure_settings().await?;
                self.ensure_alarm(&settings, now).await?;
                self.state = CoordinatorState::Idle;
                info!(
                    ?event,
                    interval = settings.interval_minutes,
                    offset = settings.minute_offset,
                    "coordinator ready"
                );

                if matches!(event, Event::Installed) {
                    self.prompt(now).await?;
                }
            }
            Event::TimerFired { name } => {
                if name != ALARM_NAME {
                    debug!(%name, "ignoring foreign timer");
                    return Ok(());
                }
                self.prompt(now).await?;
            }
        }
        Ok(())
    }

    /// Whether settings have ever been stored. Hosts use this to tell a
    /// first install from a restart.
    pub async fn has_settings(&self) -> Result<bool> {
        Ok(records::read_settings(self.store.as_ref()).await?.is_some())
    }

    /// Current ledger, for read-only views such as logs and timelines.
    pub async fn ledger(&self) -> Result<CheckinLedger> {
        records::read_ledger(self.store.as_ref()).await
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Decode and handle a raw JSON request at the current instant.
    pub async fn handle_request(&mut self, raw: Value) -> Response {
        self.handle_request_at(raw, Utc::now()).await
    }

    /// Decode and handle a raw JSON request at `now`. Never fails: errors
    /// become `{ok: false, error}` responses.
    pub async fn handle_request_at(&mut self, raw: Value, now: DateTime<Utc>) -> Response {
        match Request::from_value(raw) {
            Ok(request) => self.dispatch_at(request, now).await,
            Err(e) => {
                warn!(error = %e, "rejected request");
                Response::failure(e.to_string())
            }
        }
    }

    /// Handle a decoded request at the current instant.
    pub async fn dispatch(&mut self, request: Request) -> Response {
        self.dispatch_at(request, Utc::now()).await
    }

    /// Handle a decoded request at `now`.
    pub async fn dispatch_at(&mut self, request: Request, now: DateTime<Utc>) -> Response {
        let kind = request.kind();
        match self.try_dispatch(request, now).await {
            Ok(response) => {
                debug!(kind, "request handled");
                response
            }
            Err(e) => {
                warn!(kind, error = %e, "request failed");
                Response::failure(e.to_string())
            }
        }
    }

    async fn try_dispatch(&mut self, request: Request, now: DateTime<Utc>) -> Result<Response> {
        match request {
            Request::SubmitCheckin { task, unchanged } => {
                self.submit_checkin(&task, unchanged, now).await
            }
            Request::GetState => {
                let ledger = records::read_ledger(self.store.as_ref()).await?;
                let settings = self.current_settings().await?;
                Ok(Response::state(ledger.snapshot(), settings))
            }
            Request::GetSettings => Ok(Response::settings(self.current_settings().await?)),
            Request::SaveSettings { settings } => self.save_settings(&settings, now).await,
            Request::ClearHistory => {
                let mut ledger = records::read_ledger(self.store.as_ref()).await?;
                let cleared = ledger.history().len();
                ledger.clear();
                self.store.set(records::history_record(&ledger)?).await?;
                info!(cleared, "history cleared");
                Ok(Response::ack())
            }
        }
    }

    async fn submit_checkin(
        &mut self,
        task: &str,
        unchanged: bool,
        now: DateTime<Utc>,
    ) -> Result<Response> {
        let mut ledger = records::read_ledger(self.store.as_ref()).await?;
        let entry = CheckinEntry::new(now, task, unchanged);
        let logged_task = entry.task.clone();
        ledger.append(entry);
        let record = records::ledger_record(&ledger)?;

        let settings = self.current_settings().await?;
        let next = self.scheduler.next_relative(&settings, now);
        self.commit(ScheduledTimer::new(settings.interval_minutes, next), record)
            .await?;
        info!(task = %logged_task, unchanged, "check-in recorded");
        self.state = CoordinatorState::Idle;
        Ok(Response::ack())
    }

    async fn save_settings(&mut self, raw: &RawSettings, now: DateTime<Utc>) -> Result<Response> {
        let settings = normalize(raw);
        let record = records::settings_record(&settings)?;

        let next = self.scheduler.next_aligned(&settings, now);
        self.commit(ScheduledTimer::new(settings.interval_minutes, next), record)
            .await?;
        info!(
            interval = settings.interval_minutes,
            offset = settings.minute_offset,
            "settings saved"
        );
        Ok(Response::settings(settings))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Stored settings, or defaults when none were ever written.
    async fn current_settings(&self) -> Result<Settings> {
        Ok(records::read_settings(self.store.as_ref())
            .await?
            .unwrap_or_default())
    }

    /// Stored settings, writing defaults on first run.
    async fn ensure_settings(&self) -> Result<Settings> {
        if let Some(settings) = records::read_settings(self.store.as_ref()).await? {
            return Ok(settings);
        }
        let settings = Settings::default();
        self.store.set(records::settings_record(&settings)?).await?;
        info!("default settings written");
        Ok(settings)
    }

    /// Re-arm only when the existing timer disagrees with `settings`.
    async fn ensure_alarm(&self, settings: &Settings, now: DateTime<Utc>) -> Result<()> {
        let existing = self.current_alarm().await?;
        match self.scheduler.plan_aligned(existing.as_ref(), settings, now) {
            Some(timer) => self.rearm(timer, existing).await,
            None => {
                debug!("existing alarm kept");
                Ok(())
            }
        }
    }

    /// Arm `timer`, then write `record`. A failed write restores the
    /// previous alarm.
    async fn commit(&self, timer: ScheduledTimer, record: Record) -> Result<()> {
        let previous = self.current_alarm().await?;
        self.rearm(timer, previous).await?;
        if let Err(e) = self.store.set(record).await {
            self.restore_alarm(previous).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn current_alarm(&self) -> Result<Option<ScheduledTimer>, TimerError> {
        Ok(self.timers.get(ALARM_NAME).await?.map(|handle| handle.timer))
    }

    /// Cancel then create the managed timer. If the create fails, `previous`
    /// is put back.
    async fn rearm(&self, timer: ScheduledTimer, previous: Option<ScheduledTimer>) -> Result<()> {
        self.timers.clear(ALARM_NAME).await?;
        if let Err(e) = self.timers.create(ALARM_NAME, TimerSpec::from(timer)).await {
            self.restore_alarm(previous).await;
            return Err(e.into());
        }
        info!(next_fire_at = %timer.next_fire_at, period = timer.period_minutes, "alarm armed");
        Ok(())
    }

    /// Best effort: the original failure is what the caller reports.
    async fn restore_alarm(&self, previous: Option<ScheduledTimer>) {
        let restored = async {
            self.timers.clear(ALARM_NAME).await?;
            if let Some(timer) = previous {
                self.timers.create(ALARM_NAME, TimerSpec::from(timer)).await?;
            }
            Ok::<(), TimerError>(())
        };
        match restored.await {
            Ok(()) => debug!(?previous, "previous alarm restored"),
            Err(e) => warn!(error = %e, "could not restore previous alarm"),
        }
    }

    async fn prompt(&mut self, now: DateTime<Utc>) -> Result<Prompt> {
        let ledger = records::read_ledger(self.store.as_ref()).await?;
        let prompt = compose_prompt(
            &self.options.title,
            ledger.current_task(),
            now,
            self.scheduler.zone(),
        );
        if self.options.notifications_enabled {
            self.notifier.show(&prompt);
        }
        info!(title = %prompt.title, message = %prompt.message, "prompt emitted");
        self.state = CoordinatorState::Prompting;
        Ok(prompt)
    }
}
