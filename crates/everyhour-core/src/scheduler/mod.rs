//! Alignment-aware recurring scheduler.
//!
//! Two ways to place the next reminder:
//! - **Aligned**: the next wall-clock instant whose minute-of-hour equals the
//!   configured offset, stepping by the interval. Used at startup and when the
//!   cadence changes, so reminders land on the same minute no matter when the
//!   schedule was computed.
//! - **Relative**: `now + interval`. Used right after a check-in so the next
//!   prompt is spaced from the interaction.
//!
//! The re-arm decision lives in [`rearm`].

pub mod rearm;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Timelike, Utc};

use crate::settings::Settings;

pub use rearm::{ScheduledTimer, REARM_TOLERANCE_SECS};

/// Next aligned fire time strictly after `now`, evaluated on `now`'s clock.
pub fn compute_next_aligned<Tz: TimeZone>(settings: &Settings, now: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = Duration::minutes(i64::from(now.minute()))
        + Duration::seconds(i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    let mut next =
        now.clone() - into_hour + Duration::minutes(i64::from(settings.minute_offset));

    if next <= *now {
        next = next + Duration::hours(1);
    }
    while next <= *now {
        next = next + settings.interval();
    }
    next
}

/// `now + interval`.
pub fn compute_relative<Tz: TimeZone>(settings: &Settings, now: &DateTime<Tz>) -> DateTime<Tz> {
    now.clone() + settings.interval()
}

/// Clock used to evaluate the minute-of-hour alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// Host local time.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl Zone {
    /// Fixed zone from an offset in minutes east of UTC. Out-of-range offsets
    /// yield `None`.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Zone::Fixed)
    }

    /// Render an instant on this clock with a strftime pattern.
    pub fn format(&self, at: DateTime<Utc>, pattern: &str) -> String {
        match self {
            Zone::Local => at.with_timezone(&Local).format(pattern).to_string(),
            Zone::Fixed(offset) => at.with_timezone(offset).format(pattern).to_string(),
        }
    }

    /// Render an instant as `HH:MM` on this clock.
    pub fn format_hm(&self, at: DateTime<Utc>) -> String {
        self.format(at, "%H:%M")
    }

    /// Calendar day and hour-of-day of an instant on this clock.
    pub fn date_hour(&self, at: DateTime<Utc>) -> (NaiveDate, u32) {
        match self {
            Zone::Local => {
                let local = at.with_timezone(&Local);
                (local.date_naive(), local.hour())
            }
            Zone::Fixed(offset) => {
                let local = at.with_timezone(offset);
                (local.date_naive(), local.hour())
            }
        }
    }
}

/// Scheduler bound to a clock and a re-arm tolerance.
#[derive(Debug, Clone)]
pub struct AlarmScheduler {
    zone: Zone,
    tolerance: Duration,
}

impl Default for AlarmScheduler {
    fn default() -> Self {
        Self::new(Zone::Local, Duration::seconds(REARM_TOLERANCE_SECS))
    }
}

impl AlarmScheduler {
    pub fn new(zone: Zone, tolerance: Duration) -> Self {
        Self { zone, tolerance }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Aligned next fire time on this scheduler's clock.
    pub fn next_aligned(&self, settings: &Settings, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            Zone::Local => {
                compute_next_aligned(settings, &now.with_timezone(&Local)).with_timezone(&Utc)
            }
            Zone::Fixed(offset) => {
                compute_next_aligned(settings, &now.with_timezone(&offset)).with_timezone(&Utc)
            }
        }
    }

    /// Relative next fire time. Independent of the clock.
    pub fn next_relative(&self, settings: &Settings, now: DateTime<Utc>) -> DateTime<Utc> {
        compute_relative(settings, &now)
    }

    /// Whether `existing` must be replaced to match `settings` aligned at
    /// `now`. Returns the replacement timer when it must.
    pub fn plan_aligned(
        &self,
        existing: Option<&ScheduledTimer>,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Option<ScheduledTimer> {
        let aligned = self.next_aligned(settings, now);
        rearm::needs_rearm(existing, settings, aligned, self.tolerance)
            .then(|| ScheduledTimer::new(settings.interval_minutes, aligned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    fn settings(interval_minutes: u32, minute_offset: u32) -> Settings {
        Settings { interval_minutes, minute_offset }
    }

    #[test]
    fn aligned_skips_past_offset_to_next_hour() {
        assert_eq!(compute_next_aligned(&settings(60, 15), &at(10, 20, 0)), at(11, 15, 0));
    }

    #[test]
    fn aligned_uses_offset_later_in_current_hour() {
        assert_eq!(compute_next_aligned(&settings(60, 45), &at(10, 20, 0)), at(10, 45, 0));
    }

    #[test]
    fn aligned_is_strictly_after_now() {
        assert_eq!(compute_next_aligned(&settings(30, 20), &at(10, 20, 0)), at(11, 20, 0));
    }

    #[test]
    fn aligned_zeroes_seconds() {
        let now = at(10, 5, 42) + Duration::milliseconds(250);
        let next = compute_next_aligned(&settings(60, 0), &now);
        assert_eq!(next, at(11, 0, 0));
        assert_eq!(next.nanosecond(), 0);
    }

    #[test]
    fn aligned_respects_fixed_offset_clock() {
        // 10:20 UTC is 15:50 at +05:30; offset 15 lands on 16:15 local.
        let zone = Zone::from_offset_minutes(330).unwrap();
        let scheduler = AlarmScheduler::new(zone, Duration::seconds(65));
        let next = scheduler.next_aligned(&settings(60, 15), at(10, 20, 0));
        assert_eq!(next, at(10, 45, 0));
    }

    #[test]
    fn aligned_result_always_lands_on_offset() {
        for minute in 0..60 {
            for offset in [0, 7, 30, 59] {
                let now = at(8, minute, 13);
                let next = compute_next_aligned(&settings(90, offset), &now);
                assert!(next > now);
                assert_eq!(next.minute(), offset);
                assert!(next - now <= Duration::hours(1));
            }
        }
    }

    #[test]
    fn relative_adds_interval() {
        assert_eq!(compute_relative(&settings(30, 0), &at(10, 20, 0)), at(10, 50, 0));
    }

    #[test]
    fn plan_aligned_keeps_matching_timer() {
        let scheduler = AlarmScheduler::new(
            Zone::Fixed(FixedOffset::east_opt(0).unwrap()),
            Duration::seconds(65),
        );
        let s = settings(60, 15);
        let existing = ScheduledTimer::new(60, at(11, 15, 30));
        assert!(scheduler.plan_aligned(Some(&existing), &s, at(10, 20, 0)).is_none());

        let planned = scheduler.plan_aligned(None, &s, at(10, 20, 0)).unwrap();
        assert_eq!(planned, ScheduledTimer::new(60, at(11, 15, 0)));
    }
}
