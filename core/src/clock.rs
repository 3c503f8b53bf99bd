//! Wall clock abstraction.
//!
//! RULE: nothing in the client calls `Utc::now()` or `thread::sleep`
//! directly. Everything goes through a `Clock`, so tests run against a
//! `ManualClock` that advances instead of blocking.

use crate::types::UnixTime;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Block (or pretend to block) for `duration`.
    fn sleep(&self, duration: Duration);

    fn now_unix(&self) -> UnixTime {
        self.now().timestamp()
    }

    /// Calendar day key as the game formats it: `YYYYMMDD`, UTC.
    fn today(&self) -> String {
        day_key(self.now())
    }
}

pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Day key for a server timestamp, `None` if out of range.
pub fn day_key_of(unix: UnixTime) -> Option<String> {
    DateTime::from_timestamp(unix, 0).map(day_key)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock for tests. `sleep` advances time instantly.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at the given Unix time. Out-of-range values fall back to the epoch.
    pub fn at(unix: UnixTime) -> Self {
        Self {
            current: Mutex::new(DateTime::from_timestamp(unix, 0).unwrap_or_default()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current += chrono::Duration::milliseconds(duration.as_millis() as i64);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Render a remaining-seconds count the way the logs show cooldowns.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
