//! Per-account pacing: pauses between calls and the run deadline.

use crate::{
    clock::Clock,
    config::DelayRange,
    error::{BotError, BotResult},
    rng::Jitter,
    types::UnixTime,
};
use std::sync::Arc;
use std::time::Duration;

/// Fixed pause after each card upgrade call and between combo entries.
pub const UPGRADE_CALL_DELAY: Duration = Duration::from_secs(1);

/// Fixed pause around task execution and verification.
pub const TASK_CALL_DELAY: Duration = Duration::from_secs(3);

pub struct Pacer {
    clock:         Arc<dyn Clock>,
    jitter:        Jitter,
    request_delay: DelayRange,
    /// (deadline in unix millis, configured budget in seconds)
    deadline:      Option<(i64, u64)>,
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock>, jitter: Jitter, request_delay: DelayRange) -> Self {
        Self { clock, jitter, request_delay, deadline: None }
    }

    /// Bound the run to `timeout` of wall-clock time from now.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        let now_ms = self.clock.now().timestamp_millis();
        let budget_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self.deadline = Some((now_ms.saturating_add(budget_ms), timeout.as_secs()));
        self
    }

    pub fn now_unix(&self) -> UnixTime {
        self.clock.now_unix()
    }

    pub fn today(&self) -> String {
        self.clock.today()
    }

    /// Fail with `Timeout` once the deadline has passed.
    pub fn checkpoint(&self) -> BotResult<()> {
        match self.deadline {
            Some((at_ms, secs)) if self.clock.now().timestamp_millis() >= at_ms => {
                Err(BotError::Timeout { secs })
            }
            _ => Ok(()),
        }
    }

    pub fn pause(&mut self, duration: Duration) -> BotResult<()> {
        self.checkpoint()?;
        if !duration.is_zero() {
            self.clock.sleep(duration);
        }
        Ok(())
    }

    /// Random pause in `range`.
    pub fn pause_in(&mut self, range: DelayRange) -> BotResult<u64> {
        let secs = self.jitter.secs_in(range);
        self.pause(Duration::from_secs(secs))?;
        Ok(secs)
    }

    /// The configured jittered pause before a rate-limited call.
    pub fn pause_before_request(&mut self) -> BotResult<()> {
        let range = self.request_delay;
        self.pause_in(range).map(|_| ())
    }
}
