//! Fixed-window quota for calls to the metered upstream API.
//!
//! One unit is charged per upstream request actually sent. Requests that
//! arrive once the window is spent are rejected, not queued, so the caller can
//! tell the end user to come back later.

use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AppError;

/// Counter state for the current window
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
    pub limit: u32,
    pub window: Duration,
}

impl RateWindow {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
            limit,
            window,
        }
    }

    /// Moves to the window containing `now`, resetting the count if it changed.
    /// Windows are aligned to the first one, so skipped windows are accounted for.
    fn roll(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return;
        }

        let window_nanos = self.window.as_nanos();
        let skipped = elapsed.as_nanos() / window_nanos;
        let advance = u64::try_from(skipped * window_nanos).unwrap_or(u64::MAX);
        self.window_start += Duration::from_nanos(advance);

        if self.count > 0 {
            debug!(
                "Quota window rolled over: {} of {} units were used",
                self.count, self.limit
            );
        }
        self.count = 0;
    }

    fn resets_in(&self, now: Instant) -> Duration {
        (self.window_start + self.window).saturating_duration_since(now)
    }
}

/// Point-in-time view of the quota, for diagnostics
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateSnapshot {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub resets_in_seconds: u64,
}

pub struct RateGovernor {
    state: Mutex<RateWindow>,
}

impl RateGovernor {
    pub fn new(limit: u32, window: Duration) -> Self {
        let window = window.max(Duration::from_millis(1));
        Self {
            state: Mutex::new(RateWindow::new(limit, window)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateWindow> {
        // The critical sections never panic halfway through an update
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits one upstream call or rejects it with [`AppError::QuotaExceeded`]
    pub fn try_acquire(&self) -> Result<(), AppError> {
        let now = Instant::now();
        let mut state = self.lock();
        state.roll(now);

        if state.count >= state.limit {
            let retry_after = state.resets_in(now);
            warn!(
                "Upstream quota exhausted ({} per {:?}), next window in {:?}",
                state.limit, state.window, retry_after
            );
            return Err(AppError::quota_exceeded(state.limit, retry_after));
        }

        state.count += 1;
        debug!("Quota unit used: {}/{}", state.count, state.limit);
        Ok(())
    }

    pub fn snapshot(&self) -> RateSnapshot {
        let now = Instant::now();
        let mut state = self.lock();
        state.roll(now);
        RateSnapshot {
            limit: state.limit,
            used: state.count,
            remaining: state.limit.saturating_sub(state.count),
            resets_in_seconds: state.resets_in(now).as_secs(),
        }
    }
}
