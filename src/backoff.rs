//! Delay schedules shared by request retries and channel reconnects.
//!
//! Both resilience paths are described by the same [`Backoff`] value:
//!
//! | Path | Default schedule |
//! |------|------------------|
//! | Request retry | 1000 ms, ×2 per retry, bounded by the attempt count |
//! | Channel reconnect | 5000 ms, fixed, unbounded |
//!
//! # Examples
//!
//! ```
//! use agent_api_client::Backoff;
//! use std::time::Duration;
//!
//! let delays: Vec<_> = Backoff::exponential(100, 2.0).delays().take(3).collect();
//! assert_eq!(
//!     delays,
//!     vec![
//!         Duration::from_millis(100),
//!         Duration::from_millis(200),
//!         Duration::from_millis(400),
//!     ]
//! );
//! ```

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A compounding delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after each use; `1.0` keeps it fixed
    pub multiplier: f64,
    /// Upper bound on any single delay, in milliseconds
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Backoff {
    /// A schedule that never grows.
    pub fn fixed(delay_ms: u64) -> Self {
        Backoff {
            initial_delay_ms: delay_ms,
            multiplier: 1.0,
            max_delay_ms: None,
        }
    }

    /// A schedule that multiplies the delay after every use.
    pub fn exponential(initial_delay_ms: u64, multiplier: f64) -> Self {
        Backoff {
            initial_delay_ms,
            multiplier,
            max_delay_ms: None,
        }
    }

    /// Cap every delay at `max_delay_ms`.
    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = Some(max_delay_ms);
        self
    }

    /// The first delay of the schedule.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay to wait before retry number `retry` (zero-based).
    ///
    /// Equals `initial_delay × multiplier^retry`, clamped to the maximum delay.
    /// Products too large for a [`Duration`] saturate before clamping.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        self.clamp(scale(self.initial_delay(), factor))
    }

    /// Fresh iterator over the schedule. Each logical operation takes its own.
    pub fn delays(&self) -> Delays {
        Delays {
            backoff: *self,
            next: self.clamp(self.initial_delay()),
        }
    }

    /// Reject multipliers below one and non-finite values.
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ApiError::Config(format!(
                "backoff multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if let Some(max) = self.max_delay_ms {
            if max < self.initial_delay_ms {
                return Err(ApiError::Config(format!(
                    "max delay {}ms is below the initial delay {}ms",
                    max, self.initial_delay_ms
                )));
            }
        }
        Ok(())
    }

    fn clamp(&self, delay: Duration) -> Duration {
        match self.max_delay_ms {
            Some(max) => delay.min(Duration::from_millis(max)),
            None => delay,
        }
    }
}

/// `delay × factor`, saturating at [`Duration::MAX`].
fn scale(delay: Duration, factor: f64) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Endless iterator over a [`Backoff`] schedule.
#[derive(Debug, Clone)]
pub struct Delays {
    backoff: Backoff,
    next: Duration,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = self.backoff.clamp(scale(current, self.backoff.multiplier));
        Some(current)
    }
}
