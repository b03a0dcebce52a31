//! Client-side request pacing for the generation service.
//!
//! Two limits apply: a sliding one-minute window and a daily counter that
//! rolls over when the UTC calendar date changes. Window timing uses
//! `tokio::time` so it can be driven by paused time in tests; the date comes
//! from the injected [`Clock`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use studia_core::defaults::{RATE_LIMIT_PER_DAY, RATE_LIMIT_PER_MINUTE, RATE_LIMIT_WINDOW_MS};
use studia_core::{Clock, Error, Result};

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests allowed in any trailing window.
    pub requests_per_minute: u32,
    /// Requests allowed per UTC calendar day.
    pub requests_per_day: u32,
    /// Length of the sliding window.
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: RATE_LIMIT_PER_MINUTE,
            requests_per_day: RATE_LIMIT_PER_DAY,
            window: Duration::from_millis(RATE_LIMIT_WINDOW_MS),
        }
    }
}

impl RateLimiterConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `GEN_RATE_LIMIT_PER_MINUTE` | `15` | Requests per sliding minute |
    /// | `GEN_RATE_LIMIT_PER_DAY` | `1500` | Requests per UTC day |
    pub fn from_env() -> Self {
        let requests_per_minute = std::env::var("GEN_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(RATE_LIMIT_PER_MINUTE)
            .max(1);

        let requests_per_day = std::env::var("GEN_RATE_LIMIT_PER_DAY")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(RATE_LIMIT_PER_DAY);

        Self {
            requests_per_minute,
            requests_per_day,
            ..Self::default()
        }
    }

    pub fn with_requests_per_minute(mut self, n: u32) -> Self {
        self.requests_per_minute = n.max(1);
        self
    }

    pub fn with_requests_per_day(mut self, n: u32) -> Self {
        self.requests_per_day = n;
        self
    }
}

/// Point-in-time view of limiter usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    /// Requests recorded in the current window.
    pub in_window: usize,
    pub used_today: u32,
    pub remaining_today: u32,
}

#[derive(Debug)]
struct LimiterState {
    recent: VecDeque<Instant>,
    day: NaiveDate,
    used_today: u32,
}

impl LimiterState {
    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.day {
            debug!(previous = %self.day, today = %today, used = self.used_today, "Daily quota reset");
            self.day = today;
            self.used_today = 0;
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Paces calls to the generation service.
///
/// Callers queue on a single async mutex, so waiters are served in arrival
/// order and at most one of them sleeps on the window at a time.
pub struct RateLimiter {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let day = clock.today();
        Self {
            config,
            clock,
            state: Mutex::new(LimiterState {
                recent: VecDeque::new(),
                day,
                used_today: 0,
            }),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Wait until a request may be sent, then record it.
    ///
    /// Fails immediately with `QuotaExceeded` when today's quota is used up.
    pub async fn acquire(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let per_minute = self.config.requests_per_minute.max(1) as usize;

        loop {
            state.roll_over(self.clock.today());
            if state.used_today >= self.config.requests_per_day {
                warn!(
                    used_today = state.used_today,
                    limit = self.config.requests_per_day,
                    "Daily generation quota exhausted"
                );
                return Err(Error::QuotaExceeded {
                    limit: self.config.requests_per_day,
                });
            }

            let now = Instant::now();
            state.prune(now, self.config.window);
            if state.recent.len() < per_minute {
                break;
            }

            let Some(&oldest) = state.recent.front() else {
                break;
            };
            let wait = self.config.window.saturating_sub(now.duration_since(oldest));
            debug!(
                wait_ms = wait.as_millis() as u64,
                in_window = state.recent.len(),
                "Rate limit window full, waiting"
            );
            sleep(wait).await;
        }

        state.recent.push_back(Instant::now());
        state.used_today += 1;
        Ok(())
    }

    pub async fn snapshot(&self) -> RateLimiterStats {
        let mut state = self.state.lock().await;
        state.roll_over(self.clock.today());
        state.prune(Instant::now(), self.config.window);
        RateLimiterStats {
            in_window: state.recent.len(),
            used_today: state.used_today,
            remaining_today: self.config.requests_per_day.saturating_sub(state.used_today),
        }
    }
}
