//! Exponential reconnect backoff with jitter

use std::time::Duration;

use rand::Rng;

use super::config::BackoffConfig;

/// Delay schedule: `initial * factor^n`, capped at `max`, then jittered by ±`jitter`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    current_ms: u64,
    attempts: u32,
}

impl ExponentialBackoff {
    /// Creates a schedule starting at `config.initial_ms`
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            current_ms: config.initial_ms,
            attempts: 0,
        }
    }

    /// Attempts since the last reset
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The next delay without jitter
    #[must_use]
    pub const fn peek_ms(&self) -> u64 {
        self.current_ms
    }

    /// The next delay, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current_ms;
        self.attempts = self.attempts.saturating_add(1);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let grown = (base as f64 * self.config.factor.max(1.0)) as u64;
        self.current_ms = grown.clamp(self.config.initial_ms, self.config.max_ms.max(1));

        let jitter = self.config.jitter_ms;
        let delay_ms = if jitter == 0 {
            base
        } else {
            let offset = rand::thread_rng().gen_range(0..=2 * jitter);
            (base + offset).saturating_sub(jitter)
        };
        Duration::from_millis(delay_ms)
    }

    /// Restarts the schedule after a successful connection
    pub fn reset(&mut self) {
        self.current_ms = self.config.initial_ms;
        self.attempts = 0;
    }
}
