//! Capped exponential backoff and the resubscription throttle.

use std::time::Duration;

/// Configuration for reconnection backoff
///
/// Delay for attempt `n` (0-based) is
/// `min(base_delay_ms * multiplier^n, max_delay_ms)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Maximum number of reconnection attempts (0 = infinite)
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub base_delay_ms: u64,
    /// Maximum delay between attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Create a backoff config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts (0 = infinite)
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set base delay in milliseconds
    #[must_use]
    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    #[must_use]
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Calculate delay for a given attempt count
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }

    /// Whether `attempts` already used up the budget
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts > 0 && attempts >= self.max_attempts
    }
}

/// Rate limiter for gap-triggered resubscriptions.
///
/// The first gap after a successfully applied batch resubscribes
/// immediately. Each further gap with no applied batch in between waits
/// one backoff step longer, so a feed that keeps regressing cannot cause
/// a tight unsubscribe/subscribe loop.
#[derive(Debug, Clone)]
pub struct ResyncThrottle {
    backoff: BackoffConfig,
    consecutive_gaps: u32,
}

impl ResyncThrottle {
    /// Create a throttle using the given backoff curve
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            backoff,
            consecutive_gaps: 0,
        }
    }

    /// Record a gap and return how long to wait before resubscribing
    pub fn on_gap(&mut self) -> Duration {
        let delay = match self.consecutive_gaps {
            0 => Duration::ZERO,
            n => self.backoff.delay_for_attempt(n - 1),
        };
        self.consecutive_gaps = self.consecutive_gaps.saturating_add(1);
        delay
    }

    /// Record a successfully applied batch
    pub fn on_applied(&mut self) {
        self.consecutive_gaps = 0;
    }

    /// Gaps seen since the last applied batch
    pub fn consecutive_gaps(&self) -> u32 {
        self.consecutive_gaps
    }
}
