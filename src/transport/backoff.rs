//! Reconnect policy.
//!
//! Delays grow geometrically with consecutive failures and are capped at
//! [`ReconnectPolicy::max_delay`]. The first connect attempt is immediate;
//! retry `n` (1-based) waits `initial_delay * growth_factor^(n - 1)`.
//!
//! The failure counter resets only after a connection has stayed open for
//! [`ReconnectPolicy::min_uptime`], so an endpoint that accepts and then
//! immediately drops still backs off.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use resilient_chat::ReconnectPolicy;
//!
//! let policy = ReconnectPolicy::new()
//!     .with_initial_delay(Duration::from_millis(500))
//!     .with_max_delay(Duration::from_secs(5));
//!
//! assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Delay before the first retry.
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any retry delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Multiplier applied per consecutive failure.
const DEFAULT_GROWTH_FACTOR: f64 = 1.3;

/// Handshake deadline for one connect attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Open time after which the failure counter resets.
const DEFAULT_MIN_UPTIME: Duration = Duration::from_secs(5);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Backoff and timing parameters for a resilient connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound on any retry delay.
    pub max_delay: Duration,

    /// Multiplier applied per consecutive failure (must be >= 1).
    pub growth_factor: f64,

    /// Handshake deadline for one connect attempt.
    pub connect_timeout: Duration,

    /// Open time after which the failure counter resets.
    pub min_uptime: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            min_uptime: DEFAULT_MIN_UPTIME,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ReconnectPolicy {
    /// Creates a policy with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay before the first retry.
    #[inline]
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound on retry delays.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the per-failure growth factor.
    #[inline]
    #[must_use]
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the open time after which the failure counter resets.
    #[inline]
    #[must_use]
    pub fn with_min_uptime(mut self, uptime: Duration) -> Self {
        self.min_uptime = uptime;
        self
    }
}

// ============================================================================
// Delay Computation
// ============================================================================

impl ReconnectPolicy {
    /// Returns the wait before retry number `attempt`.
    ///
    /// `attempt` counts consecutive failures starting at 1. Attempt 0 is the
    /// initial connect and has no delay. The result never decreases as
    /// `attempt` grows and never exceeds `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let cap = self.max_delay.as_secs_f64();
        let mut delay = self.initial_delay.as_secs_f64();

        if self.growth_factor > 1.0 {
            // Stepwise so each retry is at least the previous one.
            for _ in 1..attempt {
                if delay >= cap {
                    break;
                }
                delay *= self.growth_factor;
            }
        }

        if !delay.is_finite() || delay >= cap {
            return self.max_delay;
        }

        Duration::from_secs_f64(delay).min(self.max_delay)
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the growth factor is below 1 or not
    /// finite, the initial delay exceeds the max delay, or the connect
    /// timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(Error::config(format!(
                "growth factor must be a finite value >= 1, got {}",
                self.growth_factor
            )));
        }

        if self.initial_delay > self.max_delay {
            return Err(Error::config(format!(
                "initial delay ({}ms) exceeds max delay ({}ms)",
                self.initial_delay.as_millis(),
                self.max_delay.as_millis()
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be non-zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
