//! Reconnect delay policy for the MQTT event loop.

use std::time::Duration;

use serde::Deserialize;

/// Reconnect backoff bounds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay after a connection drops.
    pub base_secs: u64,
    /// Upper bound for the delay.
    pub max_secs: u64,
    /// A connection that stayed up this long resets the delay to `base_secs`.
    pub stable_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: 1,
            max_secs: 128,
            stable_secs: 20,
        }
    }
}

/// Doubling reconnect delay with an upper bound and a stability reset.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    stable: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(config: &BackoffConfig) -> Self {
        let base = Duration::from_secs(config.base_secs);
        Self {
            base,
            max: Duration::from_secs(config.max_secs),
            stable: Duration::from_secs(config.stable_secs),
            current: base,
        }
    }

    /// Delay before the next reconnect attempt.
    ///
    /// `connected_for` is how long the connection that just dropped had
    /// been up, or `None` if the previous attempt never connected.
    pub fn next_delay(&mut self, connected_for: Option<Duration>) -> Duration {
        if connected_for.is_some_and(|up| up >= self.stable) {
            self.current = self.base;
        }
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}
