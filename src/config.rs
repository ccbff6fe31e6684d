//! Configuration for a live order book subscription.
//!
//! This module provides the [`Config`] struct: where to connect, which
//! symbol to follow, how deep to render, and the liveness/backoff timing.

use std::time::Duration;

use crate::connection::{BackoffConfig, LivenessConfig};
use crate::error::Error;
use crate::orderbook::depth::DEFAULT_DEPTH;

/// Channel namespace for order book updates
pub const ORDERBOOK_NAMESPACE: &str = "orderbook";

/// Configuration for an order book session
///
/// # Example
///
/// ```rust
/// use orderbook_sync::Config;
/// use std::time::Duration;
///
/// let config = Config::new("wss://feed.example.com/connection/websocket", "BTC-USD")
///     .with_token("jwt-token")
///     .with_depth(20)
///     .with_silence_threshold(Duration::from_secs(15));
///
/// assert_eq!(config.channel(), "orderbook:BTC-USD");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint of the pub/sub server
    endpoint: String,

    /// Connection token (JWT), if the server requires one
    token: Option<String>,

    /// Symbol to follow, e.g. `BTC-USD`
    symbol: String,

    /// Levels rendered per side
    depth: usize,

    /// Timeout for the connect handshake
    connect_timeout: Duration,

    /// Liveness and reconnect timing
    liveness: LivenessConfig,
}

impl Config {
    /// Create a configuration for one symbol on one endpoint
    ///
    /// Defaults: depth 11, liveness check every 5s, 10s silence threshold,
    /// reconnect backoff 1s doubling to a 30s cap, 10s connect timeout.
    pub fn new(endpoint: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            symbol: symbol.into(),
            depth: DEFAULT_DEPTH,
            connect_timeout: Duration::from_secs(10),
            liveness: LivenessConfig::default(),
        }
    }

    /// Set the connection token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the number of levels rendered per side
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the connect handshake timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how often the liveness check runs
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.liveness.check_interval = interval;
        self
    }

    /// Set how long the feed may stay silent while connected
    #[must_use]
    pub fn with_silence_threshold(mut self, threshold: Duration) -> Self {
        self.liveness.silence_threshold = threshold;
        self
    }

    /// Set the reconnect backoff curve
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.liveness.backoff = backoff;
        self
    }

    /// Get the endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the connection token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Get the symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Channel carrying this symbol's updates (`orderbook:<symbol>`)
    pub fn channel(&self) -> String {
        format!("{}:{}", ORDERBOOK_NAMESPACE, self.symbol)
    }

    /// Get the display depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Get the connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the liveness configuration
    pub fn liveness(&self) -> &LivenessConfig {
        &self.liveness
    }

    /// Check the configuration for values that cannot work
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".into()));
        }
        let url = url::Url::parse(&self.endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "endpoint scheme must be ws or wss, got {}",
                url.scheme()
            )));
        }
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        if self.depth == 0 {
            return Err(Error::Config("depth must be at least 1".into()));
        }
        if self.liveness.check_interval.is_zero() {
            return Err(Error::Config("check interval must be non-zero".into()));
        }
        if self.liveness.silence_threshold.is_zero() {
            return Err(Error::Config("silence threshold must be non-zero".into()));
        }
        let backoff = &self.liveness.backoff;
        if backoff.max_delay_ms < backoff.base_delay_ms {
            return Err(Error::Config(format!(
                "backoff cap {}ms is below base delay {}ms",
                backoff.max_delay_ms, backoff.base_delay_ms
            )));
        }
        if backoff.multiplier.is_nan() || backoff.multiplier < 1.0 {
            return Err(Error::Config("backoff multiplier must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "ws://localhost:8000/connection/websocket";

    #[test]
    fn test_default_config() {
        let config = Config::new(ENDPOINT, "BTC-USD");
        assert_eq!(config.endpoint(), ENDPOINT);
        assert_eq!(config.token(), None);
        assert_eq!(config.depth(), 11);
        assert_eq!(config.liveness().check_interval, Duration::from_secs(5));
        assert_eq!(config.liveness().silence_threshold, Duration::from_secs(10));
        assert_eq!(config.liveness().backoff.base_delay_ms, 1_000);
        assert_eq!(config.liveness().backoff.max_delay_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channel_name() {
        let config = Config::new(ENDPOINT, "ETH-USD");
        assert_eq!(config.channel(), "orderbook:ETH-USD");
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new(ENDPOINT, "BTC-USD")
            .with_token("secret")
            .with_depth(5)
            .with_connect_timeout(Duration::from_secs(3))
            .with_check_interval(Duration::from_secs(1))
            .with_silence_threshold(Duration::from_secs(2))
            .with_backoff(BackoffConfig::new().base_delay_ms(100).max_delay_ms(800));

        assert_eq!(config.token(), Some("secret"));
        assert_eq!(config.depth(), 5);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.liveness().check_interval, Duration::from_secs(1));
        assert_eq!(config.liveness().backoff.max_delay_ms, 800);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::new("", "BTC-USD").validate().is_err());
        assert!(matches!(
            Config::new("not a url", "BTC-USD").validate(),
            Err(Error::Url(_))
        ));
        assert!(Config::new("https://example.com", "BTC-USD").validate().is_err());
        assert!(Config::new(ENDPOINT, " ").validate().is_err());
        assert!(Config::new(ENDPOINT, "BTC-USD").with_depth(0).validate().is_err());
        assert!(Config::new(ENDPOINT, "BTC-USD")
            .with_silence_threshold(Duration::ZERO)
            .validate()
            .is_err());
        assert!(Config::new(ENDPOINT, "BTC-USD")
            .with_backoff(BackoffConfig::new().base_delay_ms(5_000).max_delay_ms(1_000))
            .validate()
            .is_err());
        assert!(Config::new(ENDPOINT, "BTC-USD")
            .with_backoff(BackoffConfig::new().multiplier(0.5))
            .validate()
            .is_err());
    }
}
