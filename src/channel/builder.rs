//! Channel configuration and its builder.
//!
//! The only externally supplied value is the endpoint address. It defaults
//! to [`DEFAULT_ENDPOINT`] and may come from the [`ENDPOINT_ENV`]
//! environment variable.
//!
//! # Example
//!
//! ```ignore
//! use resilient_chat::ChannelConfig;
//!
//! let config = ChannelConfig::builder()
//!     .endpoint("ws://127.0.0.1:9000")
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Environment variable read by [`ChannelConfig::from_env`].
pub const ENDPOINT_ENV: &str = "CHAT_ENDPOINT";

// ============================================================================
// ChannelConfig
// ============================================================================

/// Validated channel configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Target endpoint.
    endpoint: Url,
    /// Reconnect policy.
    reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::new()
    }

    /// Builds a configuration from `CHAT_ENDPOINT`, falling back to
    /// [`DEFAULT_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the variable holds an unusable
    /// address.
    pub fn from_env() -> Result<Self> {
        Self::from_endpoint_var(env::var(ENDPOINT_ENV).ok())
    }

    /// Builds a configuration from an optional endpoint value.
    fn from_endpoint_var(value: Option<String>) -> Result<Self> {
        let builder = Self::builder();
        match value.filter(|v| !v.trim().is_empty()) {
            Some(endpoint) => builder.endpoint(endpoint.trim()).build(),
            None => builder.build(),
        }
    }

    /// Returns the target endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect(&self) -> &ReconnectPolicy {
        &self.reconnect
    }
}

// ============================================================================
// ChannelConfigBuilder
// ============================================================================

/// Builder for [`ChannelConfig`].
#[derive(Debug, Default, Clone)]
pub struct ChannelConfigBuilder {
    /// Endpoint address, unparsed.
    endpoint: Option<String>,
    /// Reconnect policy.
    reconnect: Option<ReconnectPolicy>,
}

impl ChannelConfigBuilder {
    /// Creates a builder with no overrides.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint address (`ws://host:port[/path]`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] if the endpoint does not parse, is not
    ///   `ws://`, or has no host
    /// - [`Error::Config`] if the reconnect policy is invalid
    pub fn build(self) -> Result<ChannelConfig> {
        let endpoint = self.validate_endpoint()?;

        let reconnect = self.reconnect.unwrap_or_default();
        reconnect.validate()?;

        Ok(ChannelConfig {
            endpoint,
            reconnect,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChannelConfigBuilder {
    /// Parses and checks the endpoint.
    fn validate_endpoint(&self) -> Result<Url> {
        let raw = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

        let endpoint =
            Url::parse(raw).map_err(|e| Error::invalid_endpoint(raw, e.to_string()))?;

        match endpoint.scheme() {
            "ws" => {}
            "wss" => {
                return Err(Error::invalid_endpoint(
                    raw,
                    "TLS endpoints (wss://) are not supported",
                ));
            }
            other => {
                return Err(Error::invalid_endpoint(
                    raw,
                    format!("scheme must be ws, got {other}"),
                ));
            }
        }

        if endpoint.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_endpoint(raw, "missing host"));
        }

        Ok(endpoint)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_default_endpoint() {
        let config = ChannelConfig::builder().build().expect("default is valid");
        assert_eq!(config.endpoint().as_str(), "ws://localhost:8080/");
        assert_eq!(config.reconnect(), &ReconnectPolicy::default());
    }

    #[test]
    fn test_custom_endpoint() {
        let config = ChannelConfig::builder()
            .endpoint("ws://127.0.0.1:9000/chat")
            .build()
            .expect("valid endpoint");
        assert_eq!(config.endpoint().port(), Some(9000));
        assert_eq!(config.endpoint().path(), "/chat");
    }

    #[test]
    fn test_rejects_http_scheme() {
        let err = ChannelConfig::builder()
            .endpoint("http://localhost:8080")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
        assert!(err.to_string().contains("scheme must be ws"));
    }

    #[test]
    fn test_rejects_wss() {
        let err = ChannelConfig::builder()
            .endpoint("wss://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("TLS"));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = ChannelConfig::builder().endpoint("not a url").build().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_rejects_invalid_policy() {
        let err = ChannelConfig::builder()
            .reconnect(ReconnectPolicy::new().with_growth_factor(0.1))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_custom_policy_is_kept() {
        let policy = ReconnectPolicy::new().with_max_delay(Duration::from_secs(3));
        let config = ChannelConfig::builder()
            .reconnect(policy.clone())
            .build()
            .expect("valid policy");
        assert_eq!(config.reconnect(), &policy);
    }

    #[test]
    fn test_endpoint_var() {
        let config = ChannelConfig::from_endpoint_var(Some(" ws://10.0.0.2:7000 ".into()))
            .expect("valid endpoint");
        assert_eq!(config.endpoint().host_str(), Some("10.0.0.2"));

        let config = ChannelConfig::from_endpoint_var(Some("   ".into())).expect("blank ignored");
        assert_eq!(config.endpoint().as_str(), "ws://localhost:8080/");

        let config = ChannelConfig::from_endpoint_var(None).expect("default");
        assert_eq!(config.endpoint().port(), Some(8080));
    }
}
