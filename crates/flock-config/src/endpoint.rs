// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Connection settings for the framed TCP endpoint and their persisted form.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::store::{ConfigError, ConfigStore};

/// Key under which [`EndpointConfig`] is stored.
pub const ENDPOINT_CONFIG_KEY: &str = "endpoint";

/// Where and how to reach the graph-store service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Hostname or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Connect, read and write timeout in milliseconds.
    pub timeout_ms: u64,
    /// Largest frame payload accepted or sent.
    pub max_frame_bytes: usize,
}

impl EndpointConfig {
    /// Settings for `host:port` with default timeout and frame limit.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Copy with a different timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Timeout as a [`Duration`]. Zero is bumped to one millisecond, since
    /// the socket API rejects zero timeouts.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    /// Reject settings no connection could be made with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: "must not be empty",
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                reason: "must be non-zero",
            });
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frame_bytes",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7915,
            timeout_ms: 1000,
            max_frame_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Persisted [`EndpointConfig`], stored as pretty JSON under
/// [`ENDPOINT_CONFIG_KEY`] in any [`ConfigStore`].
pub struct EndpointSettings<S> {
    store: S,
}

impl<S> EndpointSettings<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the settings and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> EndpointSettings<S> {
    /// The stored settings, or `None` when nothing (or an empty blob) is stored.
    pub fn stored(&self) -> Result<Option<EndpointConfig>, ConfigError> {
        let bytes = match self.store.load_raw(ENDPOINT_CONFIG_KEY) {
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        let config: EndpointConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// The stored settings, falling back to [`EndpointConfig::default`].
    pub fn load(&self) -> Result<EndpointConfig, ConfigError> {
        Ok(self.stored()?.unwrap_or_default())
    }

    /// Validate and persist `config`. Nothing is written when it is invalid.
    pub fn save(&self, config: &EndpointConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let data = serde_json::to_vec_pretty(config)?;
        self.store.save_raw(ENDPOINT_CONFIG_KEY, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: EndpointConfig = serde_json::from_str(r#"{"host":"graph.internal"}"#).unwrap();
        assert_eq!(cfg.host, "graph.internal");
        assert_eq!(cfg.port, 7915);
        assert_eq!(cfg.timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let cfg = EndpointConfig::new("h", 1).with_timeout_ms(0);
        assert_eq!(cfg.timeout(), Duration::from_millis(1));
    }

    #[test]
    fn empty_host_and_zero_port_are_invalid() {
        let err = EndpointConfig::new("  ", 7000).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "host", .. }));

        let err = EndpointConfig::new("graph", 0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "port", .. }));

        assert!(EndpointConfig::default().validate().is_ok());
    }
}
