// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use flock_config::{ConfigError, ConfigStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory implementation of [`ConfigStore`] for testing.
///
/// Clones share state, so a test can hand one clone to a
/// [`EndpointSettings`](flock_config::EndpointSettings) and inspect the other.
///
/// # Example
///
/// ```
/// use flock_dry_tests::InMemoryConfigStore;
/// use flock_config::{EndpointConfig, EndpointSettings, ENDPOINT_CONFIG_KEY};
///
/// let store = InMemoryConfigStore::new();
/// let settings = EndpointSettings::new(store.clone());
///
/// settings.save(&EndpointConfig::new("graph", 7000)).unwrap();
/// assert_eq!(store.save_count(), 1);
/// assert!(store.contains_key(ENDPOINT_CONFIG_KEY));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one raw blob under `key`.
    pub fn with_blob(key: &str, data: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .data
            .insert(key.to_string(), data.into());
        store
    }

    /// Make every `load_raw` fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail_on_load = fail;
    }

    /// Make every `save_raw` fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .save_count
    }

    /// Whether a blob is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .data
            .contains_key(key)
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.load_count += 1;

        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }

        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.save_count += 1;

        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }

        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_config::{EndpointConfig, EndpointSettings, ENDPOINT_CONFIG_KEY};

    #[test]
    fn missing_endpoint_falls_back_to_defaults() {
        let store = InMemoryConfigStore::new();
        let settings = EndpointSettings::new(store.clone());

        assert_eq!(settings.load().unwrap(), EndpointConfig::default());
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn stored_endpoint_round_trips_through_the_settings() {
        let store = InMemoryConfigStore::new();
        let settings = EndpointSettings::new(store.clone());
        let cfg = EndpointConfig::new("graph.internal", 7000).with_timeout_ms(250);

        settings.save(&cfg).unwrap();
        assert!(store.contains_key(ENDPOINT_CONFIG_KEY));
        assert_eq!(settings.stored().unwrap(), Some(cfg));
    }

    #[test]
    fn empty_blob_reads_as_missing() {
        let store = InMemoryConfigStore::with_blob(ENDPOINT_CONFIG_KEY, Vec::new());
        let settings = EndpointSettings::new(store);
        assert_eq!(settings.stored().unwrap(), None);
    }

    #[test]
    fn garbage_blob_is_a_serde_error() {
        let store = InMemoryConfigStore::with_blob(ENDPOINT_CONFIG_KEY, "{not json");
        let err = EndpointSettings::new(store).load().unwrap_err();
        assert!(matches!(err, ConfigError::Serde(_)));
    }

    #[test]
    fn stored_zero_port_is_rejected_on_load() {
        let store = InMemoryConfigStore::with_blob(ENDPOINT_CONFIG_KEY, r#"{"port":0}"#);
        let err = EndpointSettings::new(store).load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "port", .. }));
    }

    #[test]
    fn invalid_settings_are_never_written() {
        let store = InMemoryConfigStore::new();
        let settings = EndpointSettings::new(store.clone());

        let err = settings.save(&EndpointConfig::new("", 7000)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "host", .. }));
        assert_eq!(store.save_count(), 0);
        assert!(!store.contains_key(ENDPOINT_CONFIG_KEY));
    }

    #[test]
    fn failures_still_count_attempts() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_load(true);
        store.set_fail_on_save(true);

        assert!(matches!(store.load_raw("k"), Err(ConfigError::Other(_))));
        assert!(matches!(store.save_raw("k", b"v"), Err(ConfigError::Other(_))));
        assert_eq!(store.load_count(), 1);
        assert_eq!(store.save_count(), 1);
        assert!(!store.contains_key("k"));
    }

    #[test]
    fn clones_share_state() {
        let a = InMemoryConfigStore::new();
        let b = a.clone();
        a.save_raw("shared", b"1").unwrap();
        assert_eq!(b.load_raw("shared").unwrap(), b"1");
        assert_eq!(b.save_count(), 1);
    }
}
