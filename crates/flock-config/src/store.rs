// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Blob storage port behind [`EndpointSettings`](crate::EndpointSettings).

use thiserror::Error;

/// Raw config blobs keyed by logical name.
pub trait ConfigStore {
    /// Load the blob stored under `key`. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist `data` under `key`, replacing any previous blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure loading, decoding or storing endpoint settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored blob is not valid endpoint JSON.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Settings decoded but cannot be used to connect.
    #[error("invalid endpoint setting `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}
