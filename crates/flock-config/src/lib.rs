// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Configuration for Flock clients: the endpoint settings the client
//! connects with, and a storage port they persist through as JSON.

pub mod endpoint;
pub mod store;

pub use endpoint::{EndpointConfig, EndpointSettings, ENDPOINT_CONFIG_KEY};
pub use store::{ConfigError, ConfigStore};
