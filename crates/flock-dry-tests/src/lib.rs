// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Flock crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`endpoint`] - Recording [`FlockEndpoint`](flock_proto::FlockEndpoint) with scripted replies
//! - [`fixtures`] - Result page and edge builders
//! - [`server`] - Loopback TCP server speaking the framed protocol

pub mod config;
pub mod endpoint;
pub mod fixtures;
pub mod server;

pub use config::InMemoryConfigStore;
pub use endpoint::RecordingEndpoint;
pub use fixtures::{edge, edge_results, results};
pub use server::LoopbackServer;
