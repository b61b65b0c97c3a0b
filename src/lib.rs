//! # Smappee Agent Library
//!
//! Talks to the Smappee energy-monitoring REST API on behalf of one account:
//! keeps an OAuth2 token alive on disk, attaches it to every call and
//! republishes selected results as retained MQTT messages.
//!
//! Modules:
//! - `config` — YAML service configuration and validation
//! - `cache` — token model, file-backed token store, token manager
//! - `sources` — OAuth2 password and refresh grants
//! - `api` — bearer-token dispatcher and the Smappee operations
//! - `sinks` — publish sink trait and the MQTT implementation
//! - `poll` — periodic polling for `run` mode

pub mod error;
pub mod config;
pub mod cache;
pub mod sources;
pub mod api;
pub mod sinks;
pub mod poll;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;
#[cfg(test)]
mod tests;
