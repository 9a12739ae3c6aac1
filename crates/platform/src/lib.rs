//! Teco retail platform services.
//!
//! - [`db`] - Retailer and store repositories over `PostgreSQL`
//! - [`search`] - Tantivy store index with prefix search and facets
//! - [`messaging`] - Cache management messages posted to the broker
//! - [`routes`] - JSON HTTP API served by the `teco-platform` binary
//!
//! The CLI (`teco-cli`) reuses the same modules for migrations, reindexing
//! and cache flushes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod messaging;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;

pub use config::{BrokerConfig, ConfigError, PlatformConfig};
pub use error::AppError;
pub use state::AppState;
