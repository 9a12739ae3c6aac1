//! Teco Core - Shared types library.
//!
//! This crate provides common types used across all Teco components:
//! - `platform` - Retailer/store data access, store search and cache messaging
//! - `cli` - Command-line tools for migrations, reindexing and cache management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and business codes
//! - [`timestamps`] - Creation/update stamping applied at the persistence boundary
//! - [`geo`] - Coordinates and great-circle distance
//! - [`fetch_plan`] - Declarative eager-loading plans for aggregates
//! - [`view`] - View models handed to presentation layers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fetch_plan;
pub mod geo;
pub mod timestamps;
pub mod types;
pub mod view;

pub use fetch_plan::{FetchPlan, RetailerAssociation, RetailerFetchPlan, StoreAssociation, StoreFetchPlan};
pub use geo::{Distance, GeoError, GeoPoint, great_circle_miles};
pub use timestamps::{Timestamped, Timestamps};
pub use types::*;
pub use view::{AttributeValue, ConnectionLogView, CustomerView};
