//! View models handed to presentation layers.
//!
//! View models are flat, already-formatted snapshots of domain data. They are
//! built by services and serialized as camelCase JSON.

pub mod customer;

pub use customer::{AttributeValue, ConnectionLogView, CustomerView, SCREEN_NAME_ATTRIBUTE};
