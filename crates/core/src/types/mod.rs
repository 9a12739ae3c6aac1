//! Core types for Teco.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod id;

pub use code::{Code, CodeError};
pub use id::*;
