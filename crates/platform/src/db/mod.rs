//! Database operations for the platform `PostgreSQL`.
//!
//! ## Tables
//!
//! - `teco_retailer` - Retailers (tenants)
//! - `teco_retailer_address`, `teco_retailer_attribute`, `teco_retailer_tag` - Owned by a retailer
//! - `teco_retailer_customer_rate`, `teco_retailer_customer_comment` - Customer feedback
//! - `teco_market_area`, `teco_market_area_retailer_rel` - Market areas and their retailers
//! - `teco_store`, `teco_store_attribute` - Physical store locations
//!
//! # Migrations
//!
//! Migrations are stored in `crates/platform/migrations/` and run via:
//! ```bash
//! cargo run -p teco-cli -- migrate
//! ```

pub mod retailers;
pub mod stores;

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use teco_core::{Code, CodeError};

pub use retailers::RetailerRepository;
pub use stores::StoreRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique code).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The caller passed an argument the operation cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<CodeError> for RepositoryError {
    fn from(e: CodeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Normalize a code received from a caller before using it in a lookup.
pub(crate) fn normalize_code(code: &str) -> Result<Code, RepositoryError> {
    Ok(Code::parse(code)?)
}

/// Build a `LIKE` pattern matching `text` anywhere, with wildcards in the
/// input escaped.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// The current instant at the microsecond precision `TIMESTAMPTZ` keeps.
///
/// Saves stamp records with this value so the returned aggregate matches
/// what a reload reads back.
pub(crate) fn stamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// `date_create` and `date_update` as returned by an `UPDATE ... RETURNING`.
pub(crate) type StoredStamps = (DateTime<Utc>, DateTime<Utc>);

/// Convert a list limit to the `BIGINT` bound used by `LIMIT`.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Map unique violations to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
