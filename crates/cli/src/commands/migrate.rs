//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! teco-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TECO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Platform migrations live in `crates/platform/migrations/`.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use teco_platform::config::{ConfigError, get_database_url};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run platform database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration cannot be applied.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("TECO_DATABASE_URL")?;

    tracing::info!("Connecting to platform database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running platform migrations...");
    sqlx::migrate!("../platform/migrations").run(&pool).await?;

    tracing::info!("Platform migrations complete!");
    Ok(())
}
