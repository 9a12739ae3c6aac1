//! Store search index maintenance.
//!
//! # Environment Variables
//!
//! - `TECO_DATABASE_URL` - `PostgreSQL` connection string
//! - `TECO_SEARCH_INDEX_DIR` - Index directory, unless `--dir` is given

use std::path::PathBuf;

use thiserror::Error;

use teco_platform::config::{ConfigError, PlatformConfig};
use teco_platform::db;
use teco_platform::search::{SearchError, StoreSearchIndex, reindex_all};

/// Errors that can occur while reindexing.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No index directory: pass --dir or set TECO_SEARCH_INDEX_DIR")]
    MissingDirectory,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Rebuild the on-disk store index from the database.
///
/// Returns the number of indexed stores.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the database is
/// unreachable, or the index cannot be written.
pub async fn reindex(dir: Option<PathBuf>) -> Result<usize, IndexError> {
    let config = PlatformConfig::from_env()?;
    let dir = dir
        .or(config.search_index_dir)
        .ok_or(IndexError::MissingDirectory)?;

    tracing::info!("Connecting to platform database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!(dir = %dir.display(), "Opening store index");
    let index = StoreSearchIndex::open_in_dir(&dir)?;

    let count = reindex_all(&pool, &index).await?;
    tracing::info!(count, "Store index rebuilt");
    Ok(count)
}
