//! Search index synchronisation.
//!
//! Rebuilds the store index from the database, either on demand or in a
//! background task at startup.

use sqlx::PgPool;
use tracing::{error, info, instrument};

use teco_core::StoreFetchPlan;

use super::{SearchError, StoreSearchIndex};
use crate::db::StoreRepository;

/// Spawn a background task that rebuilds the index from the database.
///
/// The server keeps answering searches from the current index content while
/// the rebuild runs.
pub fn build_index_async(search_index: StoreSearchIndex, pool: PgPool) {
    info!("Spawning background store index build task");
    tokio::spawn(async move {
        match reindex_all(&pool, &search_index).await {
            Ok(count) => info!(count, "Store index is now ready and serving requests"),
            Err(e) => error!(error = %e, "Failed to build store index"),
        }
    });
}

/// Load every store and replace the index content with them.
///
/// # Errors
///
/// Returns `SearchError::Build` if the stores cannot be loaded, or the error
/// of [`StoreSearchIndex::replace_all`].
#[instrument(skip_all)]
pub async fn reindex_all(pool: &PgPool, index: &StoreSearchIndex) -> Result<usize, SearchError> {
    info!("Loading stores for indexing");
    let stores = StoreRepository::new(pool)
        .find_all(Some(&StoreFetchPlan::none()))
        .await
        .map_err(|e| SearchError::Build(format!("Failed to load stores: {e}")))?;

    let count = index.replace_all(&stores)?;
    info!(count, "Indexed stores");
    Ok(count)
}
