//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::PlatformConfig;
use crate::messaging::{CacheManagementProducer, ProducerError};
use crate::search::{SearchError, StoreSearchIndex, build_index_async};

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("search index error: {0}")]
    Search(#[from] SearchError),
    #[error("message producer error: {0}")]
    Producer(#[from] ProducerError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PlatformConfig,
    pool: PgPool,
    search: StoreSearchIndex,
    producer: Option<CacheManagementProducer>,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// Opens the store search index (on disk when `search_index_dir` is set)
    /// and the cache management producer when a broker is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the search index cannot be opened or the broker
    /// endpoint is invalid.
    pub fn from_config(config: PlatformConfig, pool: PgPool) -> Result<Self, StateError> {
        let search = match &config.search_index_dir {
            Some(dir) => StoreSearchIndex::open_in_dir(dir)?,
            None => StoreSearchIndex::in_memory()?,
        };
        let producer = config
            .broker
            .as_ref()
            .map(CacheManagementProducer::new)
            .transpose()?;

        Ok(Self::new(config, pool, search, producer))
    }

    /// Create the application state from already built parts.
    #[must_use]
    pub fn new(
        config: PlatformConfig,
        pool: PgPool,
        search: StoreSearchIndex,
        producer: Option<CacheManagementProducer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                search,
                producer,
            }),
        }
    }

    /// Get a reference to the platform configuration.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the store search index.
    #[must_use]
    pub fn search(&self) -> &StoreSearchIndex {
        &self.inner.search
    }

    /// Get the cache management producer, if a broker is configured.
    #[must_use]
    pub fn producer(&self) -> Option<&CacheManagementProducer> {
        self.inner.producer.as_ref()
    }

    /// Rebuild the store search index from the database in the background.
    pub fn start_search_indexing(&self) {
        build_index_async(self.search().clone(), self.pool().clone());
    }
}
