//! Cache administration handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::messaging::{CacheManagementMessage, MessageReceipt};
use crate::state::AppState;

/// Cache flush query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct FlushQuery {
    /// Only flush this region; everything is flushed when absent.
    pub region: Option<String>,
}

impl FlushQuery {
    fn message(&self) -> CacheManagementMessage {
        match self.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(region) => CacheManagementMessage::FlushRegion {
                region: region.to_string(),
            },
            None => CacheManagementMessage::FlushAll,
        }
    }
}

/// Ask the cache servers to flush.
#[instrument(skip(state))]
pub async fn flush(
    State(state): State<AppState>,
    Query(query): Query<FlushQuery>,
) -> Result<(StatusCode, Json<MessageReceipt>)> {
    let producer = state.producer().ok_or_else(|| {
        AppError::ServiceUnavailable("message broker is not configured".to_string())
    })?;

    let receipt = producer.send(&query.message()).await?;
    info!(message_id = %receipt.message_id, queue = %receipt.queue, "Cache flush requested");

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_query_message() {
        assert_eq!(
            FlushQuery::default().message(),
            CacheManagementMessage::FlushAll
        );
        assert_eq!(
            FlushQuery {
                region: Some("  ".to_string())
            }
            .message(),
            CacheManagementMessage::FlushAll
        );
        assert_eq!(
            FlushQuery {
                region: Some("catalog".to_string())
            }
            .message(),
            CacheManagementMessage::FlushRegion {
                region: "catalog".to_string()
            }
        );
    }
}
