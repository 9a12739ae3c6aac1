//! Cache management commands.
//!
//! # Environment Variables
//!
//! - `TECO_BROKER_URL` - Base URL of the message broker REST API
//! - `TECO_BROKER_QUEUE` - Cache management queue
//! - `TECO_BROKER_USERNAME` / `TECO_BROKER_PASSWORD` - Broker basic auth

use thiserror::Error;

use teco_platform::config::{BrokerConfig, ConfigError};
use teco_platform::messaging::{
    CacheManagementMessage, CacheManagementProducer, MessageReceipt, ProducerError,
};

/// Errors that can occur while sending cache messages.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Message broker is not configured: set TECO_BROKER_URL")]
    NotConfigured,

    #[error(transparent)]
    Producer(#[from] ProducerError),
}

/// Ask cache servers to flush, optionally limited to one region.
///
/// # Errors
///
/// Returns an error if the broker is not configured or rejects the message.
pub async fn flush(region: Option<String>) -> Result<MessageReceipt, CacheError> {
    dotenvy::dotenv().ok();

    let config = BrokerConfig::from_env()?.ok_or(CacheError::NotConfigured)?;
    let producer = CacheManagementProducer::new(&config)?;

    let receipt = match region {
        Some(region) => {
            producer
                .send(&CacheManagementMessage::FlushRegion { region })
                .await?
        }
        None => producer.generate_messages().await?,
    };

    tracing::info!(
        message_id = %receipt.message_id,
        queue = %receipt.queue,
        "Cache flush message sent"
    );
    Ok(receipt)
}
