//! Messaging errors.

use thiserror::Error;

/// Errors returned when a message could not be handed to the broker.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The broker endpoint could not be built from the configuration.
    #[error("invalid broker endpoint: {0}")]
    InvalidEndpoint(String),

    /// The request never got a response (connection, timeout, TLS...).
    #[error("broker request failed: {0}")]
    Transport(String),

    /// The broker answered with a non-success status.
    #[error("broker rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
