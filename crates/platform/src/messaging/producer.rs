//! Cache management message producer.
//!
//! Messages are posted as JSON to the broker's REST message endpoint
//! (`{base}/api/message/{queue}?type=queue`).

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};
use url::Url;
use uuid::Uuid;

use super::error::ProducerError;
use super::types::{CacheManagementMessage, Envelope, MessageReceipt};
use crate::config::BrokerConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends cache management messages to the broker queue.
#[derive(Clone)]
pub struct CacheManagementProducer {
    client: Client,
    endpoint: Url,
    queue: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl std::fmt::Debug for CacheManagementProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManagementProducer")
            .field("endpoint", &self.endpoint.as_str())
            .field("queue", &self.queue)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CacheManagementProducer {
    /// Create a producer for the configured broker and queue.
    ///
    /// # Errors
    ///
    /// Returns `ProducerError::InvalidEndpoint` if the queue is blank or the
    /// broker URL cannot carry a path.
    /// Returns `ProducerError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &BrokerConfig) -> Result<Self, ProducerError> {
        let endpoint = message_endpoint(&config.url, &config.queue)?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProducerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            queue: config.queue.trim().to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Queue the producer sends to.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Send a message and report whether the broker accepted it.
    ///
    /// # Errors
    ///
    /// Returns `ProducerError::Transport` if the broker cannot be reached.
    /// Returns `ProducerError::Rejected` if the broker answers with a non-2xx status.
    #[instrument(skip(self), fields(queue = %self.queue))]
    pub async fn send(
        &self,
        message: &CacheManagementMessage,
    ) -> Result<MessageReceipt, ProducerError> {
        let envelope = Envelope {
            message_id: Uuid::new_v4(),
            sent_at: Utc::now(),
            message,
        };
        debug!(message_id = %envelope.message_id, "Sending cache management message");

        let mut request = self.client.post(self.endpoint.clone()).json(&envelope);
        if let Some(username) = &self.username {
            request = request.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret().to_string()),
            );
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to reach message broker");
            ProducerError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Message broker rejected message");
            return Err(ProducerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(message_id = %envelope.message_id, status = status.as_u16(), "Message accepted");

        Ok(MessageReceipt {
            message_id: envelope.message_id,
            queue: self.queue.clone(),
            status: status.as_u16(),
            sent_at: envelope.sent_at,
        })
    }

    /// Ask every cache server to flush all entries.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send`].
    pub async fn generate_messages(&self) -> Result<MessageReceipt, ProducerError> {
        self.send(&CacheManagementMessage::FlushAll).await
    }
}

/// Build `{base}/api/message/{queue}?type=queue`.
fn message_endpoint(base: &Url, queue: &str) -> Result<Url, ProducerError> {
    let queue = queue.trim();
    if queue.is_empty() {
        return Err(ProducerError::InvalidEndpoint(
            "queue name is empty".to_string(),
        ));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProducerError::InvalidEndpoint(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["api", "message", queue]);
    url.query_pairs_mut().clear().append_pair("type", "queue");
    Ok(url)
}
