//! Cache management message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Instruction sent to the cache servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheManagementMessage {
    /// Drop every cached entry.
    FlushAll,
    /// Drop the entries of one cache region.
    FlushRegion { region: String },
}

/// Message body as posted to the broker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Envelope<'a> {
    pub message_id: Uuid,
    pub sent_at: DateTime<Utc>,
    #[serde(flatten)]
    pub message: &'a CacheManagementMessage,
}

/// Acknowledgement that the broker accepted a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub message_id: Uuid,
    pub queue: String,
    /// HTTP status returned by the broker.
    pub status: u16,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_value(CacheManagementMessage::FlushAll).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "FLUSH_ALL" }));

        let json = serde_json::to_value(CacheManagementMessage::FlushRegion {
            region: "catalog".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "action": "FLUSH_REGION", "region": "catalog" })
        );
    }

    #[test]
    fn test_envelope_flattens_message() {
        let message = CacheManagementMessage::FlushAll;
        let envelope = Envelope {
            message_id: Uuid::nil(),
            sent_at: DateTime::<Utc>::UNIX_EPOCH,
            message: &message,
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["action"], "FLUSH_ALL");
        assert_eq!(json["messageId"], Uuid::nil().to_string());
        assert!(json.get("sentAt").is_some());
    }
}
