//! Phoenix-channel frames for the realtime endpoint.

use crate::RealtimeResult;
use serde::{Deserialize, Serialize};

/// Table the channel is filtered to.
const TABLE: &str = "bookmarks";

/// One Phoenix-channel frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Channel topic (e.g., `realtime:bookmarks:u1`).
    pub topic: String,
    /// Frame event (`phx_join`, `phx_reply`, `postgres_changes`, ...).
    pub event: String,
    /// Event payload.
    pub payload: serde_json::Value,
    /// Sender-assigned reference, echoed in replies.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

impl Frame {
    /// The topic used for a user's bookmark channel.
    pub fn bookmark_topic(user_id: &str) -> String {
        format!("realtime:{}:{}", TABLE, user_id)
    }

    /// Join frame opening a channel filtered server-side to one owner.
    pub fn join(user_id: &str, access_token: &str, reference: u64) -> Self {
        Self {
            topic: Self::bookmark_topic(user_id),
            event: "phx_join".to_string(),
            payload: serde_json::json!({
                "config": {
                    "postgres_changes": [{
                        "event": "*",
                        "schema": "public",
                        "table": TABLE,
                        "filter": format!("owner=eq.{}", user_id),
                    }],
                },
                "access_token": access_token,
            }),
            reference: Some(reference.to_string()),
        }
    }

    /// Leave frame releasing the channel.
    pub fn leave(user_id: &str, reference: u64) -> Self {
        Self {
            topic: Self::bookmark_topic(user_id),
            event: "phx_leave".to_string(),
            payload: serde_json::json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Keepalive frame on the reserved `phoenix` topic.
    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: serde_json::json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Whether this frame acknowledges the subscription.
    pub fn is_join_ack(&self, user_id: &str) -> bool {
        self.topic == Self::bookmark_topic(user_id)
            && self.event == "phx_reply"
            && self.payload.get("status").and_then(|s| s.as_str()) == Some("ok")
    }

    /// Whether this frame reports a row change on the subscribed table.
    pub fn is_change(&self) -> bool {
        self.event == "postgres_changes"
    }

    /// The change kind (`INSERT`/`UPDATE`/`DELETE`), for logging only.
    pub fn change_kind(&self) -> Option<&str> {
        self.payload
            .get("data")
            .and_then(|d| d.get("type"))
            .and_then(|t| t.as_str())
    }

    /// Serialize to the wire format.
    pub fn to_json(&self) -> RealtimeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the wire format.
    pub fn from_json(json: &str) -> RealtimeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
