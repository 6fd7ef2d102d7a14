//! Data model for Skype exports and their cleaned representation.
//!
//! An export document stays an opaque [`serde_json::Value`] until the
//! validator accepts it; the typed structs here are the view the transform
//! step deserializes afterwards. Unknown fields are ignored on purpose:
//! exports carry plenty of metadata the pipeline does not need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view of a Skype export document.
#[derive(Debug, Clone, Deserialize)]
pub struct SkypeExport {
    /// The exporting user's Skype id
    #[serde(rename = "userId")]
    pub user_id: String,

    /// When the export was produced (RFC 3339)
    #[serde(rename = "exportDate")]
    pub export_date: Option<String>,

    /// All conversations in the export
    #[serde(default)]
    pub conversations: Vec<SkypeConversation>,
}

/// One conversation and its messages.
#[derive(Debug, Clone, Deserialize)]
pub struct SkypeConversation {
    /// Thread id, e.g. `19:...@thread.skype`
    pub id: Option<String>,

    /// Human-readable conversation name, when Skype knows one
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,

    /// The conversation's messages
    #[serde(rename = "MessageList", default)]
    pub message_list: Vec<SkypeMessage>,
}

/// One raw message as Skype exports it.
#[derive(Debug, Clone, Deserialize)]
pub struct SkypeMessage {
    /// Message id (a decimal string in exports)
    pub id: Option<String>,

    /// Sender display name; absent for the exporting user's own messages
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,

    /// Sender id
    pub from: Option<String>,

    /// Arrival timestamp (RFC 3339)
    #[serde(rename = "originalarrivaltime")]
    pub original_arrival_time: Option<String>,

    /// Raw message type, e.g. `RichText` or `RichText/UriObject`
    #[serde(rename = "messagetype", default)]
    pub message_type: String,

    /// Message body (may be empty for media/event messages)
    #[serde(default)]
    pub content: String,
}

/// The verbatim payload persisted by the raw insert, plus the identifying
/// fields pulled out of it.
#[derive(Debug, Clone)]
pub struct RawExport {
    /// The exporting user's id
    pub user_id: String,

    /// Export creation time, when parseable
    pub export_date: Option<DateTime<Utc>>,

    /// The full untransformed document, stored as JSONB
    pub document: Value,
}

/// One cleaned message row, referencing the raw export it came from.
///
/// The raw `messagetype` is kept alongside its human-readable description so
/// the cleaned table is useful without the description table at hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedMessage {
    /// Conversation thread id
    pub conversation_id: String,

    /// Conversation display name, if any
    pub conversation_display_name: Option<String>,

    /// Sender id
    pub sender_id: Option<String>,

    /// Sender display name, if any
    pub sender_display_name: Option<String>,

    /// Arrival time, when parseable
    pub sent_at: Option<DateTime<Utc>>,

    /// Raw message type
    pub message_type: String,

    /// Human-readable description of the message type
    pub type_description: String,

    /// Message body
    pub content: String,
}

/// Result of one committed Load invocation.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Id of the stored raw export row
    pub raw_export_id: i64,

    /// Ids of the stored cleaned message rows, in insertion order
    pub message_ids: Vec<i64>,

    /// The SQL statements executed, in order
    pub statements: Vec<&'static str>,
}

impl LoadOutcome {
    /// Number of cleaned messages stored.
    pub fn message_count(&self) -> usize {
        self.message_ids.len()
    }
}
