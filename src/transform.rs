//! Cleaning raw export documents into storable records.
//!
//! The transform step never mutates the raw document: it derives
//! [`CleanedMessage`] rows from it, replacing raw message type codes with the
//! human-readable descriptions configured in
//! [`Config::message_types`](crate::config::Config).

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SkypeloadError};
use crate::model::{CleanedMessage, RawExport, SkypeExport};

/// Description used when a message has no type at all.
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

/// Placeholder substituted into `default_message_format`.
const TYPE_PLACEHOLDER: &str = "{message_type}";

/// Returns the human-readable description for a raw message type.
///
/// Pure and total: unknown message types are expected, not exceptional. An
/// empty type yields [`UNKNOWN_MESSAGE_TYPE`]; a type absent from the table
/// is rendered through the configured default format.
///
/// # Example
///
/// ```rust
/// use skypeload::config::Config;
/// use skypeload::transform::describe_message_type;
///
/// let config = Config::default();
/// assert_eq!(
///     describe_message_type(&config, "RichText/Location"),
///     "***Sent a location***"
/// );
/// ```
pub fn describe_message_type(config: &Config, raw_type: &str) -> String {
    if raw_type.is_empty() {
        return UNKNOWN_MESSAGE_TYPE.to_string();
    }
    match config.message_types.get(raw_type) {
        Some(description) => description.clone(),
        None => config
            .default_message_format
            .replace(TYPE_PLACEHOLDER, raw_type),
    }
}

/// Converts a validated export document into the raw record and its cleaned
/// per-message rows.
///
/// `user_display_name`, when given, fills in the sender name on the
/// exporting user's own messages (Skype omits it there). Conversations
/// without an id are skipped with a warning; unparseable timestamps become
/// `None` rather than failing the load.
pub fn clean_export(
    config: &Config,
    document: Value,
    user_display_name: Option<&str>,
) -> Result<(RawExport, Vec<CleanedMessage>)> {
    let export: SkypeExport = serde_json::from_value(document.clone())
        .map_err(|err| SkypeloadError::schema("<export>", err.to_string()))?;

    let mut messages = Vec::new();
    for conversation in &export.conversations {
        let Some(conversation_id) = conversation.id.as_deref() else {
            warn!("skipping conversation without an id");
            continue;
        };
        for message in &conversation.message_list {
            let own_message = message.from.as_deref() == Some(export.user_id.as_str());
            let sender_display_name = message.display_name.clone().or_else(|| {
                own_message.then(|| user_display_name.map(str::to_string)).flatten()
            });

            messages.push(CleanedMessage {
                conversation_id: conversation_id.to_string(),
                conversation_display_name: conversation.display_name.clone(),
                sender_id: message.from.clone(),
                sender_display_name,
                sent_at: parse_timestamp(message.original_arrival_time.as_deref(), conversation_id),
                message_type: message.message_type.clone(),
                type_description: describe_message_type(config, &message.message_type),
                content: message.content.clone(),
            });
        }
    }

    debug!(
        conversations = export.conversations.len(),
        messages = messages.len(),
        "cleaned export"
    );

    let raw = RawExport {
        user_id: export.user_id,
        export_date: parse_timestamp(export.export_date.as_deref(), "exportDate"),
        document,
    };
    Ok((raw, messages))
}

fn parse_timestamp(raw: Option<&str>, context: &str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(err) => {
            warn!(timestamp = raw, context, error = %err, "unparseable timestamp, keeping NULL");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_known_type() {
        let config = Config::default();
        assert_eq!(
            describe_message_type(&config, "RichText/Location"),
            "***Sent a location***"
        );
        assert_eq!(
            describe_message_type(&config, "Event/Call"),
            "***A call started/ended***"
        );
    }

    #[test]
    fn test_describe_unknown_type_uses_default_format() {
        let config = Config::default();
        assert_eq!(
            describe_message_type(&config, "Totally/Unknown"),
            "***Sent a Totally/Unknown***"
        );
    }

    #[test]
    fn test_describe_empty_type() {
        let config = Config::default();
        assert_eq!(describe_message_type(&config, ""), "Unknown message type");
    }

    fn sample_document() -> Value {
        json!({
            "userId": "live:alice",
            "exportDate": "2023-06-01T12:00:00Z",
            "conversations": [
                {
                    "id": "19:abc@thread.skype",
                    "displayName": "Project chat",
                    "MessageList": [
                        {
                            "from": "live:bob",
                            "displayName": "Bob",
                            "originalarrivaltime": "2023-05-31T09:15:00.000Z",
                            "messagetype": "RichText",
                            "content": "hello"
                        },
                        {
                            "from": "live:alice",
                            "originalarrivaltime": "not a timestamp",
                            "messagetype": "RichText/Location",
                            "content": ""
                        }
                    ]
                },
                {
                    // no id: skipped, not fatal
                    "MessageList": [{"messagetype": "Poll"}]
                }
            ]
        })
    }

    #[test]
    fn test_clean_export() {
        let config = Config::default();
        let document = sample_document();
        let (raw, messages) = clean_export(&config, document.clone(), None).unwrap();

        assert_eq!(raw.user_id, "live:alice");
        assert!(raw.export_date.is_some());
        // raw document preserved verbatim
        assert_eq!(raw.document, document);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].conversation_id, "19:abc@thread.skype");
        assert_eq!(messages[0].sender_display_name.as_deref(), Some("Bob"));
        assert!(messages[0].sent_at.is_some());
        assert_eq!(messages[0].type_description, "***Sent a RichText***");

        // bad timestamp becomes None, known type gets its description
        assert!(messages[1].sent_at.is_none());
        assert_eq!(messages[1].type_description, "***Sent a location***");
    }

    #[test]
    fn test_clean_export_fills_own_display_name() {
        let config = Config::default();
        let (_, messages) =
            clean_export(&config, sample_document(), Some("Alice Example")).unwrap();

        // Bob's name is untouched, Alice's own message gets the provided name
        assert_eq!(messages[0].sender_display_name.as_deref(), Some("Bob"));
        assert_eq!(
            messages[1].sender_display_name.as_deref(),
            Some("Alice Example")
        );
    }

    #[test]
    fn test_clean_export_rejects_untyped_document() {
        let config = Config::default();
        let err = clean_export(&config, json!({"conversations": []}), None).unwrap_err();
        assert!(err.is_schema());
    }
}
