//! Export format adapters
//!
//! Chat exports come from external tools with their own JSON layouts. Each
//! layout is handled by one [`ExportFormat`] that turns the parsed document
//! into [`RawRecord`]s; everything downstream only sees raw records.
//!
//! Structural problems (a chat that is not an object, a message list that is
//! not an array) fail the whole document with
//! [`ChatHistoryError::MalformedInput`]. Missing fields inside a record are
//! left for the importer to count.

use serde_json::{Map, Value};

use crate::config::ImportConfig;
use crate::error::{ChatHistoryError, Result};
use crate::models::RawRecord;
use crate::validation::InputValidator;

const SENDER_KEYS: &[&str] = &["sender", "from", "author", "name"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "date", "time", "datetime"];
const TEXT_KEYS: &[&str] = &["text", "body", "message", "content"];
const MEDIA_KEYS: &[&str] = &["media", "attachment", "media_type"];
const FROM_ME_KEYS: &[&str] = &["fromMe", "from_me", "is_from_me"];
const CHAT_KEYS: &[&str] = &["chat", "chat_name", "conversation"];

/// WhatsApp message types that carry an attachment
const WHATSAPP_MEDIA_KINDS: &[&str] = &["image", "video", "audio", "ptt", "document", "sticker", "gif"];

/// A chat export layout
pub trait ExportFormat {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether the document has this layout
    fn matches(&self, document: &Value) -> bool;

    /// Flatten the document into raw records, in document order
    fn records(&self, document: &Value) -> Result<Vec<RawRecord>>;
}

/// Parse an export document; invalid UTF-8 counts as malformed JSON
pub fn parse_document(contents: &[u8]) -> Result<Value> {
    serde_json::from_slice(contents).map_err(|e| ChatHistoryError::MalformedInput(format!("invalid JSON: {e}")))
}

/// Pick the adapter for a document
pub fn detect_format(document: &Value, config: &ImportConfig) -> Result<Box<dyn ExportFormat>> {
    let candidates: Vec<Box<dyn ExportFormat>> = vec![
        Box::new(WhatsAppExport::new(config)),
        Box::new(FlatListExport::new(config)),
        Box::new(KeyedMapExport::new(config)),
    ];

    candidates
        .into_iter()
        .find(|format| format.matches(document))
        .ok_or_else(|| {
            ChatHistoryError::MalformedInput(
                "unrecognized export structure: expected a 'chats' array, a list of records, or an object of chat names to record lists"
                    .to_string(),
            )
        })
}

/// Export with a top-level `chats` array, as written by WhatsApp viewers.
///
/// ```json
/// { "chats": [ { "contactName": "Ana", "key": "123@s.whatsapp.net",
///                "messages": [ { "type": "text", "text": "hi",
///                                "timestamp": "2024-02-02T15:04:05Z",
///                                "fromMe": false } ] } ] }
/// ```
pub struct WhatsAppExport {
    self_name: String,
    unknown_sender: String,
}

impl WhatsAppExport {
    /// Build the adapter with the configured sender names
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            self_name: config.self_name.clone(),
            unknown_sender: config.unknown_sender.clone(),
        }
    }

    fn resolve_sender(&self, from_me: bool, display_name: Option<&str>) -> String {
        if from_me {
            return self.self_name.clone();
        }

        match display_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) if name.contains("@s.whatsapp.net") => "Them".to_string(),
            Some(name) => name.split_whitespace().next().unwrap_or(name).to_string(),
            None => self.unknown_sender.clone(),
        }
    }
}

impl ExportFormat for WhatsAppExport {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    fn matches(&self, document: &Value) -> bool {
        document.get("chats").and_then(Value::as_array).is_some_and(|chats| {
            chats.iter().all(|chat| {
                chat.as_object()
                    .is_some_and(|chat| chat.contains_key("messages") || chat.contains_key("contactName"))
            })
        })
    }

    fn records(&self, document: &Value) -> Result<Vec<RawRecord>> {
        let chats = document
            .get("chats")
            .and_then(Value::as_array)
            .ok_or_else(|| ChatHistoryError::MalformedInput("'chats' must be an array".to_string()))?;

        let mut records = Vec::new();
        for (chat_index, chat) in chats.iter().enumerate() {
            let chat = chat
                .as_object()
                .ok_or_else(|| ChatHistoryError::MalformedInput(format!("chat {chat_index} is not an object")))?;

            let contact_name = chat.get("contactName").and_then(Value::as_str).and_then(InputValidator::clean_name);
            let is_group = chat.get("key").and_then(Value::as_str).is_some_and(|key| key.ends_with("@g.us"));

            for (message_index, message) in record_list(chat.get("messages"), chat_index)?.iter().enumerate() {
                let message = message.as_object().ok_or_else(|| {
                    ChatHistoryError::MalformedInput(format!("message {message_index} of chat {chat_index} is not an object"))
                })?;

                let from_me = message.get("fromMe").and_then(Value::as_bool).unwrap_or(false);
                let kind = message.get("type").and_then(Value::as_str).unwrap_or("text");
                let display_name = if is_group {
                    message.get("remoteResourceDisplayName").and_then(Value::as_str)
                } else {
                    contact_name.as_deref()
                };

                let is_media = WHATSAPP_MEDIA_KINDS.contains(&kind);
                records.push(RawRecord {
                    chat_name: contact_name.clone(),
                    sender: Some(self.resolve_sender(from_me, display_name)),
                    from_me,
                    timestamp: message.get("timestamp").cloned(),
                    text: message.get("text").and_then(text_value),
                    media: is_media.then(|| kind.to_string()),
                    unsupported_kind: (kind != "text" && !is_media).then(|| kind.to_string()),
                });
            }
        }

        Ok(records)
    }
}

/// Object mapping chat names to record arrays:
/// `{ "Ana": [ { "sender": "Ana", "timestamp": "...", "text": "hi" } ] }`
pub struct KeyedMapExport {
    fields: RecordFields,
}

impl KeyedMapExport {
    /// Build the adapter with the configured sender names
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self { fields: RecordFields::new(config) }
    }
}

impl ExportFormat for KeyedMapExport {
    fn name(&self) -> &'static str {
        "keyed-map"
    }

    fn matches(&self, document: &Value) -> bool {
        document.as_object().is_some_and(|chats| chats.values().all(Value::is_array))
    }

    fn records(&self, document: &Value) -> Result<Vec<RawRecord>> {
        let chats = document
            .as_object()
            .ok_or_else(|| ChatHistoryError::MalformedInput("expected an object of chat names".to_string()))?;

        let mut records = Vec::new();
        for (chat_index, (chat_name, entries)) in chats.iter().enumerate() {
            let chat_name = InputValidator::clean_name(chat_name);
            for (entry_index, entry) in record_list(Some(entries), chat_index)?.iter().enumerate() {
                let entry = entry.as_object().ok_or_else(|| {
                    ChatHistoryError::MalformedInput(format!("record {entry_index} of chat {chat_index} is not an object"))
                })?;
                records.push(self.fields.extract(entry, chat_name.clone()));
            }
        }

        Ok(records)
    }
}

/// Top-level array of records that each name their chat:
/// `[ { "chat": "Ana", "sender": "Ana", "timestamp": "...", "text": "hi" } ]`
pub struct FlatListExport {
    fields: RecordFields,
}

impl FlatListExport {
    /// Build the adapter with the configured sender names
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self { fields: RecordFields::new(config) }
    }
}

impl ExportFormat for FlatListExport {
    fn name(&self) -> &'static str {
        "flat-list"
    }

    fn matches(&self, document: &Value) -> bool {
        document.is_array()
    }

    fn records(&self, document: &Value) -> Result<Vec<RawRecord>> {
        let entries = document
            .as_array()
            .ok_or_else(|| ChatHistoryError::MalformedInput("expected a list of records".to_string()))?;

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let entry = entry
                    .as_object()
                    .ok_or_else(|| ChatHistoryError::MalformedInput(format!("record {index} is not an object")))?;
                let chat_name = find(entry, CHAT_KEYS).and_then(Value::as_str).and_then(InputValidator::clean_name);
                Ok(self.fields.extract(entry, chat_name))
            })
            .collect()
    }
}

/// Field extraction shared by the generic layouts
struct RecordFields {
    self_name: String,
    unknown_sender: String,
}

impl RecordFields {
    fn new(config: &ImportConfig) -> Self {
        Self {
            self_name: config.self_name.clone(),
            unknown_sender: config.unknown_sender.clone(),
        }
    }

    fn extract(&self, entry: &Map<String, Value>, chat_name: Option<String>) -> RawRecord {
        let from_me = find(entry, FROM_ME_KEYS).and_then(Value::as_bool).unwrap_or(false);
        let sender = find(entry, SENDER_KEYS)
            .and_then(Value::as_str)
            .and_then(InputValidator::clean_name)
            .unwrap_or_else(|| if from_me { self.self_name.clone() } else { self.unknown_sender.clone() });

        RawRecord {
            chat_name,
            sender: Some(sender),
            from_me,
            timestamp: find(entry, TIMESTAMP_KEYS).cloned(),
            text: find(entry, TEXT_KEYS).and_then(text_value),
            media: find(entry, MEDIA_KEYS).and_then(media_value),
            unsupported_kind: None,
        }
    }
}

fn record_list(value: Option<&Value>, chat_index: usize) -> Result<&[Value]> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(ChatHistoryError::MalformedInput(format!("messages of chat {chat_index} must be an array"))),
    }
}

fn find<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| entry.get(*key)).filter(|value| !value.is_null())
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn media_value(value: &Value) -> Option<String> {
    match value {
        Value::String(kind) if !kind.trim().is_empty() => Some(kind.trim().to_string()),
        Value::Bool(true) => Some("attachment".to_string()),
        Value::Object(media) => Some(
            media
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("attachment")
                .to_string(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ImportConfig {
        ImportConfig::default()
    }

    #[test]
    fn test_whatsapp_direct_chat_senders() {
        let doc = json!({
            "chats": [{
                "contactName": "Ana Maria Lopez",
                "key": "15551234567@s.whatsapp.net",
                "messages": [
                    {"type": "text", "text": "hola", "timestamp": "2024-02-02T10:00:00Z", "fromMe": false},
                    {"type": "text", "text": "hi", "timestamp": "2024-02-02T10:01:00Z", "fromMe": true}
                ]
            }]
        });

        let records = detect_format(&doc, &config()).unwrap().records(&doc).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sender.as_deref(), Some("Ana"));
        assert_eq!(records[0].chat_name.as_deref(), Some("Ana Maria Lopez"));
        assert_eq!(records[1].sender.as_deref(), Some("Me"));
        assert!(records[1].from_me);
    }

    #[test]
    fn test_whatsapp_group_uses_participant_name() {
        let doc = json!({
            "chats": [{
                "contactName": "Family",
                "key": "1203630@g.us",
                "messages": [
                    {"type": "text", "text": "a", "timestamp": "2024-02-02T10:00:00Z", "remoteResourceDisplayName": "Rosa Diaz"},
                    {"type": "text", "text": "b", "timestamp": "2024-02-02T10:00:00Z", "remoteResourceDisplayName": "15550001111@s.whatsapp.net"},
                    {"type": "text", "text": "c", "timestamp": "2024-02-02T10:00:00Z"}
                ]
            }]
        });

        let records = WhatsAppExport::new(&config()).records(&doc).unwrap();
        let senders: Vec<_> = records.iter().map(|r| r.sender.clone().unwrap()).collect();
        assert_eq!(senders, vec!["Rosa", "Them", "Unknown Sender"]);
    }

    #[test]
    fn test_whatsapp_media_message() {
        let doc = json!({
            "chats": [{
                "contactName": "Ana",
                "messages": [{"type": "image", "timestamp": "2024-02-02T10:00:00Z"}]
            }]
        });

        let records = WhatsAppExport::new(&config()).records(&doc).unwrap();
        assert_eq!(records[0].media.as_deref(), Some("image"));
        assert_eq!(records[0].text, None);
    }

    #[test]
    fn test_keyed_map_aliases() {
        let doc = json!({
            "Book club": [
                {"author": "Li", "date": 1_706_868_000, "body": "chapter 3?"},
                {"from_me": true, "time": "2024-02-02 10:05:00", "content": "yes", "attachment": true}
            ]
        });

        let format = detect_format(&doc, &config()).unwrap();
        assert_eq!(format.name(), "keyed-map");

        let records = format.records(&doc).unwrap();
        assert_eq!(records[0].sender.as_deref(), Some("Li"));
        assert_eq!(records[0].text.as_deref(), Some("chapter 3?"));
        assert_eq!(records[1].sender.as_deref(), Some("Me"));
        assert_eq!(records[1].media.as_deref(), Some("attachment"));
    }

    #[test]
    fn test_flat_list_reads_chat_field() {
        let doc = json!([{"chat": "Ana", "sender": "Ana", "timestamp": "2024-02-02T10:00:00Z", "text": "hi"}]);

        let format = detect_format(&doc, &config()).unwrap();
        assert_eq!(format.name(), "flat-list");
        assert_eq!(format.records(&doc).unwrap()[0].chat_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_unrecognized_structure() {
        for doc in [json!("just a string"), json!({"Ana": "not a list"}), json!(42)] {
            assert!(matches!(
                detect_format(&doc, &config()),
                Err(ChatHistoryError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn test_whatsapp_system_entries_are_flagged() {
        let doc = json!({
            "chats": [{
                "contactName": "Ana",
                "messages": [
                    {"type": "revoked", "timestamp": "2024-02-02T10:00:00Z"},
                    {"type": "call_log", "timestamp": "2024-02-02T10:01:00Z"},
                    {"type": "ptt", "timestamp": "2024-02-02T10:02:00Z"}
                ]
            }]
        });

        let records = WhatsAppExport::new(&config()).records(&doc).unwrap();
        assert_eq!(records[0].unsupported_kind.as_deref(), Some("revoked"));
        assert_eq!(records[0].media, None);
        assert_eq!(records[1].unsupported_kind.as_deref(), Some("call_log"));
        assert_eq!(records[2].media.as_deref(), Some("ptt"));
        assert_eq!(records[2].unsupported_kind, None);
    }

    #[test]
    fn test_chat_named_chats_is_keyed_map() {
        let doc = json!({
            "chats": [{"sender": "Li", "timestamp": "2024-02-02T10:00:00Z", "text": "hi"}],
            "Ana": []
        });

        let format = detect_format(&doc, &config()).unwrap();
        assert_eq!(format.name(), "keyed-map");
        assert_eq!(format.records(&doc).unwrap()[0].chat_name.as_deref(), Some("chats"));
    }

    #[test]
    fn test_chats_must_be_array() {
        let doc = json!({"chats": {"Ana": []}});
        assert!(!WhatsAppExport::new(&config()).matches(&doc));
        assert!(matches!(detect_format(&doc, &config()), Err(ChatHistoryError::MalformedInput(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_document(b"{ not json"), Err(ChatHistoryError::MalformedInput(_))));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        assert!(matches!(
            parse_document(b"{\"chats\": [\xff\xfe]}"),
            Err(ChatHistoryError::MalformedInput(_))
        ));
    }
}
