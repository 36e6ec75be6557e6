//! Message entity: one turn of an AI chat session.
//!
//! Messages live in a per-conversation sub-collection and are ordered by the
//! backend, not locally. Their timestamps are client-clocked by design;
//! only the surrounding conversation carries server-clocked stamps.

use crate::document::{CollectionPath, Document, WriteDoc};
use crate::query::Query;
use crate::{time, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sub-collection name under a conversation.
pub const COLLECTION: &str = "messages";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
}

impl MessageKind {
    /// Wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Ai => "ai",
        }
    }

    fn decode(value: Option<&str>) -> Self {
        match value {
            Some("ai") => MessageKind::Ai,
            _ => MessageKind::User,
        }
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Error,
}

impl MessageStatus {
    /// Wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Error => "error",
        }
    }

    fn decode(value: Option<&str>) -> Self {
        match value {
            Some("delivered") => MessageStatus::Delivered,
            Some("error") => MessageStatus::Error,
            _ => MessageStatus::Sent,
        }
    }
}

/// Extra detail some writers attach. Decode-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

/// One turn of a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: DocumentId,
    pub conversation_id: DocumentId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Path to a conversation's message sub-collection.
    pub fn collection(conversation_id: &str) -> CollectionPath {
        CollectionPath::root(crate::conversation::COLLECTION).child(conversation_id, COLLECTION)
    }

    /// Backend-ordered query for a session's messages. Single-field order,
    /// so no composite index is needed.
    pub fn query(conversation_id: &str) -> Query {
        Query::collection(Self::collection(conversation_id)).order_by_asc("timestamp")
    }

    /// Write payload for one chat turn, stamped with the client clock.
    pub fn write_doc(
        conversation_id: &str,
        content: &str,
        kind: MessageKind,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> WriteDoc {
        WriteDoc::new()
            .set("conversationId", conversation_id)
            .set("content", content)
            .set("type", kind.as_str())
            .set("timestamp", time::to_millis(at))
            .set("status", status.as_str())
    }

    /// Decode a wire document. The store-assigned document id is canonical;
    /// an `id` field inside the body is ignored.
    pub fn decode(doc: &Document, now: DateTime<Utc>) -> Self {
        let metadata = doc
            .field("metadata")
            .and_then(|value| serde_json::from_value(value.clone()).ok());

        Self {
            id: doc.id.clone(),
            conversation_id: doc.str_field_or("conversationId", ""),
            content: doc.str_field_or("content", ""),
            kind: MessageKind::decode(doc.field("type").and_then(Value::as_str)),
            timestamp: doc.time_field("timestamp", now),
            status: MessageStatus::decode(doc.field("status").and_then(Value::as_str)),
            metadata,
        }
    }
}
