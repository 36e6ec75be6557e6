//! Conversation entity: one AI chat thread.

use crate::document::{CollectionPath, Document, WriteDoc};
use crate::entity::Entity;
use crate::query::Query;
use crate::{time, DocumentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root collection name.
pub const COLLECTION: &str = "conversations";

/// Title given to newly created conversations.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Lifecycle status of a conversation. Archiving is a status transition,
/// never a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

impl ConversationStatus {
    /// Wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
        }
    }

    fn decode(value: Option<&str>) -> Self {
        match value {
            Some("archived") => ConversationStatus::Archived,
            _ => ConversationStatus::Active,
        }
    }
}

/// Denormalized preview of the latest message, when the backend keeps one.
/// Decode-only: nothing in this layer writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: UserId,
}

/// An AI chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: DocumentId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participant_ids: Vec<UserId>,
    pub status: ConversationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
}

impl Conversation {
    /// Write payload for a new conversation.
    pub fn create_doc(owner: &UserId) -> WriteDoc {
        WriteDoc::new()
            .set("title", DEFAULT_TITLE)
            .set("participantIds", vec![Value::from(owner.clone())])
            .set("status", ConversationStatus::Active.as_str())
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt")
    }

    /// Write payload for archiving.
    pub fn archive_doc() -> WriteDoc {
        WriteDoc::new()
            .set("status", ConversationStatus::Archived.as_str())
            .server_timestamp("updatedAt")
    }

    /// Write payload for renaming.
    pub fn rename_doc(title: &str) -> WriteDoc {
        WriteDoc::new()
            .set("title", title)
            .server_timestamp("updatedAt")
    }

    fn decode_last_message(doc: &Document, now: DateTime<Utc>) -> Option<LastMessage> {
        let map = doc.field("lastMessage")?.as_object()?;
        let str_of = |name: &str| {
            map.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Some(LastMessage {
            content: str_of("content"),
            timestamp: time::decode_time(map.get("timestamp"), now),
            sender_id: str_of("senderId"),
        })
    }
}

impl Entity for Conversation {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn collection() -> CollectionPath {
        CollectionPath::root(COLLECTION)
    }

    fn decode(doc: &Document, owner: &UserId, now: DateTime<Utc>) -> Self {
        let participant_ids = doc
            .array_field("participantIds")
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![owner.clone()]);

        Self {
            id: doc.id.clone(),
            title: doc.str_field_or("title", DEFAULT_TITLE),
            created_at: doc.time_field("createdAt", now),
            updated_at: doc.time_field("updatedAt", now),
            participant_ids,
            status: ConversationStatus::decode(doc.field("status").and_then(Value::as_str)),
            last_message: Self::decode_last_message(doc, now),
        }
    }

    fn query(owner: &UserId) -> Query {
        Query::collection(Self::collection()).where_array_contains("participantIds", owner.clone())
    }

    fn sort(items: &mut Vec<Self>) {
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}
