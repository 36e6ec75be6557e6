//! Note entity: free-form clinical notes.

use crate::document::{CollectionPath, Document, WriteDoc};
use crate::entity::Entity;
use crate::query::Query;
use crate::{DocumentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root collection name.
pub const COLLECTION: &str = "notes";

/// Title given to newly created notes.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// A free-form note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: DocumentId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Write payload for a new note: default title, empty content.
    pub fn create_doc(owner: &UserId) -> WriteDoc {
        WriteDoc::new()
            .set("title", DEFAULT_TITLE)
            .set("content", "")
            .set("userId", owner.clone())
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt")
    }

    /// Partial update: only provided fields are written, plus a refreshed
    /// server `updatedAt`.
    pub fn update_doc(title: Option<&str>, content: Option<&str>) -> WriteDoc {
        let mut doc = WriteDoc::new().server_timestamp("updatedAt");
        if let Some(title) = title {
            doc = doc.set("title", title);
        }
        if let Some(content) = content {
            doc = doc.set("content", content);
        }
        doc
    }
}

impl Entity for Note {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn collection() -> CollectionPath {
        CollectionPath::root(COLLECTION)
    }

    fn decode(doc: &Document, owner: &UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: doc.id.clone(),
            user_id: doc.str_field_or("userId", owner),
            title: doc.str_field_or("title", ""),
            content: doc.str_field_or("content", ""),
            created_at: doc.time_field("createdAt", now),
            updated_at: doc.time_field("updatedAt", now),
        }
    }

    fn query(owner: &UserId) -> Query {
        Query::collection(Self::collection()).where_field_eq("userId", owner.clone())
    }

    fn sort(items: &mut Vec<Self>) {
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}
