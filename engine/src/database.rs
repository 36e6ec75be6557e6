//! In-memory document database.
//!
//! Deterministic container mirroring the remote store's semantics:
//! collections spring into existence on first insert, deletes are idempotent,
//! and server-timestamp sentinels resolve against the clock the caller
//! supplies. Ordered reads break ties on a per-collection insertion sequence
//! so equal sort keys keep a stable order.

use crate::document::{CollectionPath, Document, WriteDoc};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    data: Value,
    seq: u64,
}

/// A collection of documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    documents: HashMap<DocumentId, StoredDocument>,
    next_seq: u64,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a document by ID.
    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents
            .get(id)
            .map(|stored| Document::new(id, stored.data.clone()))
    }

    /// Check if a document exists.
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Count of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the collection has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn insert(&mut self, id: DocumentId, data: Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.documents.insert(id, StoredDocument { data, seq });
    }
}

/// The full document database: collections keyed by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    collections: HashMap<CollectionPath, Collection>,
}

impl Database {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new document. The collection is created implicitly.
    ///
    /// Sentinels in `doc` resolve against `now` (the backend clock).
    pub fn insert(
        &mut self,
        path: &CollectionPath,
        id: impl Into<DocumentId>,
        doc: &WriteDoc,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        let id = id.into();
        let collection = self.collections.entry(path.clone()).or_default();

        if collection.contains(&id) {
            return Err(Error::DocumentExists(id));
        }

        let mut data = Value::Object(serde_json::Map::new());
        doc.apply_to(&mut data, now)?;
        collection.insert(id.clone(), data.clone());

        Ok(Document::new(id, data))
    }

    /// Patch an existing document. Fields not named in `patch` are kept.
    ///
    /// The patch applies atomically: on error nothing changes.
    pub fn update(
        &mut self,
        path: &CollectionPath,
        id: &str,
        patch: &WriteDoc,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        let stored = self
            .collections
            .get_mut(path)
            .and_then(|collection| collection.documents.get_mut(id))
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let mut data = stored.data.clone();
        patch.apply_to(&mut data, now)?;
        stored.data = data.clone();

        Ok(Document::new(id, data))
    }

    /// Remove a document. Idempotent like the remote store's delete;
    /// returns whether anything was removed.
    pub fn remove(&mut self, path: &CollectionPath, id: &str) -> bool {
        self.collections
            .get_mut(path)
            .and_then(|collection| collection.documents.remove(id))
            .is_some()
    }

    /// Get a document by path and ID.
    pub fn get(&self, path: &CollectionPath, id: &str) -> Option<Document> {
        self.collections.get(path).and_then(|c| c.get(id))
    }

    /// Get a collection by path.
    pub fn collection(&self, path: &CollectionPath) -> Option<&Collection> {
        self.collections.get(path)
    }

    /// Count of documents in a collection.
    pub fn count(&self, path: &CollectionPath) -> usize {
        self.collections.get(path).map(Collection::len).unwrap_or(0)
    }

    /// Run a query: filter, then order (ties and unordered reads keep
    /// insertion order). A missing collection reads as empty.
    pub fn execute(&self, query: &Query) -> Vec<Document> {
        let Some(collection) = self.collections.get(&query.path) else {
            return Vec::new();
        };

        let mut matched: Vec<(Document, u64)> = collection
            .documents
            .iter()
            .map(|(id, stored)| (Document::new(id.clone(), stored.data.clone()), stored.seq))
            .filter(|(doc, _)| query.matches(doc))
            .collect();

        match &query.order_by {
            Some(order) => {
                matched.sort_by(|(a, sa), (b, sb)| order.compare(a, b).then(sa.cmp(sb)));
            }
            None => matched.sort_by_key(|(_, seq)| *seq),
        }

        matched.into_iter().map(|(doc, _)| doc).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes_path() -> CollectionPath {
        CollectionPath::root("notes")
    }

    fn note_doc(owner: &str, title: &str, updated_at: i64) -> WriteDoc {
        WriteDoc::new()
            .set("userId", owner)
            .set("title", title)
            .set("updatedAt", updated_at)
    }

    #[test]
    fn insert_and_get() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "Rounds", 1000), now)
            .unwrap();

        let doc = db.get(&notes_path(), "n-1").unwrap();
        assert_eq!(doc.data["title"], json!("Rounds"));
        assert_eq!(db.count(&notes_path()), 1);
    }

    #[test]
    fn insert_duplicate_rejected() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "A", 1), now)
            .unwrap();
        let result = db.insert(&notes_path(), "n-1", &note_doc("u-1", "B", 2), now);

        assert!(matches!(result, Err(Error::DocumentExists(_))));
    }

    #[test]
    fn insert_resolves_server_timestamps() {
        let mut db = Database::new();
        let now = Utc::now();

        let doc = WriteDoc::new()
            .set("title", "Untitled Note")
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");
        let stored = db.insert(&notes_path(), "n-1", &doc, now).unwrap();

        let millis = json!(crate::time::to_millis(now));
        assert_eq!(stored.data["createdAt"], millis);
        assert_eq!(stored.data["updatedAt"], millis);
    }

    #[test]
    fn update_patches_and_keeps_rest() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "Rounds", 1000), now)
            .unwrap();
        db.update(
            &notes_path(),
            "n-1",
            &WriteDoc::new().set("title", "Rounds v2"),
            now,
        )
        .unwrap();

        let doc = db.get(&notes_path(), "n-1").unwrap();
        assert_eq!(doc.data["title"], json!("Rounds v2"));
        assert_eq!(doc.data["userId"], json!("u-1"));
    }

    #[test]
    fn update_missing_document() {
        let mut db = Database::new();
        let result = db.update(
            &notes_path(),
            "ghost",
            &WriteDoc::new().set("title", "x"),
            Utc::now(),
        );

        assert!(matches!(result, Err(Error::DocumentNotFound(_))));
    }

    #[test]
    fn update_is_atomic_on_error() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(
            &notes_path(),
            "n-1",
            &WriteDoc::new().set("content", "A").set("tags", "oops"),
            now,
        )
        .unwrap();

        // "content" applies before "tags" fails; neither may stick.
        let patch = WriteDoc::new()
            .set("content", "B")
            .array_union("tags", vec![json!("x")]);
        assert!(db.update(&notes_path(), "n-1", &patch, now).is_err());

        let doc = db.get(&notes_path(), "n-1").unwrap();
        assert_eq!(doc.data["content"], json!("A"));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "A", 1), now)
            .unwrap();

        assert!(db.remove(&notes_path(), "n-1"));
        assert!(!db.remove(&notes_path(), "n-1"));
        assert!(!db.remove(&notes_path(), "never-existed"));
    }

    #[test]
    fn execute_filters_by_owner() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "Mine", 1), now)
            .unwrap();
        db.insert(&notes_path(), "n-2", &note_doc("u-2", "Theirs", 2), now)
            .unwrap();

        let query = Query::collection(notes_path()).where_field_eq("userId", "u-1");
        let docs = db.execute(&query);

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "n-1");
    }

    #[test]
    fn execute_ordered_with_stable_ties() {
        let mut db = Database::new();
        let now = Utc::now();
        let messages = CollectionPath::root("conversations").child("c-1", "messages");

        // Two messages share a timestamp; insertion order must hold.
        for (id, ts) in [("m-1", 100), ("m-2", 50), ("m-3", 100)] {
            db.insert(
                &messages,
                id,
                &WriteDoc::new().set("timestamp", ts),
                now,
            )
            .unwrap();
        }

        let query = Query::collection(messages).order_by_asc("timestamp");
        let ids: Vec<_> = db.execute(&query).into_iter().map(|d| d.id).collect();

        assert_eq!(ids, vec!["m-2", "m-1", "m-3"]);
    }

    #[test]
    fn execute_unordered_keeps_insertion_order() {
        let mut db = Database::new();
        let now = Utc::now();

        for id in ["p-1", "p-2", "p-3"] {
            db.insert(&CollectionPath::root("patients"), id, &note_doc("u-1", id, 1), now)
                .unwrap();
        }

        let query = Query::collection(CollectionPath::root("patients"));
        let ids: Vec<_> = db.execute(&query).into_iter().map(|d| d.id).collect();

        assert_eq!(ids, vec!["p-1", "p-2", "p-3"]);
    }

    #[test]
    fn execute_missing_collection_reads_empty() {
        let db = Database::new();
        let query = Query::collection(CollectionPath::root("nowhere"));
        assert!(db.execute(&query).is_empty());
    }

    #[test]
    fn database_serialization() {
        let mut db = Database::new();
        let now = Utc::now();

        db.insert(&notes_path(), "n-1", &note_doc("u-1", "A", 1), now)
            .unwrap();

        let json = serde_json::to_string(&db).unwrap();
        let restored: Database = serde_json::from_str(&json).unwrap();

        assert!(restored.get(&notes_path(), "n-1").is_some());
        assert_eq!(restored.count(&notes_path()), 1);
    }
}
