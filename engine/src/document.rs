//! Wire documents and write payloads.
//!
//! A [`Document`] is what a snapshot delivers: an opaque id plus a JSON body.
//! A [`WriteDoc`] is what a mutation sends: named fields where each value is
//! either a literal, a server-timestamp sentinel resolved by the backend at
//! commit time, or an array-union appended atomically.

use crate::error::{Error, Result};
use crate::{time, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Path to a collection of documents.
///
/// Paths have an odd number of non-empty segments: a root collection
/// (`"notes"`) or a sub-collection under a document
/// (`"conversations/{id}/messages"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Path to a root collection. The name must be a single segment.
    pub fn root(name: &str) -> Self {
        debug_assert!(!name.is_empty() && !name.contains('/'));
        Self(name.to_string())
    }

    /// Path to a sub-collection under a document of this collection.
    pub fn child(&self, doc_id: &str, name: &str) -> Self {
        debug_assert!(!doc_id.is_empty() && !doc_id.contains('/'));
        debug_assert!(!name.is_empty() && !name.contains('/'));
        Self(format!("{}/{}/{}", self.0, doc_id, name))
    }

    /// Parse and validate an externally supplied path.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() % 2 == 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// The path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments.
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as delivered by a snapshot: store-assigned id plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Store-assigned identifier. Canonical even when the body carries
    /// its own `id` field.
    pub id: DocumentId,
    /// Raw JSON body.
    pub data: Value,
}

impl Document {
    /// Create a document from an id and a JSON body.
    pub fn new(id: impl Into<DocumentId>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Get a body field. `None` when the body is not an object.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_object().and_then(|map| map.get(name))
    }

    /// Get a string field, or `default` when it is missing, not a string,
    /// or empty. Empty counts as missing so decoded defaults match what
    /// the writers produce.
    pub fn str_field_or(&self, name: &str, default: &str) -> String {
        match self.field(name).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default.to_string(),
        }
    }

    /// Get a wire timestamp field, falling back to `now`.
    pub fn time_field(&self, name: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        time::decode_time(self.field(name), now)
    }

    /// Get an array field, if present and actually an array.
    pub fn array_field(&self, name: &str) -> Option<&Vec<Value>> {
        self.field(name).and_then(Value::as_array)
    }
}

/// One field of a write payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum WriteField {
    /// A literal JSON value.
    Literal(Value),
    /// Resolved to the backend's clock at commit time.
    ServerTimestamp,
    /// Values appended to an array field, skipping ones already present.
    ArrayUnion(Vec<Value>),
}

/// A write payload: ordered field map with sentinel support.
///
/// Field order is deterministic (BTreeMap) so serialized writes are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDoc {
    fields: BTreeMap<String, WriteField>,
}

impl WriteDoc {
    /// Create an empty write payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a literal value.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields
            .insert(name.to_string(), WriteField::Literal(value.into()));
        self
    }

    /// Set a field to the server-timestamp sentinel.
    pub fn server_timestamp(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), WriteField::ServerTimestamp);
        self
    }

    /// Append values to an array field atomically.
    pub fn array_union(mut self, name: &str, values: Vec<Value>) -> Self {
        self.fields
            .insert(name.to_string(), WriteField::ArrayUnion(values));
        self
    }

    /// Get a field of the payload.
    pub fn get(&self, name: &str) -> Option<&WriteField> {
        self.fields.get(name)
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &WriteField)> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply this payload to a document body, resolving sentinels against
    /// the backend clock `now`.
    pub fn apply_to(&self, target: &mut Value, now: DateTime<Utc>) -> Result<()> {
        let map = target.as_object_mut().ok_or(Error::NotAnObject)?;

        for (name, field) in &self.fields {
            match field {
                WriteField::Literal(value) => {
                    map.insert(name.clone(), value.clone());
                }
                WriteField::ServerTimestamp => {
                    map.insert(name.clone(), Value::from(time::to_millis(now)));
                }
                WriteField::ArrayUnion(values) => {
                    let entry = map
                        .entry(name.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    let array = entry
                        .as_array_mut()
                        .ok_or_else(|| Error::FieldNotArray(name.clone()))?;
                    for value in values {
                        if !array.contains(value) {
                            array.push(value.clone());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_and_child_paths() {
        let conversations = CollectionPath::root("conversations");
        assert_eq!(conversations.as_str(), "conversations");
        assert_eq!(conversations.depth(), 1);

        let messages = conversations.child("conv-1", "messages");
        assert_eq!(messages.as_str(), "conversations/conv-1/messages");
        assert_eq!(messages.depth(), 3);
    }

    #[test]
    fn parse_rejects_even_or_empty_segments() {
        assert!(CollectionPath::parse("notes").is_ok());
        assert!(CollectionPath::parse("conversations/c1/messages").is_ok());

        assert!(matches!(
            CollectionPath::parse("conversations/c1"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            CollectionPath::parse("notes//messages"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            CollectionPath::parse(""),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn document_field_accessors() {
        let doc = Document::new(
            "n-1",
            json!({"title": "Rounds", "content": "", "count": 3}),
        );

        assert_eq!(doc.str_field_or("title", "Untitled"), "Rounds");
        // Empty counts as missing
        assert_eq!(doc.str_field_or("content", "fallback"), "fallback");
        assert_eq!(doc.str_field_or("missing", "fallback"), "fallback");
        // Wrong type falls back too
        assert_eq!(doc.str_field_or("count", "fallback"), "fallback");
    }

    #[test]
    fn document_non_object_body() {
        let doc = Document::new("n-1", json!("just a string"));
        assert!(doc.field("title").is_none());
        assert_eq!(doc.str_field_or("title", "Untitled"), "Untitled");
    }

    #[test]
    fn apply_literal_and_server_timestamp() {
        let now = Utc::now();
        let patch = WriteDoc::new()
            .set("roomNumber", "ICU-1")
            .server_timestamp("updatedAt");

        let mut body = json!({"roomNumber": "901-2", "name": "A."});
        patch.apply_to(&mut body, now).unwrap();

        assert_eq!(body["roomNumber"], json!("ICU-1"));
        assert_eq!(body["updatedAt"], json!(crate::time::to_millis(now)));
        assert_eq!(body["name"], json!("A."));
    }

    #[test]
    fn apply_array_union_creates_and_appends() {
        let now = Utc::now();
        let first = WriteDoc::new().array_union("notes", vec![json!({"id": "1"})]);
        let second = WriteDoc::new()
            .array_union("notes", vec![json!({"id": "1"}), json!({"id": "2"})]);

        let mut body = json!({});
        first.apply_to(&mut body, now).unwrap();
        assert_eq!(body["notes"], json!([{"id": "1"}]));

        // Values already present are skipped
        second.apply_to(&mut body, now).unwrap();
        assert_eq!(body["notes"], json!([{"id": "1"}, {"id": "2"}]));
    }

    #[test]
    fn apply_array_union_rejects_non_array() {
        let now = Utc::now();
        let patch = WriteDoc::new().array_union("notes", vec![json!("x")]);

        let mut body = json!({"notes": "not an array"});
        let result = patch.apply_to(&mut body, now);
        assert!(matches!(result, Err(Error::FieldNotArray(_))));
    }

    #[test]
    fn apply_rejects_non_object_target() {
        let now = Utc::now();
        let patch = WriteDoc::new().set("a", 1);

        let mut body = json!([1, 2, 3]);
        assert!(matches!(patch.apply_to(&mut body, now), Err(Error::NotAnObject)));
    }

    #[test]
    fn write_doc_serialization() {
        let doc = WriteDoc::new()
            .set("title", "Untitled Note")
            .server_timestamp("createdAt")
            .array_union("tags", vec![json!("a")]);

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"type\":\"serverTimestamp\""));
        assert!(json.contains("\"type\":\"arrayUnion\""));
        assert!(json.contains("\"type\":\"literal\""));

        let parsed: WriteDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, parsed);
    }
}
