//! Patient entity: the ward's bed board.
//!
//! Patients are keyed by room, so their store keeps snapshot order instead
//! of sorting. Timeline notes are embedded in the patient document and
//! appended atomically; they carry client-clock stamps while the document's
//! own `createdAt`/`updatedAt` stay on the server clock.

use crate::document::{CollectionPath, Document, WriteDoc};
use crate::entity::Entity;
use crate::query::Query;
use crate::{time, DocumentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Root collection name.
pub const COLLECTION: &str = "patients";

/// Status written for newly admitted patients.
pub const STATUS_ACTIVE: &str = "active";

/// Echocardiography findings. Free-text fields, empty when unfilled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EchoData {
    pub ivs: String,
    pub lvedd: String,
    pub ef: String,
    pub la: String,
    pub ao_asc: String,
    pub ao_arch: String,
    pub ao_ab: String,
    pub rv: String,
    pub tr: String,
    pub mr: String,
    pub ivc_collapsed: String,
    pub ivc_cm: String,
    pub notes: String,
}

impl EchoData {
    /// Wire form of these findings.
    pub fn to_value(&self) -> Value {
        json!({
            "ivs": self.ivs,
            "lvedd": self.lvedd,
            "ef": self.ef,
            "la": self.la,
            "aoAsc": self.ao_asc,
            "aoArch": self.ao_arch,
            "aoAb": self.ao_ab,
            "rv": self.rv,
            "tr": self.tr,
            "mr": self.mr,
            "ivcCollapsed": self.ivc_collapsed,
            "ivcCm": self.ivc_cm,
            "notes": self.notes,
        })
    }
}

/// Electrocardiography findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EcgData {
    pub notes: String,
}

impl EcgData {
    /// Wire form of these findings.
    pub fn to_value(&self) -> Value {
        json!({ "notes": self.notes })
    }
}

/// A timeline entry embedded in the patient document.
///
/// Client-clocked by design: the id is the authoring moment's epoch-millis
/// rendered as a string, and the timestamp is the client clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientNote {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub created_by: UserId,
}

impl PatientNote {
    /// Default timeline entry kind.
    pub const GENERAL: &'static str = "general";

    /// Author a new entry on the client clock.
    pub fn new(
        content: impl Into<String>,
        kind: impl Into<String>,
        author: &UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: time::to_millis(at).to_string(),
            content: content.into(),
            kind: kind.into(),
            timestamp: at,
            created_by: author.clone(),
        }
    }

    /// Wire form of this entry.
    pub fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "content": self.content,
            "type": self.kind,
            "timestamp": time::to_millis(self.timestamp),
            "createdBy": self.created_by,
        })
    }

    fn decode(value: &Value, now: DateTime<Utc>) -> Self {
        let str_of = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let kind = match str_of("type") {
            k if k.is_empty() => Self::GENERAL.to_string(),
            k => k,
        };

        Self {
            id: str_of("id"),
            content: str_of("content"),
            kind,
            timestamp: time::decode_time(value.get("timestamp"), now),
            created_by: str_of("createdBy"),
        }
    }
}

/// A tracked patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: DocumentId,
    pub user_id: UserId,
    pub name: String,
    pub diagnosis: String,
    pub room_number: String,
    pub status: String,
    pub admission_date: DateTime<Utc>,
    pub echo_data: EchoData,
    pub ecg_data: EcgData,
    pub notes: Vec<PatientNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when admitting a patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDraft {
    pub name: String,
    pub diagnosis: String,
    pub room_number: String,
    pub admission_date: DateTime<Utc>,
}

/// Partial patient update. Room changes go through transfer instead, so the
/// optimistic bookkeeping stays in one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub diagnosis: Option<String>,
    pub status: Option<String>,
    pub echo_data: Option<EchoData>,
    pub ecg_data: Option<EcgData>,
}

impl Patient {
    /// Write payload for admitting a patient.
    pub fn create_doc(owner: &UserId, draft: &PatientDraft) -> WriteDoc {
        WriteDoc::new()
            .set("name", draft.name.clone())
            .set("diagnosis", draft.diagnosis.clone())
            .set("roomNumber", draft.room_number.clone())
            .set("status", STATUS_ACTIVE)
            .set("admissionDate", time::to_millis(draft.admission_date))
            .set("userId", owner.clone())
            .set("notes", Value::Array(Vec::new()))
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt")
    }

    /// Write payload for a partial update.
    pub fn update_doc(update: &PatientUpdate) -> WriteDoc {
        let mut doc = WriteDoc::new().server_timestamp("updatedAt");
        if let Some(name) = &update.name {
            doc = doc.set("name", name.clone());
        }
        if let Some(diagnosis) = &update.diagnosis {
            doc = doc.set("diagnosis", diagnosis.clone());
        }
        if let Some(status) = &update.status {
            doc = doc.set("status", status.clone());
        }
        if let Some(echo) = &update.echo_data {
            doc = doc.set("echoData", echo.to_value());
        }
        if let Some(ecg) = &update.ecg_data {
            doc = doc.set("ecgData", ecg.to_value());
        }
        doc
    }

    /// Write payload for a room transfer: the room plus a server-clocked
    /// `updatedAt`, nothing else.
    pub fn transfer_doc(room_number: &str) -> WriteDoc {
        WriteDoc::new()
            .set("roomNumber", room_number)
            .server_timestamp("updatedAt")
    }

    /// Write payload appending a timeline entry atomically.
    pub fn append_note_doc(note: &PatientNote) -> WriteDoc {
        WriteDoc::new()
            .array_union("notes", vec![note.to_value()])
            .server_timestamp("updatedAt")
    }

    /// Occupancy probe: an active patient of `owner` already in `room`.
    pub fn room_query(owner: &UserId, room_number: &str) -> Query {
        Query::collection(Self::collection())
            .where_field_eq("userId", owner.clone())
            .where_field_eq("roomNumber", room_number)
            .where_field_eq("status", STATUS_ACTIVE)
    }
}

impl Entity for Patient {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn collection() -> CollectionPath {
        CollectionPath::root(COLLECTION)
    }

    fn decode(doc: &Document, owner: &UserId, now: DateTime<Utc>) -> Self {
        let notes = doc
            .array_field("notes")
            .map(|items| {
                items
                    .iter()
                    .map(|value| PatientNote::decode(value, now))
                    .collect()
            })
            .unwrap_or_default();

        let echo_data = doc
            .field("echoData")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();
        let ecg_data = doc
            .field("ecgData")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        Self {
            id: doc.id.clone(),
            user_id: doc.str_field_or("userId", owner),
            name: doc.str_field_or("name", ""),
            diagnosis: doc.str_field_or("diagnosis", ""),
            room_number: doc.str_field_or("roomNumber", ""),
            status: doc.str_field_or("status", STATUS_ACTIVE),
            admission_date: doc.time_field("admissionDate", now),
            echo_data,
            ecg_data,
            notes,
            created_at: doc.time_field("createdAt", now),
            updated_at: doc.time_field("updatedAt", now),
        }
    }

    fn query(owner: &UserId) -> Query {
        Query::collection(Self::collection()).where_field_eq("userId", owner.clone())
    }

    // Bed board keeps snapshot order; rooms key the display.
    fn sort(_items: &mut Vec<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WriteField;

    fn owner() -> UserId {
        "u-1".to_string()
    }

    #[test]
    fn decode_full_document() {
        let now = Utc::now();
        let doc = Document::new(
            "p-1",
            json!({
                "userId": "u-1",
                "name": "A. Karimov",
                "diagnosis": "NSTEMI",
                "roomNumber": "ICU-2",
                "status": "active",
                "admissionDate": 1706745600000i64,
                "echoData": {"ef": "45%", "ivcCollapsed": "yes"},
                "ecgData": {"notes": "sinus rhythm"},
                "notes": [
                    {
                        "id": "1706745600000",
                        "content": "Admitted overnight",
                        "type": "general",
                        "timestamp": 1706745600000i64,
                        "createdBy": "u-1",
                    },
                ],
                "createdAt": 1706745600000i64,
                "updatedAt": 1706832000000i64,
            }),
        );

        let patient = Patient::decode(&doc, &owner(), now);

        assert_eq!(patient.name, "A. Karimov");
        assert_eq!(patient.room_number, "ICU-2");
        assert_eq!(patient.echo_data.ef, "45%");
        assert_eq!(patient.echo_data.ivc_collapsed, "yes");
        assert_eq!(patient.echo_data.ivs, "");
        assert_eq!(patient.ecg_data.notes, "sinus rhythm");
        assert_eq!(patient.notes.len(), 1);
        assert_eq!(patient.notes[0].content, "Admitted overnight");
        assert_eq!(patient.notes[0].created_by, "u-1");
    }

    #[test]
    fn decode_defaults() {
        let now = Utc::now();
        let patient = Patient::decode(&Document::new("p-1", json!({})), &owner(), now);

        assert_eq!(patient.user_id, "u-1");
        assert_eq!(patient.status, STATUS_ACTIVE);
        assert_eq!(patient.echo_data, EchoData::default());
        assert!(patient.notes.is_empty());
        assert_eq!(patient.admission_date, now);
    }

    #[test]
    fn decode_malformed_notes_entry() {
        let now = Utc::now();
        let doc = Document::new("p-1", json!({"notes": [{"content": 42}, "plain string"]}));
        let patient = Patient::decode(&doc, &owner(), now);

        // Entries decode leniently instead of dropping
        assert_eq!(patient.notes.len(), 2);
        assert_eq!(patient.notes[0].content, "");
        assert_eq!(patient.notes[0].kind, PatientNote::GENERAL);
        assert_eq!(patient.notes[1].timestamp, now);
    }

    #[test]
    fn create_doc_shape() {
        let at = Utc::now();
        let draft = PatientDraft {
            name: "B. Aliyeva".into(),
            diagnosis: "CHF".into(),
            room_number: "901-1".into(),
            admission_date: at,
        };

        let doc = Patient::create_doc(&owner(), &draft);

        assert_eq!(
            doc.get("roomNumber"),
            Some(&WriteField::Literal(json!("901-1")))
        );
        assert_eq!(
            doc.get("status"),
            Some(&WriteField::Literal(json!(STATUS_ACTIVE)))
        );
        assert_eq!(doc.get("notes"), Some(&WriteField::Literal(json!([]))));
        assert_eq!(doc.get("createdAt"), Some(&WriteField::ServerTimestamp));
        assert_eq!(doc.get("updatedAt"), Some(&WriteField::ServerTimestamp));
    }

    #[test]
    fn transfer_doc_is_room_and_stamp_only() {
        let doc = Patient::transfer_doc("ICU-1");

        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc.get("roomNumber"),
            Some(&WriteField::Literal(json!("ICU-1")))
        );
        assert_eq!(doc.get("updatedAt"), Some(&WriteField::ServerTimestamp));
    }

    #[test]
    fn append_note_doc_unions_wire_form() {
        let at = Utc::now();
        let note = PatientNote::new("Transferred to ICU", PatientNote::GENERAL, &owner(), at);
        let doc = Patient::append_note_doc(&note);

        match doc.get("notes") {
            Some(WriteField::ArrayUnion(values)) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0]["id"], json!(time::to_millis(at).to_string()));
                assert_eq!(values[0]["timestamp"], json!(time::to_millis(at)));
                assert_eq!(values[0]["createdBy"], json!("u-1"));
            }
            other => panic!("expected array union, got {other:?}"),
        }
        assert_eq!(doc.get("updatedAt"), Some(&WriteField::ServerTimestamp));
    }

    #[test]
    fn update_doc_skips_room_number() {
        let update = PatientUpdate {
            name: Some("Renamed".into()),
            echo_data: Some(EchoData {
                ef: "50%".into(),
                ..EchoData::default()
            }),
            ..PatientUpdate::default()
        };

        let doc = Patient::update_doc(&update);

        assert!(doc.get("roomNumber").is_none());
        assert_eq!(doc.get("name"), Some(&WriteField::Literal(json!("Renamed"))));
        assert_eq!(
            doc.get("echoData").and_then(|f| match f {
                WriteField::Literal(v) => v.get("ef").cloned(),
                _ => None,
            }),
            Some(json!("50%"))
        );
    }

    #[test]
    fn room_query_filters() {
        let query = Patient::room_query(&owner(), "ICU-3");

        let occupied = Document::new(
            "p-1",
            json!({"userId": "u-1", "roomNumber": "ICU-3", "status": "active"}),
        );
        let discharged = Document::new(
            "p-2",
            json!({"userId": "u-1", "roomNumber": "ICU-3", "status": "discharged"}),
        );
        let elsewhere = Document::new(
            "p-3",
            json!({"userId": "u-1", "roomNumber": "902-1", "status": "active"}),
        );

        assert!(query.matches(&occupied));
        assert!(!query.matches(&discharged));
        assert!(!query.matches(&elsewhere));
    }
}
