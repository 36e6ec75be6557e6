//! # Wardline Engine
//!
//! The deterministic core of Wardline's real-time state layer.
//!
//! This crate models documents, writes, queries, and the clinical entities
//! built on them. It holds no IO: the async client crate feeds it snapshots
//! and reads back decoded state, so every behavior here is reproducible from
//! inputs alone.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, network, or wall clocks
//! - **Deterministic**: same documents in, same state out, including order
//! - **Lenient decoding**: malformed documents degrade to defaults, never errors
//! - **Portable**: runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Documents and writes
//!
//! A [`Document`] is an id plus a JSON object. Mutations are expressed as a
//! [`WriteDoc`]: a map of field writes where each value is either a literal,
//! a [`WriteField::ServerTimestamp`] sentinel resolved at commit time, or a
//! [`WriteField::ArrayUnion`] that appends only missing elements.
//!
//! ### Queries
//!
//! A [`Query`] names a collection, equality/array-containment filters, and an
//! optional order. [`Database::execute`] breaks ordering ties by insertion
//! sequence, so results are stable across runs.
//!
//! ### Entities
//!
//! [`Conversation`], [`Message`], [`Note`], and [`Patient`] implement the
//! [`Entity`] trait: each knows its query shape, how to decode a document
//! leniently, and how its collection sorts.
//!
//! ### Selection
//!
//! [`resolve_selection`] and [`selection_after_removal`] are the pure rules
//! for which item a list UI points at after a snapshot or a deletion.
//!
//! ### Clocks
//!
//! Document-level `createdAt`/`updatedAt` stamps are server sentinels.
//! Chat messages and embedded patient notes are stamped on the client clock
//! instead; the [`time`] module converts both to and from epoch millis.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use wardline_engine::{resolve_selection, Database, Entity, Note};
//!
//! let mut db = Database::new();
//! let now = Utc::now();
//! let owner = "clinician_1".to_string();
//!
//! // 1. Commit a write; server sentinels resolve against `now`
//! let doc = db
//!     .insert(&Note::collection(), "note_1", &Note::create_doc(&owner), now)
//!     .unwrap();
//! assert_eq!(doc.id, "note_1");
//!
//! // 2. Run the entity's query and decode the snapshot
//! let docs = db.execute(&Note::query(&owner));
//! let mut notes: Vec<Note> = docs.iter().map(|d| Note::decode(d, &owner, now)).collect();
//! Note::sort(&mut notes);
//!
//! // 3. Resolve what the UI should point at
//! let selected = resolve_selection(None, &notes);
//! assert_eq!(selected.as_deref(), Some("note_1"));
//! ```

pub mod conversation;
pub mod database;
pub mod document;
pub mod entity;
pub mod error;
pub mod message;
pub mod note;
pub mod patient;
pub mod query;
pub mod time;

// Re-export main types at crate root
pub use conversation::{Conversation, ConversationStatus, LastMessage};
pub use database::{Collection, Database};
pub use document::{CollectionPath, Document, WriteDoc, WriteField};
pub use entity::{resolve_selection, selection_after_removal, Entity};
pub use error::{Error, Result};
pub use message::{Message, MessageKind, MessageMetadata, MessageStatus};
pub use note::Note;
pub use patient::{EchoData, EcgData, Patient, PatientDraft, PatientNote, PatientUpdate};
pub use query::{Direction, Filter, OrderBy, Query};

/// Type aliases for clarity
pub type DocumentId = String;
pub type UserId = String;
