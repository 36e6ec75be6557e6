//! Real-time synchronization stores for Wardline.
//!
//! This crate layers live, observable state on top of [`wardline_engine`]'s
//! deterministic document model. Each domain store subscribes to one query,
//! mirrors snapshots into a [`tokio::sync::watch`] channel, and applies user
//! actions as optimistic writes that the next snapshot confirms or corrects.
//!
//! # Architecture
//!
//! - [`documents`] is the persistence boundary: [`DocumentStore`] abstracts
//!   writes, one-shot fetches and watch subscriptions, and [`MemoryStore`]
//!   is the embedded backend used in tests and offline runs.
//! - [`stores`] holds the domain stores (conversations, chat, notes,
//!   patients), all built on the same subscription-epoch discipline: a
//!   reload opens a new epoch and deliveries from superseded subscriptions
//!   are dropped without touching state.
//! - [`AppContext`] wires the shared services explicitly; swapping one for
//!   a test double happens there, not inside the stores.
//! - [`auth`], [`gateway`], [`prefs`] and [`config`] are the surrounding
//!   services.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use wardline_client::{AppContext, AuthProvider, HttpGateway, MemoryPreferences, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let context = AppContext::new(
//!     Arc::new(MemoryStore::new()),
//!     AuthProvider::signed_in("dr-lee"),
//!     Arc::new(HttpGateway::new("http://localhost:8787/api/ask")),
//!     Arc::new(MemoryPreferences::new()),
//! );
//!
//! let notes = context.notes();
//! notes.load().await;
//! let id = notes.create().await.unwrap();
//! assert_eq!(notes.state().selected.as_deref(), Some(id.as_str()));
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod gateway;
pub mod prefs;
pub mod stores;

pub use auth::{AuthProvider, AuthState};
pub use config::{Config, ConfigError};
pub use context::AppContext;
pub use documents::{Delivery, DocumentError, DocumentStore, MemoryStore, Snapshot, Subscription};
pub use error::{Result, StoreError};
pub use gateway::{GatewayError, GatewayReply, HttpGateway, ResponseGateway};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use stores::{
    ChatState, ChatStore, ConversationStore, EntityState, NoteUpdate, NotesStore, PatientState,
    PatientStore, SyncStore,
};

/// Entity types from the engine, re-exported for store signatures.
pub use wardline_engine::{
    Conversation, ConversationStatus, DocumentId, EcgData, EchoData, Entity, LastMessage, Message,
    MessageKind, MessageStatus, Note, Patient, PatientDraft, PatientNote, PatientUpdate, UserId,
};
