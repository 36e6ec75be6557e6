//! Synchronized state stores.
//!
//! Each store owns one live query subscription and publishes its state
//! through a [`watch`] channel. Snapshots from the document store are
//! decoded, sorted and merged with the local selection; mutations go
//! straight to the document store and are confirmed by the next snapshot.
//!
//! Reloads race against in-flight snapshots, so every subscription runs
//! under an epoch from [`task::SubscriptionHandle`]: a delivery from a
//! superseded subscription is dropped without touching state or waking
//! watchers.

mod chat;
mod conversations;
mod notes;
mod patients;
mod task;

pub use chat::{ChatState, ChatStore};
pub use conversations::ConversationStore;
pub use notes::{NoteUpdate, NotesStore};
pub use patients::{PatientState, PatientStore};

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use wardline_engine::{
    resolve_selection, selection_after_removal, DocumentId, Entity, UserId, WriteDoc,
};

use crate::auth::AuthProvider;
use crate::documents::DocumentStore;
use crate::error::{Result, StoreError};
use task::SubscriptionHandle;

/// Published state of a [`SyncStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState<E> {
    /// The owner's entities, in store order.
    pub items: Vec<E>,
    /// Selected entity id. Resolves to `None` or an id present in `items`
    /// whenever a snapshot lands.
    pub selected: Option<DocumentId>,
    /// Whether a load is in flight.
    pub loading: bool,
    /// Last failed operation, kept until the next load or mutation clears it.
    pub error: Option<String>,
}

impl<E> Default for EntityState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            loading: false,
            error: None,
        }
    }
}

/// State channel plus subscription lifecycle, shared with drain tasks.
struct StoreShared<E> {
    state: watch::Sender<EntityState<E>>,
    subscription: SubscriptionHandle,
}

impl<E: Entity> StoreShared<E> {
    fn new() -> Self {
        let (state, _) = watch::channel(EntityState::default());
        Self {
            state,
            subscription: SubscriptionHandle::default(),
        }
    }

    /// Mutate state only while `epoch` is current. A superseded epoch leaves
    /// the state untouched and does not wake watchers.
    fn apply(&self, epoch: u64, mutate: impl FnOnce(&mut EntityState<E>)) {
        self.state.send_if_modified(|state| {
            if !self.subscription.is_current(epoch) {
                return false;
            }
            mutate(state);
            true
        });
    }
}

/// Generic synchronized store over one [`Entity`] collection.
///
/// The concrete stores wrap or mirror this: [`ConversationStore`] and
/// [`NotesStore`] delegate to it, while [`ChatStore`] and [`PatientStore`]
/// follow the same subscription discipline with their own state shapes.
#[derive(Clone)]
pub struct SyncStore<E: Entity> {
    documents: Arc<dyn DocumentStore>,
    auth: AuthProvider,
    shared: Arc<StoreShared<E>>,
}

impl<E: Entity> SyncStore<E> {
    pub fn new(documents: Arc<dyn DocumentStore>, auth: AuthProvider) -> Self {
        Self {
            documents,
            auth,
            shared: Arc::new(StoreShared::new()),
        }
    }

    /// Subscribe to the signed-in user's entities, replacing any previous
    /// subscription. Signed out, the store resets to defaults and stays
    /// quiet until the next load.
    pub async fn load(&self) {
        let Some(user) = self.auth.current_user() else {
            self.shared.subscription.stop();
            self.shared.state.send_replace(EntityState::default());
            return;
        };

        let epoch = self.shared.subscription.begin();
        self.shared.apply(epoch, |state| {
            state.loading = true;
            state.error = None;
        });

        let mut subscription = self.documents.watch(&E::query(&user));
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            while let Some(delivery) = subscription.next().await {
                match delivery {
                    Ok(snapshot) => {
                        let now = Utc::now();
                        let mut items: Vec<E> = snapshot
                            .documents
                            .iter()
                            .map(|doc| E::decode(doc, &user, now))
                            .collect();
                        E::sort(&mut items);

                        // Errors stay until the next load or mutation clears them
                        shared.apply(epoch, |state| {
                            state.selected =
                                resolve_selection(state.selected.as_deref(), &items);
                            state.items = items;
                            state.loading = false;
                        });
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Snapshot delivery failed");
                        shared.apply(epoch, |state| {
                            state.error = Some(error.to_string());
                            state.loading = false;
                        });
                    }
                }
            }
        });
        self.shared.subscription.attach(epoch, task);
    }

    /// Select `id` if it is cached; an unknown id leaves the selection alone.
    pub fn select(&self, id: &str) {
        self.shared.state.send_if_modified(|state| {
            if state.selected.as_deref() == Some(id) {
                return false;
            }
            if !state.items.iter().any(|item| item.id() == id) {
                return false;
            }
            state.selected = Some(id.to_string());
            true
        });
    }

    /// Clear the selection.
    pub fn deselect(&self) {
        self.shared.state.send_if_modified(|state| {
            if state.selected.is_none() {
                return false;
            }
            state.selected = None;
            true
        });
    }

    /// Create a document and select it.
    ///
    /// Only the selection moves immediately; the entity itself appears when
    /// the confirming snapshot lands. Requires a signed-in user.
    pub async fn create(&self, doc: WriteDoc) -> Result<DocumentId> {
        self.require_user()?;

        let id = match self.documents.add(&E::collection(), doc).await {
            Ok(id) => id,
            Err(error) => return Err(self.record_error(error.into())),
        };

        self.shared.state.send_modify(|state| {
            state.selected = Some(id.clone());
            state.error = None;
        });
        Ok(id)
    }

    /// Patch a document. Signed out this is a silent no-op.
    pub async fn update(&self, id: &str, patch: WriteDoc) -> Result<()> {
        if self.auth.current_user().is_none() {
            return Ok(());
        }
        if let Err(error) = self.documents.update(&E::collection(), id, patch).await {
            return Err(self.record_error(error.into()));
        }
        Ok(())
    }

    /// Delete a document, dropping it from the cache without waiting for the
    /// confirming snapshot. Signed out this is a silent no-op.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.auth.current_user().is_none() {
            return Ok(());
        }
        if let Err(error) = self.documents.delete(&E::collection(), id).await {
            return Err(self.record_error(error.into()));
        }

        self.shared.state.send_if_modified(|state| {
            let before = state.items.len();
            state.items.retain(|item| item.id() != id);
            if state.items.len() == before {
                return false;
            }
            state.selected =
                selection_after_removal(id, state.selected.as_deref(), &state.items);
            true
        });
        Ok(())
    }

    /// Stop the live subscription. State keeps its last value.
    pub fn cleanup(&self) {
        self.shared.subscription.stop();
    }

    /// Current state snapshot.
    pub fn state(&self) -> EntityState<E> {
        self.shared.state.borrow().clone()
    }

    /// Cached entity by id.
    pub fn find(&self, id: &str) -> Option<E> {
        self.shared
            .state
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<EntityState<E>> {
        self.shared.state.subscribe()
    }

    /// Seed the selection ahead of the first snapshot, e.g. from persisted
    /// preferences. Resolution against the cache happens when one lands.
    pub(crate) fn restore_selection(&self, id: Option<DocumentId>) {
        self.shared.state.send_modify(|state| {
            state.selected = id;
        });
    }

    pub(crate) fn require_user(&self) -> Result<UserId> {
        self.auth.current_user().ok_or(StoreError::AuthRequired)
    }

    fn record_error(&self, error: StoreError) -> StoreError {
        tracing::warn!(%error, "Store operation failed");
        self.shared.state.send_modify(|state| {
            state.error = Some(error.to_string());
            state.loading = false;
        });
        error
    }
}
