//! Conversation list store.

use std::sync::Arc;

use tokio::sync::watch;
use wardline_engine::{Conversation, DocumentId};

use crate::auth::AuthProvider;
use crate::documents::DocumentStore;
use crate::error::Result;
use crate::prefs::{self, PreferenceStore};

use super::{EntityState, SyncStore};

/// Synchronized store over the user's conversations.
///
/// On top of the generic sync behavior it remembers the selected
/// conversation across restarts: the selection is seeded from the
/// preference slot before the first snapshot and written back whenever
/// it changes. A seeded id that no longer exists falls away when the
/// first snapshot resolves the selection.
#[derive(Clone)]
pub struct ConversationStore {
    sync: SyncStore<Conversation>,
    preferences: Arc<dyn PreferenceStore>,
}

impl ConversationStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        auth: AuthProvider,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let sync = SyncStore::new(documents, auth);
        if let Some(saved) = preferences.get(prefs::CONVERSATION_SLOT) {
            tracing::debug!(conversation = %saved, "Restoring persisted selection");
            sync.restore_selection(Some(saved));
        }

        let store = Self { sync, preferences };
        store.spawn_selection_persist();
        store
    }

    /// Mirror selection changes into the preference slot until the store
    /// itself is gone.
    fn spawn_selection_persist(&self) {
        let mut receiver = self.sync.subscribe();
        let preferences = Arc::clone(&self.preferences);

        tokio::spawn(async move {
            let mut last = receiver.borrow().selected.clone();
            while receiver.changed().await.is_ok() {
                let selected = receiver.borrow().selected.clone();
                if selected == last {
                    continue;
                }
                match &selected {
                    Some(id) => preferences.set(prefs::CONVERSATION_SLOT, id),
                    None => preferences.clear(prefs::CONVERSATION_SLOT),
                }
                last = selected;
            }
        });
    }

    /// Subscribe to the signed-in user's conversations.
    pub async fn load(&self) {
        self.sync.load().await;
    }

    /// Create a conversation with the default title and select it.
    pub async fn create(&self) -> Result<DocumentId> {
        let user = self.sync.require_user()?;
        self.sync.create(Conversation::create_doc(&user)).await
    }

    /// Select a cached conversation.
    pub fn select(&self, id: &str) {
        self.sync.select(id);
    }

    /// Clear the selection.
    pub fn deselect(&self) {
        self.sync.deselect();
    }

    /// Archive a conversation. Idempotent: archiving an archived
    /// conversation rewrites the same status.
    pub async fn archive(&self, id: &str) -> Result<()> {
        self.sync.update(id, Conversation::archive_doc()).await
    }

    /// Rename a conversation.
    pub async fn update_title(&self, id: &str, title: &str) -> Result<()> {
        self.sync.update(id, Conversation::rename_doc(title)).await
    }

    /// Delete a conversation.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.sync.delete(id).await
    }

    /// Stop the live subscription.
    pub fn cleanup(&self) {
        self.sync.cleanup();
    }

    /// Current state snapshot.
    pub fn state(&self) -> EntityState<Conversation> {
        self.sync.state()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<EntityState<Conversation>> {
        self.sync.subscribe()
    }
}
