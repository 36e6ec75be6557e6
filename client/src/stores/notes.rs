//! Notes store.

use std::sync::Arc;

use tokio::sync::watch;
use wardline_engine::{DocumentId, Note};

use crate::auth::AuthProvider;
use crate::documents::DocumentStore;
use crate::error::Result;

use super::{EntityState, SyncStore};

/// Partial edit of a note. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Synchronized store over the user's notes.
///
/// Editing is two-tier: [`update`](Self::update) patches single fields as
/// the user types, [`save`](Self::save) rewrites the whole cached note when
/// the editor commits.
#[derive(Clone)]
pub struct NotesStore {
    sync: SyncStore<Note>,
}

impl NotesStore {
    pub fn new(documents: Arc<dyn DocumentStore>, auth: AuthProvider) -> Self {
        Self {
            sync: SyncStore::new(documents, auth),
        }
    }

    /// Subscribe to the signed-in user's notes.
    pub async fn load(&self) {
        self.sync.load().await;
    }

    /// Create an empty note with the default title and select it.
    pub async fn create(&self) -> Result<DocumentId> {
        let user = self.sync.require_user()?;
        self.sync.create(Note::create_doc(&user)).await
    }

    /// Select a cached note.
    pub fn select(&self, id: &str) {
        self.sync.select(id);
    }

    /// Clear the selection.
    pub fn deselect(&self) {
        self.sync.deselect();
    }

    /// Patch the provided fields only. Meant for keystroke-granular edits,
    /// so it never toggles the loading flag.
    pub async fn update(&self, id: &str, update: NoteUpdate) -> Result<()> {
        self.sync
            .update(
                id,
                Note::update_doc(update.title.as_deref(), update.content.as_deref()),
            )
            .await
    }

    /// Rewrite title and content from the cached note. A note that is not
    /// in the cache is silently skipped.
    pub async fn save(&self, id: &str) -> Result<()> {
        let Some(note) = self.sync.find(id) else {
            return Ok(());
        };
        self.sync
            .update(id, Note::update_doc(Some(&note.title), Some(&note.content)))
            .await
    }

    /// Delete a note.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.sync.delete(id).await
    }

    /// Stop the live subscription.
    pub fn cleanup(&self) {
        self.sync.cleanup();
    }

    /// Current state snapshot.
    pub fn state(&self) -> EntityState<Note> {
        self.sync.state()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<EntityState<Note>> {
        self.sync.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MemoryStore;
    use serde_json::json;
    use wardline_engine::Entity;

    fn notes_store() -> (Arc<MemoryStore>, NotesStore) {
        let memory = Arc::new(MemoryStore::new());
        let store = NotesStore::new(memory.clone(), AuthProvider::signed_in("u-1"));
        (memory, store)
    }

    #[tokio::test]
    async fn create_selects_an_untitled_note() {
        let (_memory, store) = notes_store();
        store.load().await;

        let id = store.create().await.unwrap();
        let mut rx = store.subscribe();
        let state = rx
            .wait_for(|state| state.items.len() == 1)
            .await
            .unwrap()
            .clone();

        assert_eq!(state.selected.as_deref(), Some(id.as_str()));
        assert_eq!(state.items[0].title, "Untitled Note");
        assert_eq!(state.items[0].content, "");
    }

    #[tokio::test]
    async fn keystroke_updates_patch_one_field() {
        let (memory, store) = notes_store();
        store.load().await;
        let id = store.create().await.unwrap();

        store
            .update(
                &id,
                NoteUpdate {
                    content: Some("Bed 3 stable.".to_string()),
                    ..NoteUpdate::default()
                },
            )
            .await
            .unwrap();

        let doc = memory.document(&Note::collection(), &id).unwrap();
        assert_eq!(doc.data["content"], json!("Bed 3 stable."));
        // Title untouched by the partial patch
        assert_eq!(doc.data["title"], json!("Untitled Note"));
        assert!(!store.state().loading);
    }

    #[tokio::test]
    async fn save_rewrites_from_the_cache() {
        let (memory, store) = notes_store();
        store.load().await;
        let id = store.create().await.unwrap();

        store
            .update(
                &id,
                NoteUpdate {
                    title: Some("Handover".to_string()),
                    content: Some("Bed 3 stable.".to_string()),
                },
            )
            .await
            .unwrap();
        let mut rx = store.subscribe();
        rx.wait_for(|state| state.items.first().is_some_and(|n| n.title == "Handover"))
            .await
            .unwrap();

        store.save(&id).await.unwrap();

        let doc = memory.document(&Note::collection(), &id).unwrap();
        assert_eq!(doc.data["title"], json!("Handover"));
        assert_eq!(doc.data["content"], json!("Bed 3 stable."));
    }

    #[tokio::test]
    async fn save_of_uncached_note_is_a_silent_noop() {
        let (memory, store) = notes_store();
        store.load().await;

        store.save("ghost").await.unwrap();
        assert!(memory.document(&Note::collection(), "ghost").is_none());
    }
}
