//! Application context wiring.

use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::config::Config;
use crate::documents::{DocumentStore, MemoryStore};
use crate::gateway::{HttpGateway, ResponseGateway};
use crate::prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
use crate::stores::{ChatStore, ConversationStore, NotesStore, PatientStore};

/// Shared service handles the stores are built from.
///
/// The embedding application picks the document backend, gateway and
/// preference storage once; stores derived from the same context share
/// identity and data. Swapping a service for a test double happens here,
/// not inside the stores.
#[derive(Clone)]
pub struct AppContext {
    documents: Arc<dyn DocumentStore>,
    auth: AuthProvider,
    gateway: Arc<dyn ResponseGateway>,
    preferences: Arc<dyn PreferenceStore>,
}

impl AppContext {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        auth: AuthProvider,
        gateway: Arc<dyn ResponseGateway>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            documents,
            auth,
            gateway,
            preferences,
        }
    }

    /// Standard wiring from configuration: in-memory documents, an HTTP
    /// gateway, and file-backed preferences when a path is configured.
    pub fn from_config(config: &Config) -> Self {
        let preferences: Arc<dyn PreferenceStore> = match &config.preferences_path {
            Some(path) => Arc::new(FilePreferences::open(path)),
            None => Arc::new(MemoryPreferences::new()),
        };

        Self {
            documents: Arc::new(MemoryStore::new()),
            auth: AuthProvider::new(),
            gateway: Arc::new(HttpGateway::new(config.gateway_url.clone())),
            preferences,
        }
    }

    /// The shared document store.
    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.documents)
    }

    /// The shared identity handle.
    pub fn auth(&self) -> &AuthProvider {
        &self.auth
    }

    /// The shared AI gateway.
    pub fn gateway(&self) -> Arc<dyn ResponseGateway> {
        Arc::clone(&self.gateway)
    }

    /// The shared preference slots.
    pub fn preferences(&self) -> Arc<dyn PreferenceStore> {
        Arc::clone(&self.preferences)
    }

    /// Build a conversation store on this context.
    pub fn conversations(&self) -> ConversationStore {
        ConversationStore::new(self.documents(), self.auth.clone(), self.preferences())
    }

    /// Build a chat store on this context.
    pub fn chat(&self) -> ChatStore {
        ChatStore::new(self.documents(), self.auth.clone(), self.gateway())
    }

    /// Build a notes store on this context.
    pub fn notes(&self) -> NotesStore {
        NotesStore::new(self.documents(), self.auth.clone())
    }

    /// Build a patient store on this context.
    pub fn patients(&self) -> PatientStore {
        PatientStore::new(self.documents(), self.auth.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardline_engine::{Entity, Note};

    fn memory_context() -> AppContext {
        AppContext::new(
            Arc::new(MemoryStore::new()),
            AuthProvider::signed_in("u-1"),
            Arc::new(HttpGateway::new("http://localhost:9")),
            Arc::new(MemoryPreferences::new()),
        )
    }

    #[tokio::test]
    async fn derived_stores_share_the_backend() {
        let context = memory_context();

        let notes = context.notes();
        notes.load().await;
        notes.create().await.unwrap();

        let query = Note::query(&"u-1".to_string());
        let docs = context.documents().fetch(&query).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn derived_stores_share_identity() {
        let context = memory_context();
        let patients = context.patients();

        context.auth().set_user(None);

        let admit = patients
            .add_patient(&wardline_engine::PatientDraft {
                name: "X".to_string(),
                diagnosis: "Y".to_string(),
                room_number: "1".to_string(),
                admission_date: chrono::Utc::now(),
            })
            .await;
        assert!(admit.is_err());
    }

    #[test]
    fn from_config_defaults_to_memory_preferences() {
        let config = Config {
            gateway_url: "http://localhost:9".to_string(),
            preferences_path: None,
        };
        let context = AppContext::from_config(&config);
        context.preferences().set("probe", "1");
        assert_eq!(context.preferences().get("probe").as_deref(), Some("1"));
    }
}
