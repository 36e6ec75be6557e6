//! Chat session store.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use wardline_engine::{DocumentId, Message, MessageKind, MessageStatus};

use crate::auth::AuthProvider;
use crate::documents::DocumentStore;
use crate::error::{Result, StoreError};
use crate::gateway::ResponseGateway;

use super::task::SubscriptionHandle;

/// Published state of the active chat session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Conversation whose messages are loaded, if any.
    pub session: Option<DocumentId>,
    /// Messages in backend order, mirrored verbatim from snapshots.
    pub messages: Vec<Message>,
    pub loading: bool,
    pub error: Option<String>,
}

struct ChatShared {
    state: watch::Sender<ChatState>,
    subscription: SubscriptionHandle,
}

impl ChatShared {
    fn apply(&self, epoch: u64, mutate: impl FnOnce(&mut ChatState)) {
        self.state.send_if_modified(|state| {
            if !self.subscription.is_current(epoch) {
                return false;
            }
            mutate(state);
            true
        });
    }
}

/// Store for one conversation's message feed and the AI round-trip.
///
/// Messages are not sorted locally; the subscription query orders them by
/// their client-clocked timestamp and snapshots are mirrored as delivered.
/// Sending writes the user turn first, so it survives a gateway failure.
#[derive(Clone)]
pub struct ChatStore {
    documents: Arc<dyn DocumentStore>,
    auth: AuthProvider,
    gateway: Arc<dyn ResponseGateway>,
    shared: Arc<ChatShared>,
}

impl ChatStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        auth: AuthProvider,
        gateway: Arc<dyn ResponseGateway>,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            documents,
            auth,
            gateway,
            shared: Arc::new(ChatShared {
                state,
                subscription: SubscriptionHandle::default(),
            }),
        }
    }

    /// Switch the feed to `session_id`, replacing any previous subscription.
    pub async fn load_messages(&self, session_id: &str) {
        let epoch = self.shared.subscription.begin();
        self.shared.apply(epoch, |state| {
            state.session = Some(session_id.to_string());
            state.loading = true;
            state.error = None;
        });

        let mut subscription = self.documents.watch(&Message::query(session_id));
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            while let Some(delivery) = subscription.next().await {
                match delivery {
                    Ok(snapshot) => {
                        let now = Utc::now();
                        let messages: Vec<Message> = snapshot
                            .documents
                            .iter()
                            .map(|doc| Message::decode(doc, now))
                            .collect();

                        // Errors stay until the next load or send clears them
                        shared.apply(epoch, |state| {
                            state.messages = messages;
                            state.loading = false;
                        });
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Message delivery failed");
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

    /// Send one user turn and request the AI reply.
    ///
    /// The user message is written before the gateway call; if the gateway
    /// fails, the turn stays in the feed and the failure is recorded and
    /// returned. Signed out, or without a session, this is a silent no-op.
    pub async fn send_message(&self, content: &str, session_id: &str) -> Result<()> {
        if self.auth.current_user().is_none() || session_id.is_empty() {
            return Ok(());
        }

        self.shared.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let path = Message::collection(session_id);
        let user_turn = Message::write_doc(
            session_id,
            content,
            MessageKind::User,
            MessageStatus::Sent,
            Utc::now(),
        );
        if let Err(error) = self.documents.add(&path, user_turn).await {
            return Err(self.record_error(error.into()));
        }

        let reply = match self.gateway.request(content, session_id).await {
            Ok(reply) => reply,
            Err(error) => return Err(self.record_error(error.into())),
        };

        let ai_turn = Message::write_doc(
            session_id,
            &reply.text,
            MessageKind::Ai,
            MessageStatus::Delivered,
            Utc::now(),
        );
        if let Err(error) = self.documents.add(&path, ai_turn).await {
            return Err(self.record_error(error.into()));
        }

        self.shared.state.send_modify(|state| {
            state.loading = false;
        });
        Ok(())
    }

    /// Stop the subscription and clear the session.
    pub fn cleanup(&self) {
        self.shared.subscription.stop();
        self.shared.state.send_modify(|state| {
            *state = ChatState::default();
        });
    }

    /// Current state snapshot.
    pub fn state(&self) -> ChatState {
        self.shared.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.shared.state.subscribe()
    }

    fn record_error(&self, error: StoreError) -> StoreError {
        tracing::warn!(%error, "Chat operation failed");
        self.shared.state.send_modify(|state| {
            state.error = Some(error.to_string());
            state.loading = false;
        });
        error
    }
}
