//! Identity provider handle.
//!
//! The embedding application owns sign-in and pushes the resolved identity
//! here; stores only read it. The handle starts in a loading state so stores
//! can tell "not signed in yet" apart from "signed out".

use std::sync::Arc;

use tokio::sync::watch;
use wardline_engine::UserId;

/// Current identity snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in user, when there is one.
    pub user: Option<UserId>,
    /// Whether the initial auth resolution is still pending.
    pub loading: bool,
}

/// Cloneable, thread-safe handle to the identity state.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthProvider {
    /// Create a provider in the pre-resolution state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState {
            user: None,
            loading: true,
        });
        Self {
            state: Arc::new(state),
        }
    }

    /// Create a provider already resolved to `user`. Test convenience.
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        let provider = Self::new();
        provider.set_user(Some(user.into()));
        provider
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<UserId> {
        self.state.borrow().user.clone()
    }

    /// Whether the initial auth resolution is still pending.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Publish an auth event. Settles the loading flag.
    pub fn set_user(&self, user: Option<UserId>) {
        self.state.send_modify(|state| {
            state.user = user;
            state.loading = false;
        });
        tracing::debug!(signed_in = self.current_user().is_some(), "Auth state updated");
    }

    /// Watch identity changes.
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loading_and_signed_out() {
        let auth = AuthProvider::new();
        assert!(auth.is_loading());
        assert!(auth.current_user().is_none());
    }

    #[test]
    fn set_user_settles_loading() {
        let auth = AuthProvider::new();

        auth.set_user(Some("u-1".into()));
        assert!(!auth.is_loading());
        assert_eq!(auth.current_user().as_deref(), Some("u-1"));

        auth.set_user(None);
        assert!(!auth.is_loading());
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn watch_observes_sign_out() {
        let auth = AuthProvider::signed_in("u-1");
        let mut watcher = auth.watch();

        auth.set_user(None);
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().user.is_none());
    }
}
