//! Session store: who is signed in, and whether we know yet.
//!
//! Owned by a single [`ClientSession`](super::registry::ClientSession). A
//! background task follows the identity backend's auth-state channel and
//! republishes it as [`SessionState`] snapshots.

use std::sync::Arc;
use std::time::Duration;

use pillow_ease_core::Identity;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::firebase::{AuthUser, IdentityBackend};

/// How long logout waits for the backend's signed-out notification.
const SIGN_OUT_SETTLE: Duration = Duration::from_millis(500);

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// `true` until the first auth-state notification arrives.
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            is_loading: true,
        }
    }
}

/// Mirror of the identity backend's auth state.
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    backend: Arc<dyn IdentityBackend>,
    subscription: AbortHandle,
}

impl SessionStore {
    /// Start following `backend`. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(backend: Arc<dyn IdentityBackend>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let subscription =
            tokio::spawn(follow_auth_state(Arc::clone(&backend), state.clone())).abort_handle();

        Self {
            state,
            backend,
            subscription,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until `predicate` holds, or `timeout` elapses, and return the
    /// state at that point.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionState) -> bool + Send,
        timeout: Duration,
    ) -> SessionState {
        let mut receiver = self.state.subscribe();
        match tokio::time::timeout(timeout, receiver.wait_for(predicate)).await {
            Ok(Ok(state)) => state.clone(),
            _ => self.snapshot(),
        }
    }

    /// Ask the backend to end the session.
    ///
    /// A no-op when nobody is signed in. Failures are logged and leave the
    /// state unchanged.
    pub async fn logout(&self) {
        if self.backend.current_user().is_none() {
            tracing::debug!("Logout without a signed-in user");
            return;
        }

        match self.backend.sign_out().await {
            Ok(()) => {
                self.wait_for(|state| state.identity.is_none(), SIGN_OUT_SETTLE)
                    .await;
                tracing::info!("Signed out");
            }
            Err(err) => tracing::error!(error = %err, "Logout failed"),
        }
    }

    /// Stop following the backend.
    pub fn stop(&self) {
        self.subscription.abort();
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn follow_auth_state(backend: Arc<dyn IdentityBackend>, state: watch::Sender<SessionState>) {
    let mut auth = backend.subscribe().await;
    drop(backend);

    loop {
        let identity = auth.borrow_and_update().as_ref().map(AuthUser::identity);
        state.send_replace(SessionState {
            identity,
            is_loading: false,
        });

        if auth.changed().await.is_err() {
            tracing::debug!("Auth state channel closed");
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::firebase::{AuthStateReceiver, DisabledIdentity, FederatedCredential, IdentityError};
    use async_trait::async_trait;
    use pillow_ease_core::UserId;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ChannelBackend {
        current: watch::Sender<Option<AuthUser>>,
        sign_outs: AtomicUsize,
        fail_sign_out: bool,
    }

    impl ChannelBackend {
        fn new() -> Arc<Self> {
            Self::build(false)
        }

        fn failing_sign_out() -> Arc<Self> {
            Self::build(true)
        }

        fn build(fail_sign_out: bool) -> Arc<Self> {
            let (current, _) = watch::channel(None);
            Arc::new(Self {
                current,
                sign_outs: AtomicUsize::new(0),
                fail_sign_out,
            })
        }

        fn sign_in(&self, name: &str) {
            self.current.send_replace(Some(AuthUser {
                uid: UserId::new("u1"),
                display_name: Some(name.to_owned()),
                email: None,
                id_token: SecretString::from("t"),
            }));
        }
    }

    #[async_trait]
    impl IdentityBackend for ChannelBackend {
        async fn subscribe(&self) -> AuthStateReceiver {
            self.current.subscribe()
        }
        fn current_user(&self) -> Option<AuthUser> {
            self.current.borrow().clone()
        }
        async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<AuthUser, IdentityError> {
            unimplemented!()
        }
        async fn create_account(&self, _: &str, _: &str) -> Result<AuthUser, IdentityError> {
            unimplemented!()
        }
        async fn update_display_name(&self, _: &AuthUser, _: &str) -> Result<AuthUser, IdentityError> {
            unimplemented!()
        }
        async fn sign_in_with_federated(
            &self,
            _: &FederatedCredential,
        ) -> Result<AuthUser, IdentityError> {
            unimplemented!()
        }
        async fn send_password_reset(&self, _: &str) -> Result<(), IdentityError> {
            unimplemented!()
        }
        async fn sign_out(&self) -> Result<(), IdentityError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out {
                return Err(IdentityError::Unknown("network down".to_owned()));
            }
            self.current.send_replace(None);
            Ok(())
        }
    }

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_disabled_backend_settles_loading() {
        let store = SessionStore::start(Arc::new(DisabledIdentity));
        let state = store.wait_for(|s| !s.is_loading, WAIT).await;
        assert!(!state.is_loading);
        assert!(state.identity.is_none());
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_logout() {
        let backend = ChannelBackend::new();
        let store = SessionStore::start(backend.clone());
        store.wait_for(|s| !s.is_loading, WAIT).await;

        backend.sign_in("Ada");
        let state = store.wait_for(|s| s.identity.is_some(), WAIT).await;
        let identity = state.identity.unwrap();
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.email, "");

        store.logout().await;
        assert!(store.snapshot().identity.is_none());
    }

    #[tokio::test]
    async fn test_failed_logout_keeps_state() {
        let backend = ChannelBackend::failing_sign_out();
        let store = SessionStore::start(backend.clone());
        backend.sign_in("Ada");
        let before = store.wait_for(|s| s.identity.is_some(), WAIT).await;

        store.logout().await;
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_logout_when_signed_out_skips_backend() {
        let backend = ChannelBackend::new();
        let store = SessionStore::start(backend.clone());
        store.wait_for(|s| !s.is_loading, WAIT).await;

        store.logout().await;
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 0);
        assert!(store.snapshot().identity.is_none());
    }

    #[tokio::test]
    async fn test_stop_ignores_later_notifications() {
        let backend = ChannelBackend::new();
        let store = SessionStore::start(backend.clone());
        store.wait_for(|s| !s.is_loading, WAIT).await;

        store.stop();
        tokio::task::yield_now().await;
        backend.sign_in("Ada");
        let state = store.wait_for(|s| s.identity.is_some(), Duration::from_millis(100)).await;
        assert!(state.identity.is_none());
    }
}
