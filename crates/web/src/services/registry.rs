//! Per-browser client sessions.
//!
//! Each browser (identified by a UUID in its cookie session) gets a
//! [`ClientSession`]: its own identity backend instance, session store,
//! credential flow and, while the dashboard is open, a [`DashboardView`].
//! Sessions idle for longer than the configured timeout are evicted, which
//! stops the store's subscription and cancels any pending device connect.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use pillow_ease_core::Identity;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::firebase::{FederatedCredential, IdentityBackend, ProfileStore};

use super::auth::{AuthError, CredentialFlow, CredentialForm, CredentialService, SubmitOutcome};
use super::dashboard::DashboardView;
use super::session_store::SessionStore;

/// How long a successful sign-in waits for the session store to catch up.
const SIGN_IN_SETTLE: Duration = Duration::from_millis(500);

const MAX_CLIENTS: u64 = 10_000;

/// Builds a fresh identity backend for each new client.
pub type IdentityFactory = Arc<dyn Fn() -> Arc<dyn IdentityBackend> + Send + Sync>;

// =============================================================================
// Client Session
// =============================================================================

/// Server-side state for one browser.
pub struct ClientSession {
    store: SessionStore,
    credentials: CredentialService,
    flow: Mutex<CredentialFlow>,
    dashboard: Mutex<Option<Arc<DashboardView>>>,
}

impl ClientSession {
    /// Create a session and start following `identity`.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            store: SessionStore::start(Arc::clone(&identity)),
            credentials: CredentialService::new(identity, profiles),
            flow: Mutex::new(CredentialFlow::default()),
            dashboard: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub const fn flow(&self) -> &Mutex<CredentialFlow> {
        &self.flow
    }

    /// Submit the auth form for the current view.
    ///
    /// Runs to completion even if the request that started it goes away, so
    /// the in-flight flag is always cleared.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Busy` without touching the backend while another
    /// submission is running; otherwise the submission's own error.
    pub async fn submit_credentials(
        self: &Arc<Self>,
        form: CredentialForm,
    ) -> Result<SubmitOutcome, AuthError> {
        let submission = self.flow.lock().await.begin(form)?;

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = session
                .credentials
                .submit(submission.view, &submission.form)
                .await;
            if matches!(result, Ok(SubmitOutcome::SignedIn(_))) {
                session.await_signed_in().await;
            }
            session.flow.lock().await.finish(&result);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                let result = Err(AuthError::Interrupted(join_error.to_string()));
                self.flow.lock().await.finish(&result);
                result
            }
        }
    }

    /// Complete a federated sign-in.
    ///
    /// # Errors
    ///
    /// Returns the backend's or profile store's error; cancellation is
    /// returned too but leaves no message on the form.
    pub async fn federated_sign_in(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Identity, AuthError> {
        let result = self.credentials.federated_sign_in(credential).await;
        if result.is_ok() {
            self.await_signed_in().await;
        }
        self.flow.lock().await.finish_federated(&result);
        result
    }

    async fn await_signed_in(&self) {
        self.store
            .wait_for(|state| state.identity.is_some(), SIGN_IN_SETTLE)
            .await;
    }

    /// The mounted dashboard, mounting a fresh one if there is none.
    pub async fn ensure_dashboard(&self, connect_delay: Duration) -> Arc<DashboardView> {
        let mut dashboard = self.dashboard.lock().await;
        Arc::clone(dashboard.get_or_insert_with(|| Arc::new(DashboardView::mount(connect_delay))))
    }

    /// The mounted dashboard, if any.
    pub async fn dashboard(&self) -> Option<Arc<DashboardView>> {
        self.dashboard.lock().await.clone()
    }

    /// Unmount the dashboard (navigating away).
    pub async fn unmount_dashboard(&self) {
        if let Some(view) = self.dashboard.lock().await.take() {
            view.unmount();
        }
    }

    /// Log out: unmount the dashboard, end the backend session, reset the form.
    pub async fn logout(&self) {
        self.unmount_dashboard().await;
        self.store.logout().await;
        self.flow.lock().await.reset();
    }
}

// =============================================================================
// Client Registry
// =============================================================================

/// Client sessions keyed by the browser's client ID.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<ClientRegistryInner>,
}

struct ClientRegistryInner {
    sessions: Cache<Uuid, Arc<ClientSession>>,
    identity_factory: IdentityFactory,
    profiles: Arc<dyn ProfileStore>,
}

impl ClientRegistry {
    /// Create a registry evicting clients idle for `idle_timeout`.
    #[must_use]
    pub fn new(
        idle_timeout: Duration,
        identity_factory: IdentityFactory,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_CLIENTS)
            .time_to_idle(idle_timeout)
            .eviction_listener(|client_id: Arc<Uuid>, _session, cause| {
                tracing::debug!(%client_id, ?cause, "Client session evicted");
            })
            .build();

        Self {
            inner: Arc::new(ClientRegistryInner {
                sessions,
                identity_factory,
                profiles,
            }),
        }
    }

    /// The session for `client_id`, created on first use.
    pub async fn get_or_create(&self, client_id: Uuid) -> Arc<ClientSession> {
        self.inner
            .sessions
            .get_with(client_id, async {
                tracing::debug!(%client_id, "Client session created");
                Arc::new(ClientSession::new(
                    (self.inner.identity_factory)(),
                    Arc::clone(&self.inner.profiles),
                ))
            })
            .await
    }

    /// The session for `client_id`, if one exists.
    pub async fn get(&self, client_id: Uuid) -> Option<Arc<ClientSession>> {
        self.inner.sessions.get(&client_id).await
    }
}
