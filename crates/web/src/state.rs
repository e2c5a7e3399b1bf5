//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::firebase::{
    DisabledIdentity, DisabledProfileStore, FirebaseAuth, FirestoreClient, GoogleOAuthClient,
    IdentityBackend, IdentityToolkitClient, ProfileStore,
};
use crate::gemini::{GeminiClient, GenerativeModel};
use crate::services::{ClientRegistry, IdentityFactory, RecommendationClient};

/// External services the app talks to.
///
/// Built from configuration in production; tests swap in mocks.
pub struct Backends {
    /// Creates one identity backend per client session.
    pub identity: IdentityFactory,
    pub profiles: Arc<dyn ProfileStore>,
    pub model: Option<Arc<dyn GenerativeModel>>,
    pub google: Option<GoogleOAuthClient>,
}

impl Backends {
    /// Real clients for every configured service, disabled stand-ins for the rest.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let identity: IdentityFactory;
        let profiles: Arc<dyn ProfileStore>;
        let mut google = None;

        if let Some(firebase) = &config.firebase {
            let toolkit = IdentityToolkitClient::new(firebase);
            identity = Arc::new(move || -> Arc<dyn IdentityBackend> {
                Arc::new(FirebaseAuth::new(toolkit.clone()))
            });
            profiles = Arc::new(FirestoreClient::new(firebase));
            google = config.google_oauth.as_ref().map(GoogleOAuthClient::new);
        } else {
            identity = Arc::new(|| -> Arc<dyn IdentityBackend> { Arc::new(DisabledIdentity) });
            profiles = Arc::new(DisabledProfileStore);
        }

        let model = config.gemini.as_ref().map(|gemini| -> Arc<dyn GenerativeModel> {
            let client = GeminiClient::new(gemini);
            tracing::info!(model = client.model(), "AI coach enabled");
            Arc::new(client)
        });

        Self {
            identity,
            profiles,
            model,
            google,
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    registry: ClientRegistry,
    recommender: RecommendationClient,
    google: Option<GoogleOAuthClient>,
}

impl AppState {
    /// Create application state with clients built from `config`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let backends = Backends::from_config(&config);
        Self::with_backends(config, backends)
    }

    /// Create application state around the given backends.
    #[must_use]
    pub fn with_backends(config: AppConfig, backends: Backends) -> Self {
        let registry = ClientRegistry::new(
            config.client_idle_timeout,
            backends.identity,
            backends.profiles,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                recommender: RecommendationClient::new(backends.model),
                google: backends.google,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Per-browser client sessions.
    #[must_use]
    pub fn registry(&self) -> &ClientRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn recommender(&self) -> &RecommendationClient {
        &self.inner.recommender
    }

    /// Google sign-in client, when federated login is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleOAuthClient> {
        self.inner.google.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_state_disables_integrations() {
        let state = AppState::new(AppConfig::default());
        assert!(state.google().is_none());
        assert!(!state.recommender().is_enabled());
    }
}
