//! Integration tests for PillowEase.
//!
//! Drives the full router (session cookies, security headers, templates)
//! in-process with `tower::ServiceExt::oneshot`; no network and no real
//! Firebase or Gemini.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pillow-ease-integration-tests
//! ```
//!
//! # Test Support
//!
//! - [`MockIdentity`] - In-memory identity backend with call counting
//! - [`MockProfileStore`] - In-memory profile documents
//! - [`MockModel`] - Canned generative-model answers
//! - [`TestApp`] - Router plus a one-browser cookie jar

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use pillow_ease_core::{ProfileRecord, UserId};
use pillow_ease_web::{
    app,
    config::AppConfig,
    firebase::{
        AuthStateReceiver, AuthUser, FederatedCredential, IdentityBackend, IdentityError,
        ProfileStore, ProfileStoreError,
    },
    gemini::{GeminiError, GenerativeModel, StructuredRequest},
    services::IdentityFactory,
    state::{AppState, Backends},
};
use secrecy::SecretString;
use tokio::sync::watch;
use tower::ServiceExt;

/// Connect delay used by test apps.
pub const TEST_CONNECT_DELAY: Duration = Duration::from_millis(250);

// =============================================================================
// Identity
// =============================================================================

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// In-memory identity backend.
///
/// One instance is shared by every client of a [`TestApp`], so a test acts
/// as a single browser.
pub struct MockIdentity {
    current: watch::Sender<Option<AuthUser>>,
    /// `subscribe` resolves only once this is `true`.
    ready: watch::Sender<bool>,
    accounts: Mutex<HashMap<String, Account>>,
    calls: AtomicUsize,
}

impl MockIdentity {
    /// A backend that reports its (signed-out) state immediately.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::build(true)
    }

    /// A backend whose first auth-state notification waits for [`Self::release`].
    #[must_use]
    pub fn held() -> Arc<Self> {
        Self::build(false)
    }

    fn build(ready: bool) -> Arc<Self> {
        let (current, _) = watch::channel(None);
        let (ready, _) = watch::channel(ready);
        Arc::new(Self {
            current,
            ready,
            accounts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Let pending subscriptions resolve.
    pub fn release(&self) {
        self.ready.send_replace(true);
    }

    /// Register an account without going through signup.
    pub fn add_account(&self, email: &str, password: &str, display_name: &str) {
        let uid = format!("uid-{}", self.accounts.lock().unwrap().len() + 1);
        self.accounts.lock().unwrap().insert(
            email.to_owned(),
            Account {
                uid,
                password: password.to_owned(),
                display_name: Some(display_name.to_owned()),
            },
        );
    }

    /// Backend operations invoked so far (subscriptions excluded).
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn factory(self: &Arc<Self>) -> IdentityFactory {
        let identity = Arc::clone(self);
        Arc::new(move || -> Arc<dyn IdentityBackend> { Arc::clone(&identity) as _ })
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn signed_in(&self, uid: &str, email: Option<&str>, display_name: Option<&str>) -> AuthUser {
        let user = AuthUser {
            uid: UserId::new(uid),
            display_name: display_name.map(str::to_owned),
            email: email.map(str::to_owned),
            id_token: SecretString::from(format!("token-{uid}")),
        };
        self.current.send_replace(Some(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityBackend for MockIdentity {
    async fn subscribe(&self) -> AuthStateReceiver {
        let mut ready = self.ready.subscribe();
        let _ = ready.wait_for(|ready| *ready).await;
        self.current.subscribe()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        self.record_call();
        let (uid, name) = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => {
                    (account.uid.clone(), account.display_name.clone())
                }
                _ => return Err(IdentityError::InvalidCredential),
            }
        };
        Ok(self.signed_in(&uid, Some(email), name.as_deref()))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, IdentityError> {
        self.record_call();
        let uid = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(IdentityError::EmailAlreadyRegistered);
            }
            let uid = format!("uid-{}", accounts.len() + 1);
            accounts.insert(
                email.to_owned(),
                Account {
                    uid: uid.clone(),
                    password: password.to_owned(),
                    display_name: None,
                },
            );
            uid
        };
        Ok(self.signed_in(&uid, Some(email), None))
    }

    async fn update_display_name(
        &self,
        user: &AuthUser,
        display_name: &str,
    ) -> Result<AuthUser, IdentityError> {
        self.record_call();
        if let Some(email) = &user.email
            && let Some(account) = self.accounts.lock().unwrap().get_mut(email)
        {
            account.display_name = Some(display_name.to_owned());
        }
        Ok(self.signed_in(
            user.uid.as_str(),
            user.email.as_deref(),
            Some(display_name),
        ))
    }

    async fn sign_in_with_federated(
        &self,
        _credential: &FederatedCredential,
    ) -> Result<AuthUser, IdentityError> {
        self.record_call();
        Ok(self.signed_in("google-uid", Some("sam@example.com"), Some("Sam")))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.record_call();
        if self.accounts.lock().unwrap().contains_key(email) {
            Ok(())
        } else {
            Err(IdentityError::UserNotFound)
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.record_call();
        self.current.send_replace(None);
        Ok(())
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// In-memory profile documents keyed by uid.
#[derive(Default)]
pub struct MockProfileStore {
    profiles: Mutex<HashMap<String, ProfileRecord>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockProfileStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn profile(&self, uid: &str) -> Option<ProfileRecord> {
        self.profiles.lock().unwrap().get(uid).cloned()
    }

    /// Writes attempted so far, failed ones included.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every later write fail with a 503.
    pub fn fail_writes(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn read_profile(
        &self,
        user: &AuthUser,
    ) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        Ok(self.profile(user.uid.as_str()))
    }

    async fn write_profile(
        &self,
        user: &AuthUser,
        profile: &ProfileRecord,
    ) -> Result<(), ProfileStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Api {
                status: 503,
                message: "unavailable".to_owned(),
            });
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(user.uid.as_str().to_owned(), profile.clone());
        Ok(())
    }
}

// =============================================================================
// Generative Model
// =============================================================================

/// Generative model with a fixed answer.
pub struct MockModel {
    answer: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<String>>,
}

impl MockModel {
    /// Always answers with `json`.
    #[must_use]
    pub fn answering(json: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(json.to_owned()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    /// Always fails.
    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User text of the most recent request.
    #[must_use]
    pub fn last_user_text(&self) -> Option<String> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate_structured(&self, request: &StructuredRequest) -> Result<String, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.user_text.clone());
        self.answer.clone().ok_or(GeminiError::RateLimited)
    }
}

// =============================================================================
// Test App
// =============================================================================

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

/// The app under test plus one browser's session cookie.
pub struct TestApp {
    router: Router,
    cookie: Mutex<Option<String>>,
    pub identity: Arc<MockIdentity>,
    pub profiles: Arc<MockProfileStore>,
}

impl TestApp {
    /// App with the given identity backend and no AI coach.
    #[must_use]
    pub fn new(identity: Arc<MockIdentity>) -> Self {
        Self::build(identity, None)
    }

    /// App with the given identity backend and generative model.
    #[must_use]
    pub fn with_model(identity: Arc<MockIdentity>, model: Arc<MockModel>) -> Self {
        Self::build(identity, Some(model))
    }

    fn build(identity: Arc<MockIdentity>, model: Option<Arc<MockModel>>) -> Self {
        let profiles = MockProfileStore::new();
        let mut config = AppConfig::default();
        config.connect_delay = TEST_CONNECT_DELAY;
        let backends = Backends {
            identity: identity.factory(),
            profiles: Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            model: model.map(|model| model as Arc<dyn GenerativeModel>),
            google: None,
        };

        Self {
            router: app(AppState::with_backends(config, backends)),
            cookie: Mutex::new(None),
            identity,
            profiles,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::post(path).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(request, Body::from(body)).await
    }

    pub async fn post_json(&self, path: &str, json: &serde_json::Value) -> TestResponse {
        let request = Request::post(path).header(header::CONTENT_TYPE, "application/json");
        self.send(request, Body::from(json.to_string())).await
    }

    /// Log in through the form as a freshly registered account.
    pub async fn sign_in(&self, name: &str) -> TestResponse {
        let email = format!("{}@example.com", name.to_lowercase());
        self.identity.add_account(&email, "secret-pw", name);
        self.post_form(
            "/auth/submit",
            &[("email", email.as_str()), ("password", "secret-pw")],
        )
        .await
    }

    async fn send(&self, request: axum::http::request::Builder, body: Body) -> TestResponse {
        let cookie = self.cookie.lock().unwrap().clone();
        let request = match cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap_or_default()
                .to_owned();
            *self.cookie.lock().unwrap() = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
