//! Credential flow route handlers.
//!
//! The form state (current view, echoed fields, messages, in-flight flag)
//! lives in the client session; these handlers render it and feed it posts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use pillow_ease_core::Identity;
use serde::Deserialize;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::Client;
use crate::services::{AuthView, CredentialFlow, CredentialForm, SubmitOutcome, View};
use crate::state::AppState;

use super::{gate, gated};

/// Posted by the view switch links.
#[derive(Debug, Deserialize)]
pub struct ViewForm {
    pub view: AuthView,
}

// =============================================================================
// Templates
// =============================================================================

/// Auth page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub identity: Option<Identity>,
    pub view: AuthView,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
    pub in_flight: bool,
    pub google_enabled: bool,
}

impl AuthTemplate {
    fn new(flow: &CredentialFlow, google_enabled: bool) -> Self {
        Self {
            identity: None,
            view: flow.view(),
            name: flow.form().name.clone(),
            email: flow.form().email.clone(),
            error: flow.error().map(str::to_owned),
            success: flow.success().map(str::to_owned),
            in_flight: flow.in_flight(),
            google_enabled,
        }
    }

    const fn is_login(&self) -> bool {
        matches!(self.view, AuthView::Login)
    }

    const fn is_signup(&self) -> bool {
        matches!(self.view, AuthView::Signup)
    }

    const fn is_forgot(&self) -> bool {
        matches!(self.view, AuthView::Forgot)
    }

    const fn title(&self) -> &'static str {
        match self.view {
            AuthView::Login => "Welcome Back",
            AuthView::Signup => "Create Account",
            AuthView::Forgot => "Reset Password",
        }
    }

    const fn subtitle(&self) -> &'static str {
        match self.view {
            AuthView::Login => "Enter your details to access your PillowEase.",
            AuthView::Signup => "Join thousands of happy sleepers today.",
            AuthView::Forgot => "We'll email you a link to choose a new password.",
        }
    }

    const fn submit_label(&self) -> &'static str {
        match self.view {
            AuthView::Login => "Sign In",
            AuthView::Signup => "Create Account",
            AuthView::Forgot => "Send Reset Link",
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the auth page.
///
/// Signed-in sessions go straight to the dashboard.
pub async fn auth_page(State(state): State<AppState>, Client(client): Client) -> Response {
    client.unmount_dashboard().await;

    let (gate, _) = gate(&client, View::Auth).await;
    if let Some(response) = gated(gate) {
        return response;
    }

    let flow = client.flow().lock().await;
    AuthTemplate::new(&flow, state.google().is_some()).into_response()
}

/// Switch between login, signup and forgot-password.
pub async fn switch_view(Client(client): Client, Form(form): Form<ViewForm>) -> Redirect {
    let mut flow = client.flow().lock().await;
    if !flow.switch_to(form.view) {
        tracing::debug!(
            from = flow.view().as_str(),
            to = form.view.as_str(),
            "View switch ignored"
        );
    }
    Redirect::to(View::Auth.path())
}

/// Submit the form for the current view.
pub async fn submit(Client(client): Client, Form(form): Form<CredentialForm>) -> Redirect {
    match client.submit_credentials(form).await {
        Ok(SubmitOutcome::SignedIn(identity)) => {
            set_sentry_user(&identity.id, Some(&identity.email));
            tracing::info!(uid = %identity.id, "Signed in");
            Redirect::to(View::Dashboard.path())
        }
        Ok(SubmitOutcome::ResetEmailSent) => Redirect::to(View::Auth.path()),
        Err(err) => {
            tracing::debug!(error = %err, "Submission rejected");
            Redirect::to(View::Auth.path())
        }
    }
}

/// Log out and return to the landing page.
pub async fn logout(Client(client): Client) -> Redirect {
    client.logout().await;
    clear_sentry_user();
    Redirect::to(View::Landing.path())
}
