//! Navigation gates driven by the session store.

use std::time::Duration;

use super::session_store::SessionState;

/// How long a gated route waits for the first auth-state notification
/// before rendering the loading page.
pub const FIRST_NOTIFICATION_GRACE: Duration = Duration::from_millis(250);

/// Top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Auth,
    Dashboard,
}

impl View {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Auth => "/auth",
            Self::Dashboard => "/dashboard",
        }
    }
}

/// What a route should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Render,
    /// Identity not known yet; show the neutral loading page.
    Loading,
    Redirect(View),
}

/// Decide whether `view` may render for `session`.
#[must_use]
pub const fn decide(view: View, session: &SessionState) -> Gate {
    match view {
        View::Landing => Gate::Render,
        _ if session.is_loading => Gate::Loading,
        View::Dashboard if session.identity.is_none() => Gate::Redirect(View::Auth),
        View::Auth if session.identity.is_some() => Gate::Redirect(View::Dashboard),
        View::Auth | View::Dashboard => Gate::Render,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pillow_ease_core::{Identity, UserId};

    fn signed_in() -> SessionState {
        SessionState {
            identity: Some(Identity::from_backend(UserId::new("u1"), Some("Ada"), None)),
            is_loading: false,
        }
    }

    fn signed_out() -> SessionState {
        SessionState {
            identity: None,
            is_loading: false,
        }
    }

    #[test]
    fn test_dashboard_requires_identity() {
        assert_eq!(decide(View::Dashboard, &signed_out()), Gate::Redirect(View::Auth));
        assert_eq!(decide(View::Dashboard, &signed_in()), Gate::Render);
    }

    #[test]
    fn test_auth_redirects_when_signed_in() {
        assert_eq!(decide(View::Auth, &signed_in()), Gate::Redirect(View::Dashboard));
        assert_eq!(decide(View::Auth, &signed_out()), Gate::Render);
    }

    #[test]
    fn test_loading_defers_gated_views() {
        let loading = SessionState::default();
        assert_eq!(decide(View::Dashboard, &loading), Gate::Loading);
        assert_eq!(decide(View::Auth, &loading), Gate::Loading);
        assert_eq!(decide(View::Landing, &loading), Gate::Render);
    }
}
