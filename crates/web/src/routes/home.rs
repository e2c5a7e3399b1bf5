//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use pillow_ease_core::Identity;

use crate::filters;
use crate::middleware::Client;

/// A marketing feature card.
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        title: "Dual-Zone Heating",
        description: "Independent heat controls for neck and shoulders to melt away tension.",
    },
    Feature {
        title: "AI Stress Response",
        description: "Our algorithm detects muscle rigidity and adjusts intensity automatically.",
    },
    Feature {
        title: "10-Hour Battery",
        description: "Take comfort anywhere. One charge lasts for a week of nightly sessions.",
    },
];

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub identity: Option<Identity>,
    pub features: &'static [Feature],
}

/// Neutral page shown while the session is still being established.
///
/// Refreshes itself until the gate resolves.
#[derive(Default, Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub identity: Option<Identity>,
}

/// Display the landing page.
///
/// Leaving the dashboard unmounts it.
pub async fn landing(Client(client): Client) -> impl IntoResponse {
    client.unmount_dashboard().await;

    LandingTemplate {
        identity: client.store().snapshot().identity,
        features: &FEATURES,
    }
}
