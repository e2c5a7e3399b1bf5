//! Device dashboard route handlers.
//!
//! `GET /dashboard` mounts the client's dashboard view (connecting the
//! simulated pillow after a delay); the form posts drive it. Posts without a
//! mounted view go back to `/dashboard` so the gate can run.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use pillow_ease_core::{DeviceState, HeatLevel, Identity, MassageMode};
use serde::Deserialize;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::Client;
use crate::services::{ClientSession, DashboardView, View};
use crate::state::AppState;

use super::{gate, gated};

#[derive(Debug, Deserialize)]
pub struct HeatForm {
    pub heat: HeatLevel,
}

#[derive(Debug, Deserialize)]
pub struct IntensityForm {
    pub intensity: u8,
}

#[derive(Debug, Deserialize)]
pub struct ModeForm {
    pub mode: MassageMode,
}

#[derive(Debug, Deserialize)]
pub struct CoachForm {
    #[serde(default)]
    pub feeling: String,
}

// =============================================================================
// Templates
// =============================================================================

/// One button in a segmented control.
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub identity: Option<Identity>,
    pub device: DeviceState,
    /// One-shot message, e.g. the AI coach's reasoning.
    pub flash: Option<String>,
    pub heat_levels: Vec<Choice>,
    pub modes: Vec<Choice>,
    /// CSS modifier for the glow behind the pillow.
    pub mode_class: String,
}

impl DashboardTemplate {
    fn new(identity: Option<Identity>, device: DeviceState, flash: Option<String>) -> Self {
        let heat_levels = HeatLevel::ALL
            .into_iter()
            .map(|level| Choice {
                value: level.as_str(),
                label: level.as_str(),
                selected: level == device.heat,
            })
            .collect();
        let modes = MassageMode::MANUAL
            .into_iter()
            .map(|mode| Choice {
                value: mode.as_str(),
                label: mode.label(),
                selected: mode == device.mode,
            })
            .collect();

        Self {
            identity,
            mode_class: device.mode.as_str().to_lowercase().replace('_', "-"),
            device,
            flash,
            heat_levels,
            modes,
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the dashboard, mounting it if needed.
pub async fn show(State(state): State<AppState>, Client(client): Client) -> Response {
    let (gate, session) = gate(&client, View::Dashboard).await;
    if let Some(response) = gated(gate) {
        return response;
    }

    let view = client.ensure_dashboard(state.config().connect_delay).await;
    let device = view.snapshot().await;
    DashboardTemplate::new(session.identity, device, view.take_flash()).into_response()
}

/// The mounted dashboard, if any.
async fn mounted(client: &ClientSession) -> Option<Arc<DashboardView>> {
    let view = client.dashboard().await;
    if view.is_none() {
        tracing::debug!("Dashboard post without a mounted view");
    }
    view
}

/// Toggle power.
pub async fn power(Client(client): Client) -> Redirect {
    if let Some(view) = mounted(&client).await {
        let device = view.toggle_power().await;
        tracing::debug!(is_on = device.is_on, "Power toggled");
    }
    Redirect::to(View::Dashboard.path())
}

/// Set the heat level. Ignored while off.
pub async fn heat(Client(client): Client, Form(form): Form<HeatForm>) -> Redirect {
    if let Some(view) = mounted(&client).await {
        view.set_heat(form.heat).await;
    }
    Redirect::to(View::Dashboard.path())
}

/// Set the intensity. Ignored while off.
pub async fn intensity(Client(client): Client, Form(form): Form<IntensityForm>) -> Redirect {
    if let Some(view) = mounted(&client).await {
        view.set_intensity(form.intensity).await;
    }
    Redirect::to(View::Dashboard.path())
}

/// Set the massage mode. Ignored while off.
pub async fn mode(Client(client): Client, Form(form): Form<ModeForm>) -> Redirect {
    if let Some(view) = mounted(&client).await {
        let device = view.set_mode(form.mode).await;
        add_breadcrumb("dashboard", "Mode selected", Some(&[("mode", device.mode.as_str())]));
    }
    Redirect::to(View::Dashboard.path())
}

/// Ask the AI coach and apply its answer.
///
/// Needs the device on and a non-empty description; otherwise nothing happens.
pub async fn coach(
    State(state): State<AppState>,
    Client(client): Client,
    Form(form): Form<CoachForm>,
) -> Redirect {
    let Some(view) = mounted(&client).await else {
        return Redirect::to(View::Dashboard.path());
    };

    let feeling = form.feeling.trim();
    if feeling.is_empty() || !view.snapshot().await.is_on {
        return Redirect::to(View::Dashboard.path());
    }

    add_breadcrumb("dashboard", "AI coach asked", None);
    let recommendation = state.recommender().recommend(feeling).await;
    view.apply_recommendation(&recommendation).await;
    view.set_flash(format!("AI Coach: {}", recommendation.reasoning));

    Redirect::to(View::Dashboard.path())
}
