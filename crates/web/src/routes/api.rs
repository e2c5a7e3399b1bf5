//! JSON API route handlers.

use axum::{Json, extract::State};
use pillow_ease_core::{DeviceState, Recommendation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::Client;
use crate::services::SessionState;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub feeling: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendation: Recommendation,
    /// Device state after applying the recommendation.
    pub device: DeviceState,
}

/// `GET /api/session`
pub async fn session(Client(client): Client) -> Json<SessionState> {
    Json(client.store().snapshot())
}

/// `GET /api/device`
pub async fn device(Client(client): Client) -> Result<Json<DeviceState>> {
    let view = client
        .dashboard()
        .await
        .ok_or_else(|| AppError::NotFound("no dashboard mounted".to_owned()))?;
    Ok(Json(view.snapshot().await))
}

/// `POST /api/recommendation`
///
/// Same rules as the dashboard's coach form: needs a mounted dashboard with
/// the device on. Model failures still answer 200 with the fallback.
pub async fn recommendation(
    State(state): State<AppState>,
    Client(client): Client,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    let feeling = request.feeling.trim();
    if feeling.is_empty() {
        return Err(AppError::BadRequest("feeling must not be empty".to_owned()));
    }

    let view = client
        .dashboard()
        .await
        .ok_or_else(|| AppError::NotFound("no dashboard mounted".to_owned()))?;
    if !view.snapshot().await.is_on {
        return Err(AppError::BadRequest("device is off".to_owned()));
    }

    let recommendation = state.recommender().recommend(feeling).await;
    let device = view.apply_recommendation(&recommendation).await;
    Ok(Json(RecommendationResponse {
        recommendation,
        device,
    }))
}
