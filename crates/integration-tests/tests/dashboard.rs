//! Integration tests for the device dashboard and the AI coach.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use pillow_ease_integration_tests::{
    MockIdentity, MockModel, TEST_CONNECT_DELAY, TestApp, TestResponse,
};
use serde_json::json;

const WAVE_ANSWER: &str = r#"{"mode":"WAVE","intensity":40,"heat":"HIGH","duration":20,"reasoning":"Gentle waves for a tired neck."}"#;

/// Sign in and open the dashboard.
async fn mounted_app(model: Option<Arc<MockModel>>) -> TestApp {
    let identity = MockIdentity::new();
    let app = match model {
        Some(model) => TestApp::with_model(identity, model),
        None => TestApp::new(identity),
    };
    app.sign_in("Ada").await;
    let page = app.get("/dashboard").await;
    assert_eq!(page.status, StatusCode::OK);
    app
}

async fn device(app: &TestApp) -> serde_json::Value {
    let response = app.get("/api/device").await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()
}

fn assert_back_to_dashboard(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/dashboard"));
}

#[tokio::test]
async fn test_fresh_dashboard_defaults() {
    let app = mounted_app(None).await;

    let state = device(&app).await;
    assert_eq!(state["isOn"], false);
    assert_eq!(state["isConnected"], false);
    assert_eq!(state["mode"], "KNEADING");
    assert_eq!(state["intensity"], 30);
    assert_eq!(state["heat"], "OFF");
    assert_eq!(state["timer"], 15);

    let page = app.get("/dashboard").await;
    assert!(page.body.contains("STANDBY"));
    assert!(page.body.contains("Searching..."));
    assert!(page.body.contains("http-equiv=\"refresh\""));
}

#[tokio::test]
async fn test_connects_after_delay() {
    let app = mounted_app(None).await;
    assert_eq!(device(&app).await["isConnected"], false);

    tokio::time::sleep(TEST_CONNECT_DELAY * 4).await;
    assert_eq!(device(&app).await["isConnected"], true);

    let page = app.get("/dashboard").await;
    assert!(!page.body.contains("Searching..."));
    assert!(!page.body.contains("http-equiv=\"refresh\""));
}

#[tokio::test]
async fn test_controls_ignored_while_off() {
    let app = mounted_app(None).await;

    assert_back_to_dashboard(&app.post_form("/dashboard/heat", &[("heat", "HIGH")]).await);
    assert_back_to_dashboard(&app.post_form("/dashboard/intensity", &[("intensity", "80")]).await);
    assert_back_to_dashboard(&app.post_form("/dashboard/mode", &[("mode", "WAVE")]).await);

    let state = device(&app).await;
    assert_eq!(state["heat"], "OFF");
    assert_eq!(state["intensity"], 30);
    assert_eq!(state["mode"], "KNEADING");
}

#[tokio::test]
async fn test_power_toggle_pair_restores_state() {
    let app = mounted_app(None).await;
    let mut before = device(&app).await;
    before.as_object_mut().unwrap().remove("isConnected");

    app.post_form("/dashboard/power", &[]).await;
    assert_eq!(device(&app).await["isOn"], true);
    let page = app.get("/dashboard").await;
    assert!(page.body.contains("KNEADING"));
    assert!(page.body.contains("15 MIN REMAINING"));

    app.post_form("/dashboard/power", &[]).await;
    let mut after = device(&app).await;
    after.as_object_mut().unwrap().remove("isConnected");
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_controls_apply_while_on() {
    let app = mounted_app(None).await;
    app.post_form("/dashboard/power", &[]).await;

    app.post_form("/dashboard/heat", &[("heat", "LOW")]).await;
    app.post_form("/dashboard/intensity", &[("intensity", "75")])
        .await;
    app.post_form("/dashboard/mode", &[("mode", "SHIATSU")])
        .await;

    let state = device(&app).await;
    assert_eq!(state["heat"], "LOW");
    assert_eq!(state["intensity"], 75);
    assert_eq!(state["mode"], "SHIATSU");

    let page = app.get("/dashboard").await;
    assert!(page.body.contains("75%"));
    assert!(page.body.contains("mode-shiatsu"));
}

#[tokio::test]
async fn test_ai_adaptive_not_manually_selectable() {
    let app = mounted_app(None).await;
    app.post_form("/dashboard/power", &[]).await;

    app.post_form("/dashboard/mode", &[("mode", "AI_ADAPTIVE")])
        .await;
    assert_eq!(device(&app).await["mode"], "KNEADING");
}

#[tokio::test]
async fn test_invalid_control_value_is_rejected() {
    let app = mounted_app(None).await;
    app.post_form("/dashboard/power", &[]).await;

    let response = app
        .post_form("/dashboard/heat", &[("heat", "SCALDING")])
        .await;
    assert!(response.status.is_client_error());
    assert_eq!(device(&app).await["heat"], "OFF");
}

#[tokio::test]
async fn test_coach_applies_recommendation() {
    let model = MockModel::answering(WAVE_ANSWER);
    let app = mounted_app(Some(Arc::clone(&model))).await;
    app.post_form("/dashboard/power", &[]).await;

    let response = app
        .post_form("/dashboard/coach", &[("feeling", "stiff neck from coding")])
        .await;
    assert_back_to_dashboard(&response);
    assert_eq!(model.calls(), 1);
    assert!(
        model
            .last_user_text()
            .unwrap()
            .contains("stiff neck from coding")
    );

    let state = device(&app).await;
    assert_eq!(state["isOn"], true);
    assert_eq!(state["mode"], "WAVE");
    assert_eq!(state["intensity"], 40);
    assert_eq!(state["heat"], "HIGH");
    assert_eq!(state["timer"], 20);

    let page = app.get("/dashboard").await;
    assert!(page.body.contains("AI Coach: Gentle waves for a tired neck."));
    assert!(page.body.contains("20 MIN REMAINING"));

    let page = app.get("/dashboard").await;
    assert!(!page.body.contains("AI Coach:"));
}

#[tokio::test]
async fn test_coach_falls_back_when_model_fails() {
    let model = MockModel::failing();
    let app = mounted_app(Some(Arc::clone(&model))).await;
    app.post_form("/dashboard/power", &[]).await;
    app.post_form("/dashboard/mode", &[("mode", "PULSE")]).await;

    app.post_form("/dashboard/coach", &[("feeling", "just tired")])
        .await;
    assert_eq!(model.calls(), 1);

    let state = device(&app).await;
    assert_eq!(state["mode"], "KNEADING");
    assert_eq!(state["intensity"], 50);
    assert_eq!(state["heat"], "LOW");
    assert_eq!(state["timer"], 15);

    let page = app.get("/dashboard").await;
    assert!(page.body.contains("balanced default for you."));
}

#[tokio::test]
async fn test_coach_ignored_while_off_or_empty() {
    let model = MockModel::answering(WAVE_ANSWER);
    let app = mounted_app(Some(Arc::clone(&model))).await;

    app.post_form("/dashboard/coach", &[("feeling", "sore back")])
        .await;
    assert_eq!(model.calls(), 0);
    assert_eq!(device(&app).await["isOn"], false);

    app.post_form("/dashboard/power", &[]).await;
    app.post_form("/dashboard/coach", &[("feeling", "   ")]).await;
    assert_eq!(model.calls(), 0);
    assert_eq!(device(&app).await["mode"], "KNEADING");
}

#[tokio::test]
async fn test_out_of_range_recommendation_is_clamped_on_device() {
    let model = MockModel::answering(
        r#"{"mode":"AI_ADAPTIVE","intensity":150,"heat":"LOW","duration":90,"reasoning":"Max it out."}"#,
    );
    let app = mounted_app(Some(model)).await;
    app.post_form("/dashboard/power", &[]).await;
    app.post_form("/dashboard/coach", &[("feeling", "stressed")])
        .await;

    let state = device(&app).await;
    assert_eq!(state["mode"], "AI_ADAPTIVE");
    assert_eq!(state["intensity"], 100);
    assert_eq!(state["timer"], 90);

    let page = app.get("/dashboard").await;
    assert!(page.body.contains("AI ADAPTIVE"));
}

#[tokio::test]
async fn test_leaving_dashboard_unmounts_it() {
    let app = mounted_app(None).await;
    app.post_form("/dashboard/power", &[]).await;
    assert_eq!(app.get("/api/device").await.status, StatusCode::OK);

    app.get("/").await;
    assert_eq!(app.get("/api/device").await.status, StatusCode::NOT_FOUND);

    // Remounting starts from defaults
    app.get("/dashboard").await;
    let state = device(&app).await;
    assert_eq!(state["isOn"], false);
    assert_eq!(state["isConnected"], false);
}

#[tokio::test]
async fn test_unmount_cancels_pending_connect() {
    let app = mounted_app(None).await;
    app.get("/").await;
    tokio::time::sleep(TEST_CONNECT_DELAY * 3).await;

    app.get("/dashboard").await;
    assert_eq!(device(&app).await["isConnected"], false);
}

#[tokio::test]
async fn test_posts_without_mounted_dashboard_redirect() {
    let app = TestApp::new(MockIdentity::new());
    let response = app.post_form("/dashboard/power", &[]).await;
    assert_back_to_dashboard(&response);

    let response = app.get("/dashboard").await;
    assert_eq!(response.location(), Some("/auth"));
}

#[tokio::test]
async fn test_recommendation_api() {
    let model = MockModel::answering(WAVE_ANSWER);
    let app = mounted_app(Some(Arc::clone(&model))).await;

    let response = app
        .post_json("/api/recommendation", &json!({ "feeling": "sore" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);

    app.post_form("/dashboard/power", &[]).await;
    let response = app
        .post_json("/api/recommendation", &json!({ "feeling": "  " }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json("/api/recommendation", &json!({ "feeling": "sore neck" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["recommendation"]["mode"], "WAVE");
    assert_eq!(body["recommendation"]["duration"], 20);
    assert_eq!(body["device"]["mode"], "WAVE");
    assert_eq!(body["device"]["timer"], 20);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_recommendation_api_without_dashboard() {
    let app = TestApp::new(MockIdentity::new());
    let response = app
        .post_json("/api/recommendation", &json!({ "feeling": "sore" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
