// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::*;

async fn login_handler(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
    if body.get("mfa_code").is_none() {
        let status = StatusCode::from_u16(482).unwrap_or(StatusCode::IM_A_TEAPOT);
        return (status, Json(serde_json::json!({ "mfa_token": "MT1" })));
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({ "access_token": "A", "refresh_token": "R" })),
    )
}

async fn babies_handler(
    State(expected_token): State<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if auth != expected_token {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "babies": [{ "uid": "b1", "name": "June", "camera_uid": "c1" }]
        })),
    )
}

fn http_client() -> reqwest::Client {
    crate::transport::ws::ensure_crypto_provider();
    reqwest::Client::new()
}

async fn spawn_api(expected_token: &str) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = Router::new()
        .route("/login", post(login_handler))
        .route("/babies", get(babies_handler))
        .with_state(expected_token.to_owned());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

// ── authentication ────────────────────────────────────────────────────

#[tokio::test]
async fn login_mfa_flow_installs_token_manager() -> anyhow::Result<()> {
    let base = spawn_api("A").await?;
    let client = Client::with_base_url(http_client(), &base);
    assert!(client.token_manager().is_none());

    let err = client.login("a@b.c", "pw").await.unwrap_err();
    let Error::MfaRequired { mfa_token } = err else {
        anyhow::bail!("expected MfaRequired, got {err:?}");
    };
    assert_eq!(mfa_token, "MT1");
    assert!(client.token_manager().is_none(), "failed login must not authenticate");

    let pair = client.verify_mfa("a@b.c", "pw", &mfa_token, "123456").await?;
    assert_eq!(pair.access_token, "A");
    assert_eq!(pair.refresh_token, "R");
    assert!(client.token_manager().is_some());

    let babies = client.get_babies().await?;
    assert_eq!(babies.len(), 1);
    assert_eq!(babies[0].camera_uid, "c1");
    Ok(())
}

#[tokio::test]
async fn restore_tokens_authenticates_without_login() -> anyhow::Result<()> {
    let base = spawn_api("AT").await?;
    let client = Client::with_base_url(http_client(), &base);
    client.restore_tokens("AT", "RT");

    let babies = client.get_babies().await?;
    assert_eq!(babies[0].uid, "b1");
    Ok(())
}

#[tokio::test]
async fn unauthenticated_calls_fail_with_auth_error() {
    let client = Client::with_base_url(http_client(), "http://127.0.0.1:1");
    assert!(matches!(client.get_babies().await, Err(Error::Auth(_))));
    assert!(matches!(client.get_events("b1", 10).await, Err(Error::Auth(_))));
    assert!(matches!(
        client.camera("c1", "b1", CameraConfig::default()),
        Err(Error::Auth(_))
    ));
}

// ── camera cache ──────────────────────────────────────────────────────

#[tokio::test]
async fn camera_is_cached_by_uid() -> anyhow::Result<()> {
    let client = Client::with_base_url(http_client(), "http://127.0.0.1:1");
    client.restore_tokens("AT", "RT");

    let first = client.camera("c1", "b1", CameraConfig::default())?;
    let again = client.camera("c1", "b1", CameraConfig::default())?;
    let other = client.camera("c2", "b2", CameraConfig::default())?;

    assert!(first.ptr_eq(&again));
    assert!(!first.ptr_eq(&other));
    Ok(())
}

#[tokio::test]
async fn close_stops_and_clears_cameras() -> anyhow::Result<()> {
    let client = Client::with_base_url(http_client(), "http://127.0.0.1:1");
    client.restore_tokens("AT", "RT");

    let camera = client.camera("c1", "b1", CameraConfig::default())?;
    client.close();
    assert!(!camera.is_connected());

    // The cache was cleared, so the next lookup builds a fresh controller.
    let rebuilt = client.camera("c1", "b1", CameraConfig::default())?;
    assert!(!camera.ptr_eq(&rebuilt));
    Ok(())
}
