// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::*;

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_api(router: Router) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

fn client(base: &str) -> RestClient {
    crate::transport::ws::ensure_crypto_provider();
    RestClient::new(reqwest::Client::new(), base)
}

// ── login / MFA ───────────────────────────────────────────────────────

async fn login_handler(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
    if body["password"] == "wrong" {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
    }
    if body.get("mfa_code").is_none() {
        let status = StatusCode::from_u16(482).unwrap_or(StatusCode::IM_A_TEAPOT);
        return (status, Json(serde_json::json!({ "mfa_token": "MT1" })));
    }
    assert_eq!(body["mfa_token"], "MT1");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "access_token": "A", "refresh_token": "R" })),
    )
}

#[tokio::test]
async fn login_surfaces_mfa_required_from_482() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/login", post(login_handler))).await?;
    let err = client(&base).login("a@b.c", "pw").await.unwrap_err();
    match err {
        Error::MfaRequired { mfa_token } => assert_eq!(mfa_token, "MT1"),
        other => anyhow::bail!("expected MfaRequired, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn login_mfa_completes_with_tokens() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/login", post(login_handler))).await?;
    let tokens = client(&base).login_mfa("a@b.c", "pw", "MT1", "123456").await?;
    assert_eq!(tokens.access_token, "A");
    assert_eq!(tokens.refresh_token, "R");
    assert!(tokens.expires_in.is_none());
    Ok(())
}

#[tokio::test]
async fn login_401_is_an_auth_error() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/login", post(login_handler))).await?;
    let err = client(&base).login("a@b.c", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    Ok(())
}

#[tokio::test]
async fn mfa_token_in_body_wins_over_http_status() -> anyhow::Result<()> {
    // Even a 200 with mfa_token in the body means MFA is required.
    let router = Router::new().route(
        "/login",
        post(|| async { Json(serde_json::json!({ "mfa_token": "MT2" })) }),
    );
    let base = spawn_api(router).await?;
    let err = client(&base).login("a@b.c", "pw").await.unwrap_err();
    assert!(matches!(err, Error::MfaRequired { mfa_token } if mfa_token == "MT2"));
    Ok(())
}

#[tokio::test]
async fn login_honors_server_expires_in() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/login",
        post(|| async {
            Json(serde_json::json!({
                "access_token": "A", "refresh_token": "R", "expires_in": 1800
            }))
        }),
    );
    let base = spawn_api(router).await?;
    let tokens = client(&base).login("a@b.c", "pw").await?;
    assert_eq!(tokens.expires_in, Some(1800));
    Ok(())
}

// ── token refresh ─────────────────────────────────────────────────────

async fn refresh_handler(
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    // The refresh endpoint takes the bare access token, no Bearer prefix.
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if auth != "OLD_ACCESS" {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
    }
    if body["refresh_token"] != "OLD_REFRESH" {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({})));
    }
    assert_eq!(
        headers.get("nanit-api-version").and_then(|v| v.to_str().ok()),
        Some("1")
    );
    (
        StatusCode::OK,
        Json(serde_json::json!({ "access_token": "A2", "refresh_token": "R2" })),
    )
}

#[tokio::test]
async fn refresh_returns_new_pair() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/tokens/refresh", post(refresh_handler))).await?;
    let tokens = client(&base).refresh("OLD_ACCESS", "OLD_REFRESH").await?;
    assert_eq!(tokens.access_token, "A2");
    assert_eq!(tokens.refresh_token, "R2");
    Ok(())
}

#[tokio::test]
async fn refresh_404_means_refresh_token_expired() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/tokens/refresh", post(refresh_handler))).await?;
    let err = client(&base).refresh("OLD_ACCESS", "stale").await.unwrap_err();
    assert!(matches!(err, Error::Auth(msg) if msg.contains("refresh token expired")));
    Ok(())
}

#[tokio::test]
async fn refresh_401_means_access_token_invalid() -> anyhow::Result<()> {
    let base = spawn_api(Router::new().route("/tokens/refresh", post(refresh_handler))).await?;
    let err = client(&base).refresh("bogus", "OLD_REFRESH").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    Ok(())
}

// ── babies / events / snapshot ────────────────────────────────────────

#[tokio::test]
async fn get_babies_parses_list() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/babies",
        get(|| async {
            Json(serde_json::json!({
                "babies": [
                    { "uid": "b1", "name": "June", "camera_uid": "c1" },
                    { "uid": "b2", "name": "Theo", "camera_uid": "c2" },
                ]
            }))
        }),
    );
    let base = spawn_api(router).await?;
    let babies = client(&base).get_babies("tok").await?;
    assert_eq!(babies.len(), 2);
    assert_eq!(babies[0], Baby { uid: "b1".into(), name: "June".into(), camera_uid: "c1".into() });
    Ok(())
}

#[tokio::test]
async fn get_events_maps_messages() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/babies/{uid}/messages",
        get(|Path(uid): Path<String>| async move {
            assert_eq!(uid, "b1");
            Json(serde_json::json!({
                "messages": [
                    { "type": "MOTION", "time": 1700000000.0 },
                    { "type": "SOUND", "time": 1700000123.5 },
                ]
            }))
        }),
    );
    let base = spawn_api(router).await?;
    let events = client(&base).get_events("tok", "b1", 20).await?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "MOTION");
    assert_eq!(events[1].timestamp, 1700000123.5);
    assert_eq!(events[1].baby_uid, "b1");
    Ok(())
}

#[tokio::test]
async fn get_snapshot_returns_bytes_on_200() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/babies/{uid}/snapshot",
        get(|| async { ([("content-type", "image/jpeg")], vec![0xff, 0xd8, 0x01]) }),
    );
    let base = spawn_api(router).await?;
    let snapshot = client(&base).get_snapshot("tok", "b1").await?;
    assert_eq!(snapshot.as_deref(), Some(&[0xff, 0xd8, 0x01][..]));
    Ok(())
}

#[tokio::test]
async fn get_snapshot_absent_on_non_200() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/babies/{uid}/snapshot",
        get(|| async { StatusCode::NOT_FOUND }),
    );
    let base = spawn_api(router).await?;
    assert!(client(&base).get_snapshot("tok", "b1").await?.is_none());
    Ok(())
}
