// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nanit cloud REST endpoints.
//!
//! The HTTP client is caller-owned and shared with the snapshot path; this
//! wrapper never closes it. Authenticated endpoints carry the bare access
//! token in `Authorization`; the cloud rejects a `Bearer` prefix here.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::ws::ensure_crypto_provider;

pub const DEFAULT_BASE_URL: &str = "https://api.nanit.com";

// The API rejects requests without nanit-api-version (especially with MFA
// enabled) and may reject non-mobile user agents.
const API_VERSION_HEADER: &str = "nanit-api-version";
const MOBILE_USER_AGENT: &str = "Nanit/767 CFNetwork/1498.700.2 Darwin/23.6.0";

/// A child profile as returned by the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baby {
    pub uid: String,
    pub name: String,
    pub camera_uid: String,
}

/// A cloud notification (motion/sound), polled from the messages endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    pub event_type: String,
    /// Unix seconds.
    pub timestamp: f64,
    pub baby_uid: String,
}

/// Token material returned by login and refresh.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Server-provided TTL in seconds, when present.
    pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct BabiesBody {
    #[serde(default)]
    babies: Vec<Baby>,
}

#[derive(Deserialize)]
struct MessagesBody {
    #[serde(default)]
    messages: Vec<MessageBody>,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(rename = "type")]
    kind: String,
    time: f64,
}

/// HTTP client for the Nanit cloud API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        ensure_crypto_provider();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn common(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(API_VERSION_HEADER, "1").header(USER_AGENT, MOBILE_USER_AGENT)
    }

    fn authed(&self, req: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
        self.common(req).header(AUTHORIZATION, access_token)
    }

    /// First-factor login.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
        self.auth_request(serde_json::json!({ "email": email, "password": password })).await
    }

    /// Second-factor login, resubmitting the credentials with the MFA token
    /// and the user's code.
    pub async fn login_mfa(
        &self,
        email: &str,
        password: &str,
        mfa_token: &str,
        mfa_code: &str,
    ) -> Result<AuthTokens> {
        self.auth_request(serde_json::json!({
            "email": email,
            "password": password,
            "mfa_token": mfa_token,
            "mfa_code": mfa_code,
        }))
        .await
    }

    async fn auth_request(&self, body: serde_json::Value) -> Result<AuthTokens> {
        let resp = self
            .common(self.http.post(self.url("/login")))
            .json(&body)
            .send()
            .await
            .map_err(connection_err)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("invalid credentials".into()));
        }

        // The cloud signals MFA with `mfa_token` in the body and the
        // non-standard status 482, so the body must be read before any
        // generic status check.
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Connection(format!("malformed login response: {e}")))?;
        if let Some(mfa_token) = body.get("mfa_token").and_then(|v| v.as_str()) {
            return Err(Error::MfaRequired { mfa_token: mfa_token.to_owned() });
        }
        if !status.is_success() {
            return Err(Error::Auth(format!("login failed with status {status}")));
        }
        parse_tokens(&body)
    }

    /// Exchange the refresh token for a new pair. The old access token rides
    /// along in `Authorization`.
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<AuthTokens> {
        let resp = self
            .authed(self.http.post(self.url("/tokens/refresh")), access_token)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(connection_err)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(Error::Auth("refresh token expired".into())),
            StatusCode::UNAUTHORIZED => Err(Error::Auth("access token invalid during refresh".into())),
            status if !status.is_success() => {
                Err(Error::Auth(format!("token refresh failed with status {status}")))
            }
            _ => {
                let body: serde_json::Value = resp
                    .json()
                    .await
                    .map_err(|e| Error::Connection(format!("malformed refresh response: {e}")))?;
                parse_tokens(&body)
            }
        }
    }

    /// List babies (and their camera uids) on the account.
    pub async fn get_babies(&self, access_token: &str) -> Result<Vec<Baby>> {
        let resp = self
            .authed(self.http.get(self.url("/babies")), access_token)
            .send()
            .await
            .map_err(connection_err)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("access token invalid".into()));
        }
        if !status.is_success() {
            return Err(Error::Connection(format!("babies request failed with status {status}")));
        }
        let body: BabiesBody = resp
            .json()
            .await
            .map_err(|e| Error::Connection(format!("malformed babies response: {e}")))?;
        Ok(body.babies)
    }

    /// Fetch recent cloud notifications for a baby, newest first.
    pub async fn get_events(
        &self,
        access_token: &str,
        baby_uid: &str,
        limit: u32,
    ) -> Result<Vec<CloudEvent>> {
        let resp = self
            .authed(self.http.get(self.url(&format!("/babies/{baby_uid}/messages"))), access_token)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(connection_err)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("access token invalid".into()));
        }
        if !status.is_success() {
            return Err(Error::Connection(format!("messages request failed with status {status}")));
        }
        let body: MessagesBody = resp
            .json()
            .await
            .map_err(|e| Error::Connection(format!("malformed messages response: {e}")))?;
        Ok(body
            .messages
            .into_iter()
            .map(|m| CloudEvent { event_type: m.kind, timestamp: m.time, baby_uid: baby_uid.to_owned() })
            .collect())
    }

    /// Fetch a JPEG snapshot. Any non-200 response yields `None` rather than
    /// an error; only network-level failures surface.
    pub async fn get_snapshot(&self, access_token: &str, baby_uid: &str) -> Result<Option<Bytes>> {
        let resp = self
            .authed(self.http.get(self.url(&format!("/babies/{baby_uid}/snapshot"))), access_token)
            .send()
            .await
            .map_err(connection_err)?;
        if resp.status() != StatusCode::OK {
            tracing::debug!(baby_uid, status = %resp.status(), "snapshot endpoint returned non-200");
            return Ok(None);
        }
        Ok(Some(resp.bytes().await.map_err(connection_err)?))
    }
}

fn connection_err(e: reqwest::Error) -> Error {
    Error::Connection(e.to_string())
}

fn parse_tokens(body: &serde_json::Value) -> Result<AuthTokens> {
    let access = body.get("access_token").and_then(|v| v.as_str());
    let refresh = body.get("refresh_token").and_then(|v| v.as_str());
    match (access, refresh) {
        (Some(access), Some(refresh)) => Ok(AuthTokens {
            access_token: access.to_owned(),
            refresh_token: refresh.to_owned(),
            expires_in: body.get("expires_in").and_then(|v| v.as_u64()),
        }),
        _ => Err(Error::Connection("auth response missing token fields".into())),
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
