// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level entry point: session authentication and camera controllers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::camera::Camera;
use crate::config::CameraConfig;
use crate::error::{Error, Result};
use crate::rest::{AuthTokens, Baby, CloudEvent, RestClient, DEFAULT_BASE_URL};
use crate::token::{TokenManager, TokenPair};

/// Owns the REST client and token manager, and caches one [`Camera`]
/// controller per camera uid. One account per instance.
///
/// The `reqwest::Client` passed in stays caller-owned: [`close`](Self::close)
/// stops the cameras but leaves the HTTP client usable.
pub struct Client {
    rest: RestClient,
    tokens: RwLock<Option<Arc<TokenManager>>>,
    cameras: Mutex<HashMap<String, Camera>>,
}

impl Client {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API base (staging, tests).
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            rest: RestClient::new(http, base_url),
            tokens: RwLock::new(None),
            cameras: Mutex::new(HashMap::new()),
        }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// The active token manager, or `None` before authentication.
    pub fn token_manager(&self) -> Option<Arc<TokenManager>> {
        self.tokens.read().clone()
    }

    // ── authentication ────────────────────────────────────────────────

    /// First-factor login. On success the session is authenticated; an
    /// [`Error::MfaRequired`] carries the token for [`verify_mfa`](Self::verify_mfa).
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        let tokens = self.rest.login(email, password).await?;
        Ok(self.install_tokens(tokens))
    }

    /// Complete a login that required a second factor.
    pub async fn verify_mfa(
        &self,
        email: &str,
        password: &str,
        mfa_token: &str,
        mfa_code: &str,
    ) -> Result<TokenPair> {
        let tokens = self.rest.login_mfa(email, password, mfa_token, mfa_code).await?;
        Ok(self.install_tokens(tokens))
    }

    /// Authenticate from previously persisted tokens without a login call.
    pub fn restore_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) {
        let tokens = AuthTokens {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in: None,
        };
        self.install_tokens(tokens);
    }

    fn install_tokens(&self, tokens: AuthTokens) -> TokenPair {
        let manager = Arc::new(TokenManager::new(
            self.rest.clone(),
            tokens.access_token.clone(),
            tokens.refresh_token.clone(),
            tokens.expires_in.map(Duration::from_secs),
        ));
        *self.tokens.write() = Some(manager);
        TokenPair { access_token: tokens.access_token, refresh_token: tokens.refresh_token }
    }

    // ── cloud data ────────────────────────────────────────────────────

    pub async fn get_babies(&self) -> Result<Vec<Baby>> {
        let manager = self.require_auth()?;
        let token = manager.access_token().await?;
        self.rest.get_babies(&token).await
    }

    /// Recent cloud notifications (motion/sound) for one baby.
    pub async fn get_events(&self, baby_uid: &str, limit: u32) -> Result<Vec<CloudEvent>> {
        let manager = self.require_auth()?;
        let token = manager.access_token().await?;
        self.rest.get_events(&token, baby_uid, limit).await
    }

    // ── cameras ───────────────────────────────────────────────────────

    /// Get or create the controller for a camera, cached by camera uid.
    /// `config` applies only when the controller does not exist yet.
    pub fn camera(&self, uid: &str, baby_uid: &str, config: CameraConfig) -> Result<Camera> {
        let manager = self.require_auth()?;
        let mut cameras = self.cameras.lock();
        if let Some(camera) = cameras.get(uid) {
            return Ok(camera.clone());
        }
        let camera = Camera::new(uid, baby_uid, manager, self.rest.clone(), config);
        cameras.insert(uid.to_owned(), camera.clone());
        Ok(camera)
    }

    /// Stop every cached controller and clear the cache.
    pub fn close(&self) {
        let cameras: Vec<Camera> = self.cameras.lock().drain().map(|(_, camera)| camera).collect();
        for camera in cameras {
            camera.stop();
        }
    }

    fn require_auth(&self) -> Result<Arc<TokenManager>> {
        self.token_manager()
            .ok_or_else(|| Error::Auth("not authenticated, log in first".into()))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
