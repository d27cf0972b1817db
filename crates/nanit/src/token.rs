// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access/refresh token lifecycle with proactive renewal.
//!
//! All token readers go through [`TokenManager::access_token`]; the internal
//! mutex serializes refreshes, so under contention exactly one refresh runs
//! and every waiter observes the new token once the lock is released.

use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};

use crate::error::{Error, Result};
use crate::rest::RestClient;

/// Assumed TTL when the server does not report `expires_in`.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// Tokens closer to expiry than this are refreshed before being handed out.
pub const DEFAULT_MIN_TTL: Duration = Duration::from_secs(60);

/// A fresh token pair, fanned out to persistence subscribers after every
/// refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct TokenState {
    access: String,
    refresh: String,
    expires_at: Instant,
}

/// Holds the current token triple and refreshes it on demand.
pub struct TokenManager {
    rest: RestClient,
    state: Mutex<TokenState>,
    refreshed_tx: broadcast::Sender<TokenPair>,
}

impl TokenManager {
    /// Seed the manager with a token pair. `expires_in` defaults to the
    /// assumed one-hour TTL when the server did not provide one.
    pub fn new(
        rest: RestClient,
        access_token: String,
        refresh_token: String,
        expires_in: Option<Duration>,
    ) -> Self {
        let (refreshed_tx, _) = broadcast::channel(16);
        Self {
            rest,
            state: Mutex::new(TokenState {
                access: access_token,
                refresh: refresh_token,
                expires_at: Instant::now() + expires_in.unwrap_or(DEFAULT_TOKEN_TTL),
            }),
            refreshed_tx,
        }
    }

    /// Return an access token valid for at least [`DEFAULT_MIN_TTL`],
    /// refreshing first when needed.
    pub async fn access_token(&self) -> Result<String> {
        self.access_token_with_min_ttl(DEFAULT_MIN_TTL).await
    }

    /// Return an access token valid for at least `min_ttl`.
    pub async fn access_token_with_min_ttl(&self, min_ttl: Duration) -> Result<String> {
        let mut state = self.state.lock().await;
        if Instant::now() + min_ttl >= state.expires_at {
            self.refresh_locked(&mut state).await?;
        }
        Ok(state.access.clone())
    }

    /// Refresh immediately, regardless of remaining TTL.
    pub async fn force_refresh(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Replace the stored tokens (e.g. after the consumer reloaded persisted
    /// credentials).
    pub async fn update_tokens(
        &self,
        access_token: String,
        refresh_token: String,
        expires_in: Option<Duration>,
    ) {
        let mut state = self.state.lock().await;
        state.access = access_token;
        state.refresh = refresh_token;
        state.expires_at = Instant::now() + expires_in.unwrap_or(DEFAULT_TOKEN_TTL);
    }

    /// Current pair, without freshness guarantees.
    pub async fn tokens(&self) -> TokenPair {
        let state = self.state.lock().await;
        TokenPair { access_token: state.access.clone(), refresh_token: state.refresh.clone() }
    }

    /// Subscribe to refreshed pairs for persistence. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe_refreshed(&self) -> broadcast::Receiver<TokenPair> {
        self.refreshed_tx.subscribe()
    }

    async fn refresh_locked(&self, state: &mut TokenState) -> Result<()> {
        // Refresh is the last line of defense: anything that is not already
        // an auth failure still means the session is dead.
        let tokens = match self.rest.refresh(&state.access, &state.refresh).await {
            Ok(tokens) => tokens,
            Err(e @ (Error::Auth(_) | Error::MfaRequired { .. })) => return Err(e),
            Err(e) => return Err(Error::Auth(format!("token refresh failed: {e}"))),
        };

        state.access = tokens.access_token;
        state.refresh = tokens.refresh_token;
        state.expires_at =
            Instant::now() + tokens.expires_in.map(Duration::from_secs).unwrap_or(DEFAULT_TOKEN_TTL);
        tracing::debug!("access token refreshed");

        let _ = self.refreshed_tx.send(TokenPair {
            access_token: state.access.clone(),
            refresh_token: state.refresh.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
