// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Errors surfaced by the camera client.
///
/// Payloads are plain strings so the error can be cloned into every pending
/// awaiter when a connection drops.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid credentials, expired refresh token, or an unauthorized cloud
    /// response. Fatal to the session; the consumer must reauthenticate.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Login succeeded up to the second factor. Resubmit the credentials
    /// together with `mfa_token` and the user's code.
    #[error("multi-factor authentication required")]
    MfaRequired { mfa_token: String },

    /// Network-layer failure at handshake or HTTP level.
    #[error("connection failed: {0}")]
    Connection(String),

    /// WebSocket closed unexpectedly, or a send was attempted while
    /// disconnected.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound envelope could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No response arrived within the per-request timeout.
    #[error("request {request_type} (id {id}) timed out after {timeout:?}")]
    RequestTimeout { request_type: &'static str, id: u32, timeout: Duration },

    /// `start()` could not reach the camera over any transport.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
