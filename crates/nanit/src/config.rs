// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// WebSocket transport tunables.
///
/// Defaults match the camera firmware's expectations; the endpoint bases and
/// timings are overridable so an embedding daemon can point the client at a
/// staging relay and tests can shrink the timers.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the cloud relay (`wss://api.nanit.com`).
    pub cloud_ws_base: String,
    /// Port of the on-camera WebSocket server.
    pub local_port: u16,
    /// Whether the local connection uses TLS. The device presents a
    /// self-signed certificate, so certificate verification is skipped when
    /// this is on.
    pub local_tls: bool,
    /// Interval between protobuf KEEPALIVE envelopes.
    pub keepalive_interval: Duration,
    /// Interval between WebSocket ping frames.
    pub heartbeat_interval: Duration,
    /// Budget for the WebSocket handshake.
    pub handshake_timeout: Duration,
    /// First reconnect delay.
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each failed reconnect attempt.
    pub backoff_factor: f64,
    /// Upper bound on the reconnect delay.
    pub max_backoff: Duration,
    /// Maximum uniform jitter added to the first reconnect delay only.
    pub first_retry_jitter: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            cloud_ws_base: "wss://api.nanit.com".to_owned(),
            local_port: 442,
            local_tls: true,
            keepalive_interval: Duration::from_secs(25),
            heartbeat_interval: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(15),
            initial_backoff: Duration::from_millis(1850),
            backoff_factor: 1.618,
            max_backoff: Duration::from_secs(60),
            first_retry_jitter: Duration::from_secs(1),
        }
    }
}

/// Per-camera behavior tunables.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Try the LAN connection before the cloud relay on start.
    pub prefer_local: bool,
    /// LAN address of the camera, if known.
    pub local_ip: Option<String>,
    /// Per-request await budget.
    pub request_timeout: Duration,
    /// Sleep between local-reachability probes while on the cloud transport.
    pub probe_interval: Duration,
    /// Handshake budget for a single probe attempt.
    pub probe_handshake_timeout: Duration,
    pub transport: TransportConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            prefer_local: true,
            local_ip: None,
            request_timeout: Duration::from_secs(10),
            probe_interval: Duration::from_secs(300),
            probe_handshake_timeout: Duration::from_secs(5),
            transport: TransportConfig::default(),
        }
    }
}
