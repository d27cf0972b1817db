// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-reachability probe.
//!
//! While a camera session runs over the cloud relay and a LAN address is
//! known, a background task periodically opens a throwaway connection to the
//! camera. The first success promotes the session: pending requests are
//! drained, the cloud connection closes, and the controller reconnects
//! locally and re-primes its state. The probe then stops.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::state::TransportKind;
use crate::transport::ws::WsTransport;

use super::CameraInner;

/// Spawn the probe task. The returned token stops it.
pub(super) fn spawn(inner: &Arc<CameraInner>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let camera = Arc::downgrade(inner);
    let token = cancel.clone();
    tokio::spawn(async move {
        probe_loop(camera, token).await;
    });
    cancel
}

async fn probe_loop(camera: Weak<CameraInner>, cancel: CancellationToken) {
    loop {
        let interval = match camera.upgrade() {
            Some(inner) => inner.config.probe_interval,
            None => return,
        };
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(inner) = camera.upgrade() else { return };
        if inner.stopped() || inner.config.local_ip.is_none() {
            return;
        }
        if inner.transport.kind() == TransportKind::Local && inner.transport.is_connected() {
            return;
        }
        let Some(ip) = inner.config.local_ip.clone() else { return };

        match try_promote(&inner, &ip).await {
            Ok(true) => {
                tracing::info!(camera_uid = %inner.uid, "promotion complete, probe finished");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(camera_uid = %inner.uid, err = %e, "local probe error");
            }
        }
    }
}

/// One probe attempt. Returns `Ok(true)` after a successful promotion,
/// `Ok(false)` when the camera is not reachable locally.
async fn try_promote(inner: &Arc<CameraInner>, ip: &str) -> Result<bool> {
    let token = inner.tokens.access_token().await?;

    // Throwaway connection to test reachability within the probe budget.
    let (probe_tx, _probe_rx) = mpsc::unbounded_channel();
    let probe = WsTransport::new(inner.config.transport.clone(), probe_tx);
    let attempt = tokio::time::timeout(
        inner.config.probe_handshake_timeout,
        probe.connect_local(ip, &token),
    )
    .await;
    match attempt {
        Ok(Ok(())) => probe.close(),
        Ok(Err(e)) => {
            tracing::debug!(camera_uid = %inner.uid, err = %e, "local probe failed, staying on cloud");
            return Ok(false);
        }
        Err(_) => {
            tracing::debug!(camera_uid = %inner.uid, "local probe timed out, staying on cloud");
            return Ok(false);
        }
    }

    tracing::info!(camera_uid = %inner.uid, ip = %ip, "local camera reachable, promoting from cloud");
    inner.pending.cancel_all(None);
    inner.transport.close();
    inner.transport.connect_local(ip, &token).await?;
    inner.request_initial_state().await;
    inner.enable_sensor_push().await;
    Ok(true)
}
