// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-camera controller: owns the transport, correlates requests with
//! responses, folds push notifications into the aggregated state snapshot,
//! and fans out [`CameraEvent`]s to subscribers.

mod parse;
mod probe;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::CameraConfig;
use crate::error::{Error, Result};
use crate::events::{CameraEvent, CameraEventKind};
use crate::proto;
use crate::rest::RestClient;
use crate::state::{
    epoch_secs, CameraState, ConnectionState, ControlState, NightLight, SensorState, SettingsState,
    StatusState, TransportKind,
};
use crate::token::TokenManager;
use crate::transport::codec::{self, RequestPayload};
use crate::transport::pending::PendingRequests;
use crate::transport::ws::WsTransport;
use crate::transport::TransportEvent;

const RTMPS_BASE: &str = "rtmps://media-secured.nanit.com/nanit";

/// Partial settings write. Only the provided fields go on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    pub night_vision: Option<bool>,
    pub volume: Option<u32>,
    pub sleep_mode: Option<bool>,
    pub status_light_on: Option<bool>,
    pub mic_mute_on: Option<bool>,
}

/// Handle to one camera session. Cheap to clone; all clones share the same
/// controller.
#[derive(Clone)]
pub struct Camera {
    inner: Arc<CameraInner>,
}

pub(crate) struct CameraInner {
    uid: String,
    baby_uid: String,
    config: CameraConfig,
    tokens: Arc<TokenManager>,
    rest: RestClient,
    transport: WsTransport,
    pending: PendingRequests,
    state: RwLock<CameraState>,
    event_tx: broadcast::Sender<CameraEvent>,
    stopped: AtomicBool,
    probe: Mutex<Option<CancellationToken>>,
    dispatch_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

impl Camera {
    /// Build a controller for `(camera uid, baby uid)`. Nothing connects
    /// until [`start`](Self::start).
    pub fn new(
        uid: impl Into<String>,
        baby_uid: impl Into<String>,
        tokens: Arc<TokenManager>,
        rest: RestClient,
        config: CameraConfig,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let transport = WsTransport::new(config.transport.clone(), transport_tx);
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(CameraInner {
                uid: uid.into(),
                baby_uid: baby_uid.into(),
                config,
                tokens,
                rest,
                transport,
                pending: PendingRequests::new(),
                state: RwLock::new(CameraState::default()),
                event_tx,
                stopped: AtomicBool::new(false),
                probe: Mutex::new(None),
                dispatch_rx: Mutex::new(Some(transport_rx)),
            }),
        }
    }

    pub fn uid(&self) -> &str {
        &self.inner.uid
    }

    pub fn baby_uid(&self) -> &str {
        &self.inner.baby_uid
    }

    /// Current aggregated state snapshot.
    pub fn state(&self) -> CameraState {
        self.inner.state.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.kind()
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Subscribe to state-change events. Dropping the receiver unsubscribes;
    /// a slow subscriber only loses its own events.
    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Connect and prime the session:
    ///
    /// 1. try the LAN first when configured, falling back to the cloud relay
    /// 2. request status, settings, sensors, and control state
    /// 3. tell the camera to push sensor updates
    /// 4. start the local probe when running on the cloud with a known LAN
    ///    address
    ///
    /// Only a total connection failure is an error; individual priming
    /// requests are fault tolerant since the next push re-seeds them.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        inner.stopped.store(false, Ordering::SeqCst);
        if let Some(rx) = inner.dispatch_rx.lock().take() {
            tokio::spawn(dispatch_loop(Arc::downgrade(inner), rx));
        }

        let mut connected = false;
        if inner.config.prefer_local {
            if let Some(ip) = inner.config.local_ip.clone() {
                let token = inner.tokens.access_token().await?;
                match inner.transport.connect_local(&ip, &token).await {
                    Ok(()) => connected = true,
                    Err(e @ (Error::Connection(_) | Error::Transport(_))) => {
                        tracing::info!(
                            camera_uid = %inner.uid,
                            ip = %ip,
                            err = %e,
                            "local connection failed, falling back to cloud"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if !connected {
            let token = inner.tokens.access_token().await?;
            match inner.transport.connect_cloud(&inner.uid, &token).await {
                Ok(()) => {}
                Err(e @ (Error::Connection(_) | Error::Transport(_))) => {
                    return Err(Error::CameraUnavailable(format!(
                        "cannot reach camera {} via any transport: {e}",
                        inner.uid
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        inner.request_initial_state().await;
        inner.enable_sensor_push().await;

        if inner.transport.kind() == TransportKind::Cloud && inner.config.local_ip.is_some() {
            inner.start_local_probe();
        }
        Ok(())
    }

    /// Stop the session: cancel the probe, drain pending requests, close the
    /// transport. A second call is a no-op.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.cancel_probe();
        self.inner.pending.cancel_all(None);
        self.inner.transport.close();
    }

    // ── command surface ───────────────────────────────────────────────

    pub async fn get_status(&self) -> Result<StatusState> {
        self.inner.get_status().await
    }

    pub async fn get_settings(&self) -> Result<SettingsState> {
        self.inner.get_settings().await
    }

    pub async fn get_control(&self) -> Result<ControlState> {
        self.inner.get_control().await
    }

    pub async fn get_sensor_data(&self) -> Result<SensorState> {
        self.inner.get_sensor_data().await
    }

    /// Write the provided settings fields and fold the camera's reply into
    /// the snapshot.
    pub async fn set_settings(&self, update: SettingsUpdate) -> Result<SettingsState> {
        self.inner.set_settings(update).await
    }

    pub async fn set_control(
        &self,
        night_light: Option<NightLight>,
        night_light_timeout: Option<u32>,
    ) -> Result<ControlState> {
        self.inner.set_control(night_light, night_light_timeout).await
    }

    /// The RTMPS URL the camera streams to, minted with a fresh access
    /// token. Rebuilt on every call.
    pub async fn rtmps_url(&self) -> Result<String> {
        self.inner.rtmps_url().await
    }

    /// Ask the camera to start publishing its mobile stream.
    pub async fn start_streaming(&self) -> Result<()> {
        self.inner.start_streaming().await
    }

    pub async fn stop_streaming(&self) -> Result<()> {
        self.inner.stop_streaming().await
    }

    /// Fetch a JPEG snapshot from the cloud. Absent on any failure; never an
    /// error.
    pub async fn snapshot(&self) -> Option<Bytes> {
        self.inner.snapshot().await
    }
}

#[cfg(test)]
impl Camera {
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Pump transport events into the controller, in wire order. Holds only a
/// weak reference so a dropped camera tears the task down.
async fn dispatch_loop(
    camera: Weak<CameraInner>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = camera.upgrade() else { return };
        match event {
            TransportEvent::Frame(data) => inner.handle_frame(&data),
            TransportEvent::ConnectionChange { state, transport, error } => {
                inner.handle_connection_change(state, transport, error);
            }
        }
    }
}

impl CameraInner {
    fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // ── inbound dispatch ──────────────────────────────────────────────

    fn handle_frame(&self, data: &[u8]) {
        let msg = match codec::decode_message(data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(camera_uid = %self.uid, err = %e, "dropping undecodable frame");
                return;
            }
        };

        if let Some(response) = codec::extract_response(&msg) {
            if !self.pending.resolve(response.request_id, response.clone()) {
                tracing::debug!(
                    camera_uid = %self.uid,
                    request_id = response.request_id,
                    "response for unknown request"
                );
            }
            return;
        }

        if let Some(request) = codec::extract_request(&msg) {
            self.handle_push(request);
        }
        // KEEPALIVE: nothing to do.
    }

    fn handle_push(&self, request: &proto::Request) {
        match proto::RequestType::try_from(request.r#type) {
            Ok(proto::RequestType::PutSensorData) => {
                self.update_state(CameraEventKind::SensorUpdate, |state| {
                    state.sensors = parse::merge_sensor_data(&request.sensor_data, &state.sensors);
                });
            }
            Ok(proto::RequestType::PutStatus) => {
                if let Some(status) = &request.status {
                    let status = parse::parse_status(status);
                    self.update_state(CameraEventKind::StatusUpdate, |state| state.status = status);
                }
            }
            Ok(proto::RequestType::PutSettings) => {
                if let Some(settings) = &request.settings {
                    let settings = parse::parse_settings(settings);
                    self.update_state(CameraEventKind::SettingsUpdate, |state| {
                        state.settings = settings;
                    });
                }
            }
            Ok(proto::RequestType::PutControl) => {
                if let Some(control) = &request.control {
                    let control = parse::parse_control(control);
                    self.update_state(CameraEventKind::ControlUpdate, |state| {
                        state.control = control;
                    });
                }
            }
            _ => {
                tracing::debug!(
                    camera_uid = %self.uid,
                    request_type = request.r#type,
                    "unhandled push request type"
                );
            }
        }
    }

    fn handle_connection_change(
        &self,
        state: ConnectionState,
        transport: TransportKind,
        error: Option<String>,
    ) {
        // Unblock awaiters before announcing the transition: the pending
        // table must be empty whenever the session is not connected.
        if matches!(state, ConnectionState::Disconnected | ConnectionState::Reconnecting) {
            self.pending.cancel_all(Some(Error::Transport("Connection lost".into())));
        }

        self.update_state(CameraEventKind::ConnectionChange, |snapshot| {
            let conn = &mut snapshot.connection;
            conn.reconnect_attempts = match state {
                ConnectionState::Connected => 0,
                ConnectionState::Reconnecting => conn.reconnect_attempts + 1,
                _ => conn.reconnect_attempts,
            };
            if state == ConnectionState::Connected {
                conn.last_seen = Some(epoch_secs());
            }
            conn.state = state;
            conn.transport = transport;
            conn.last_error = error;
        });
    }

    /// Apply a mutation to the snapshot and notify subscribers with the
    /// result.
    fn update_state(
        &self,
        kind: CameraEventKind,
        apply: impl FnOnce(&mut CameraState),
    ) -> CameraState {
        let snapshot = {
            let mut guard = self.state.write();
            apply(&mut guard);
            guard.clone()
        };
        let _ = self.event_tx.send(CameraEvent { kind, state: snapshot.clone() });
        snapshot
    }

    // ── request/response ──────────────────────────────────────────────

    async fn send_request(
        &self,
        request_type: proto::RequestType,
        payload: RequestPayload,
        timeout: Duration,
    ) -> Result<proto::Response> {
        let id = self.pending.next_id();
        let awaiter = self.pending.track(id)?;
        let frame = codec::build_request(id, request_type, payload);
        if let Err(e) = self.transport.send(frame) {
            self.pending.discard(id);
            return Err(e);
        }
        match tokio::time::timeout(timeout, awaiter).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Transport("request cancelled".into())),
            Err(_) => {
                self.pending.discard(id);
                Err(Error::RequestTimeout {
                    request_type: request_type.as_str_name(),
                    id,
                    timeout,
                })
            }
        }
    }

    // ── commands ──────────────────────────────────────────────────────

    async fn get_status(&self) -> Result<StatusState> {
        let resp = self
            .send_request(
                proto::RequestType::GetStatus,
                RequestPayload::GetStatus(proto::GetStatus { all: true }),
                self.config.request_timeout,
            )
            .await?;
        let status = resp.status.as_ref().map(parse::parse_status).unwrap_or_default();
        let snapshot = self.update_state(CameraEventKind::StatusUpdate, |state| {
            state.status = status;
        });
        Ok(snapshot.status)
    }

    async fn get_settings(&self) -> Result<SettingsState> {
        let resp = self
            .send_request(
                proto::RequestType::GetSettings,
                RequestPayload::None,
                self.config.request_timeout,
            )
            .await?;
        let settings = resp.settings.as_ref().map(parse::parse_settings).unwrap_or_default();
        let snapshot = self.update_state(CameraEventKind::SettingsUpdate, |state| {
            state.settings = settings;
        });
        Ok(snapshot.settings)
    }

    async fn get_control(&self) -> Result<ControlState> {
        let resp = self
            .send_request(
                proto::RequestType::GetControl,
                RequestPayload::GetControl(proto::GetControl { night_light: true }),
                self.config.request_timeout,
            )
            .await?;
        let control = resp.control.as_ref().map(parse::parse_control).unwrap_or_default();
        let snapshot = self.update_state(CameraEventKind::ControlUpdate, |state| {
            state.control = control;
        });
        Ok(snapshot.control)
    }

    async fn get_sensor_data(&self) -> Result<SensorState> {
        let resp = self
            .send_request(
                proto::RequestType::GetSensorData,
                RequestPayload::GetSensorData(proto::GetSensorData { all: true }),
                self.config.request_timeout,
            )
            .await?;
        let snapshot = self.update_state(CameraEventKind::SensorUpdate, |state| {
            state.sensors = parse::merge_sensor_data(&resp.sensor_data, &state.sensors);
        });
        Ok(snapshot.sensors)
    }

    async fn set_settings(&self, update: SettingsUpdate) -> Result<SettingsState> {
        let payload = proto::Settings {
            night_vision: update.night_vision,
            volume: update.volume,
            sleep_mode: update.sleep_mode,
            status_light_on: update.status_light_on,
            mic_mute_on: update.mic_mute_on,
            wifi_band: None,
            mounting_mode: None,
        };
        let resp = self
            .send_request(
                proto::RequestType::PutSettings,
                RequestPayload::Settings(payload),
                self.config.request_timeout,
            )
            .await?;
        let settings = resp.settings.as_ref().map(parse::parse_settings).unwrap_or_default();
        let snapshot = self.update_state(CameraEventKind::SettingsUpdate, |state| {
            state.settings = settings;
        });
        Ok(snapshot.settings)
    }

    async fn set_control(
        &self,
        night_light: Option<NightLight>,
        night_light_timeout: Option<u32>,
    ) -> Result<ControlState> {
        let payload = proto::Control {
            night_light: night_light.map(|v| match v {
                NightLight::On => proto::ControlNightLight::LightOn as i32,
                NightLight::Off => proto::ControlNightLight::LightOff as i32,
            }),
            night_light_timeout,
            sensor_data_transfer: None,
        };
        let resp = self
            .send_request(
                proto::RequestType::PutControl,
                RequestPayload::Control(payload),
                self.config.request_timeout,
            )
            .await?;
        let control = resp.control.as_ref().map(parse::parse_control).unwrap_or_default();
        let snapshot = self.update_state(CameraEventKind::ControlUpdate, |state| {
            state.control = control;
        });
        Ok(snapshot.control)
    }

    async fn rtmps_url(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("{RTMPS_BASE}/{}.{token}", self.baby_uid))
    }

    async fn start_streaming(&self) -> Result<()> {
        let rtmp_url = self.rtmps_url().await?;
        let payload = proto::Streaming {
            id: proto::StreamIdentifier::Mobile as i32,
            status: proto::StreamingStatus::Started as i32,
            rtmp_url,
        };
        self.send_request(
            proto::RequestType::PutStreaming,
            RequestPayload::Streaming(payload),
            self.config.request_timeout,
        )
        .await?;
        Ok(())
    }

    async fn stop_streaming(&self) -> Result<()> {
        let payload = proto::Streaming {
            id: proto::StreamIdentifier::Mobile as i32,
            status: proto::StreamingStatus::Stopped as i32,
            rtmp_url: String::new(),
        };
        self.send_request(
            proto::RequestType::PutStreaming,
            RequestPayload::Streaming(payload),
            self.config.request_timeout,
        )
        .await?;
        Ok(())
    }

    async fn snapshot(&self) -> Option<Bytes> {
        let token = match self.tokens.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(camera_uid = %self.uid, err = %e, "snapshot token fetch failed");
                return None;
            }
        };
        match self.rest.get_snapshot(&token, &self.baby_uid).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(camera_uid = %self.uid, err = %e, "snapshot fetch failed");
                None
            }
        }
    }

    // ── priming ───────────────────────────────────────────────────────

    /// Request the full state after a (re)connect. Each request is
    /// individually fault tolerant: the next push re-seeds anything missed.
    async fn request_initial_state(&self) {
        if let Err(e) = self.get_status().await {
            tracing::warn!(camera_uid = %self.uid, err = %e, "initial GET_STATUS failed");
        }
        if let Err(e) = self.get_settings().await {
            tracing::warn!(camera_uid = %self.uid, err = %e, "initial GET_SETTINGS failed");
        }
        if let Err(e) = self.get_sensor_data().await {
            tracing::warn!(camera_uid = %self.uid, err = %e, "initial GET_SENSOR_DATA failed");
        }
        if let Err(e) = self.get_control().await {
            tracing::warn!(camera_uid = %self.uid, err = %e, "initial GET_CONTROL failed");
        }
    }

    /// Tell the camera to deliver unsolicited PUT_SENSOR_DATA frames for
    /// every sensor.
    async fn enable_sensor_push(&self) {
        let transfer = proto::SensorDataTransfer {
            sound: true,
            motion: true,
            temperature: true,
            humidity: true,
            light: true,
            night: true,
        };
        let payload = proto::Control {
            night_light: None,
            night_light_timeout: None,
            sensor_data_transfer: Some(transfer),
        };
        if let Err(e) = self
            .send_request(
                proto::RequestType::PutControl,
                RequestPayload::Control(payload),
                self.config.request_timeout,
            )
            .await
        {
            tracing::warn!(camera_uid = %self.uid, err = %e, "enable sensor push failed");
        }
    }

    // ── local probe ───────────────────────────────────────────────────

    fn start_local_probe(self: &Arc<Self>) {
        let mut guard = self.probe.lock();
        if let Some(cancel) = guard.take() {
            cancel.cancel();
        }
        *guard = Some(probe::spawn(self));
    }

    fn cancel_probe(&self) {
        if let Some(cancel) = self.probe.lock().take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
