// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnecting WebSocket connection to the camera (cloud relay or LAN).
//!
//! One connection at a time. A background run loop multiplexes the receive
//! stream, an outbound send channel, the protobuf keepalive tick, and a
//! WebSocket ping heartbeat. When the peer drops the connection and `close()`
//! has not been called, the loop reconnects with exponential backoff and the
//! owner sees `reconnecting`/`connected` transitions on the event channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::state::{ConnectionState, TransportKind};
use crate::transport::{codec, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything needed to (re-)establish one connection.
#[derive(Debug, Clone)]
struct ConnectSpec {
    url: String,
    authorization: String,
    insecure_tls: bool,
}

struct Conn {
    /// Send half into the current run loop. `None` while disconnected.
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    kind: TransportKind,
    /// Cancels the current run loop.
    cancel: CancellationToken,
    /// Set by `close()`; suppresses reconnection.
    closed: bool,
}

struct Shared {
    config: TransportConfig,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    conn: Mutex<Conn>,
}

impl Shared {
    fn emit(&self, state: ConnectionState, transport: TransportKind, error: Option<String>) {
        let _ = self.event_tx.send(TransportEvent::ConnectionChange { state, transport, error });
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().closed
    }

    fn clear_outbound(&self) {
        self.conn.lock().outbound = None;
    }

    fn install_outbound(&self, tx: mpsc::UnboundedSender<Vec<u8>>) {
        self.conn.lock().outbound = Some(tx);
    }
}

/// Handle to a single camera WebSocket connection.
pub struct WsTransport {
    shared: Arc<Shared>,
}

impl WsTransport {
    /// Create a transport. `event_tx` receives every binary frame and every
    /// connection transition, in wire order.
    pub fn new(config: TransportConfig, event_tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        ensure_crypto_provider();
        Self {
            shared: Arc::new(Shared {
                config,
                event_tx,
                conn: Mutex::new(Conn {
                    outbound: None,
                    kind: TransportKind::None,
                    cancel: CancellationToken::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Connect through the Nanit cloud relay.
    pub async fn connect_cloud(&self, camera_uid: &str, access_token: &str) -> Result<()> {
        let spec = ConnectSpec {
            url: cloud_url(&self.shared.config.cloud_ws_base, camera_uid),
            authorization: format!("Bearer {access_token}"),
            insecure_tls: false,
        };
        self.connect(spec, TransportKind::Cloud).await
    }

    /// Connect directly to the camera on the LAN. The user-connect token
    /// doubles as the local credential. Certificate verification is skipped
    /// when `local_tls` is on (the device certificate is self-signed).
    pub async fn connect_local(&self, camera_ip: &str, uc_token: &str) -> Result<()> {
        let config = &self.shared.config;
        let spec = ConnectSpec {
            url: local_url(config, camera_ip),
            authorization: format!("token {uc_token}"),
            insecure_tls: config.local_tls,
        };
        self.connect(spec, TransportKind::Local).await
    }

    async fn connect(&self, spec: ConnectSpec, kind: TransportKind) -> Result<()> {
        // Tear down any previous session before dialing.
        {
            let mut conn = self.shared.conn.lock();
            conn.cancel.cancel();
            conn.outbound = None;
            conn.closed = false;
            conn.kind = kind;
        }
        self.shared.emit(ConnectionState::Connecting, kind, None);

        let stream = match handshake(&self.shared.config, &spec).await {
            Ok(stream) => stream,
            Err(e) => {
                self.shared.emit(ConnectionState::Disconnected, kind, Some(e.to_string()));
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        {
            let mut conn = self.shared.conn.lock();
            conn.outbound = Some(outbound_tx);
            conn.cancel = cancel.clone();
        }
        // Connected must be observable before the first frame.
        self.shared.emit(ConnectionState::Connected, kind, None);
        tokio::spawn(run_loop(Arc::clone(&self.shared), spec, kind, stream, outbound_rx, cancel));
        Ok(())
    }

    /// Queue a binary frame for sending. Fails while disconnected.
    pub fn send(&self, data: Vec<u8>) -> Result<()> {
        let conn = self.shared.conn.lock();
        match (&conn.outbound, conn.closed) {
            (Some(tx), false) => {
                tx.send(data).map_err(|_| Error::Transport("connection is shutting down".into()))
            }
            _ => Err(Error::Transport("not connected".into())),
        }
    }

    /// Close the connection and stop all background activity. Idempotent;
    /// the first call fires a final `disconnected` notification.
    pub fn close(&self) {
        {
            let mut conn = self.shared.conn.lock();
            if conn.closed {
                return;
            }
            conn.closed = true;
            conn.cancel.cancel();
            conn.outbound = None;
            conn.kind = TransportKind::None;
        }
        self.shared.emit(ConnectionState::Disconnected, TransportKind::None, None);
    }

    /// Current transport kind. Stays `Local`/`Cloud` through a reconnect
    /// streak, `None` after `close()`.
    pub fn kind(&self) -> TransportKind {
        self.shared.conn.lock().kind
    }

    pub fn is_connected(&self) -> bool {
        let conn = self.shared.conn.lock();
        conn.outbound.is_some() && !conn.closed
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.shared.conn.lock().cancel.cancel();
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    spec: ConnectSpec,
    kind: TransportKind,
    mut stream: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    let config = shared.config.clone();
    let keepalive_frame = codec::build_keepalive();

    'session: loop {
        let (mut sink, mut source) = stream.split();
        let mut keepalive =
            interval_at(Instant::now() + config.keepalive_interval, config.keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut heartbeat =
            interval_at(Instant::now() + config.heartbeat_interval, config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,

                frame = source.next() => match frame {
                    Some(Ok(WsMessage::Binary(data))) => {
                        let _ = shared.event_tx.send(TransportEvent::Frame(data));
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::debug!(url = %spec.url, "websocket closed by server");
                        break;
                    }
                    Some(Ok(_)) => {} // text/ping/pong ignored
                    Some(Err(e)) => {
                        tracing::debug!(url = %spec.url, err = %e, "websocket receive error");
                        break;
                    }
                },

                msg = outbound_rx.recv() => match msg {
                    Some(data) => {
                        if sink.send(WsMessage::Binary(data.into())).await.is_err() {
                            tracing::debug!(url = %spec.url, "websocket send failed");
                            break;
                        }
                    }
                    // Sender replaced or dropped: this session is over.
                    None => break,
                },

                _ = keepalive.tick() => {
                    if sink.send(WsMessage::Binary(keepalive_frame.clone().into())).await.is_err() {
                        tracing::warn!(url = %spec.url, "keepalive send failed");
                        break;
                    }
                }

                _ = heartbeat.tick() => {
                    if sink.send(WsMessage::Ping(bytes::Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        // Receive loop ended. Reconnect unless explicitly closed.
        if cancel.is_cancelled() || shared.is_closed() {
            return;
        }
        shared.clear_outbound();

        let mut backoff = config.initial_backoff;
        let mut jitter = config.first_retry_jitter.mul_f64(rand::random::<f64>());
        loop {
            shared.emit(ConnectionState::Reconnecting, kind, None);
            let delay = backoff + jitter;
            jitter = Duration::ZERO;
            tracing::info!(url = %spec.url, delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if shared.is_closed() {
                return;
            }
            match handshake(&config, &spec).await {
                Ok(new_stream) => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    shared.install_outbound(tx);
                    outbound_rx = rx;
                    stream = new_stream;
                    shared.emit(ConnectionState::Connected, kind, None);
                    tracing::info!(url = %spec.url, "reconnected");
                    continue 'session;
                }
                Err(e) => {
                    tracing::warn!(url = %spec.url, err = %e, "reconnect attempt failed");
                    backoff = next_backoff(backoff, &config);
                }
            }
        }
    }
}

async fn handshake(config: &TransportConfig, spec: &ConnectSpec) -> Result<WsStream> {
    let mut request = spec
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::Connection(format!("invalid websocket url: {e}")))?;
    let auth = HeaderValue::from_str(&spec.authorization)
        .map_err(|e| Error::Connection(format!("invalid authorization header: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, auth);

    let connector = if spec.insecure_tls { Some(insecure_tls_connector()?) } else { None };
    let connect = tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);
    match tokio::time::timeout(config.handshake_timeout, connect).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(Error::Connection(e.to_string())),
        Err(_) => Err(Error::Connection(format!(
            "handshake timed out after {:?}",
            config.handshake_timeout
        ))),
    }
}

fn cloud_url(base: &str, camera_uid: &str) -> String {
    format!("{}/focus/cameras/{camera_uid}/user_connect", base.trim_end_matches('/'))
}

fn local_url(config: &TransportConfig, camera_ip: &str) -> String {
    let scheme = if config.local_tls { "wss" } else { "ws" };
    format!("{scheme}://{camera_ip}:{}", config.local_port)
}

fn next_backoff(current: Duration, config: &TransportConfig) -> Duration {
    current.mul_f64(config.backoff_factor).min(config.max_backoff)
}

/// Install the process-wide rustls provider if nothing picked one yet. Both
/// the default wss connector and reqwest resolve the provider at runtime.
pub(crate) fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn insecure_tls_connector() -> Result<Connector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Connection(format!("tls configuration failed: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(danger::NoVerification::new(provider)))
        .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(tls)))
}

mod danger {
    use std::sync::Arc;

    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::CryptoProvider;
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, SignatureScheme};

    /// Accepts any server certificate. The camera's LAN endpoint serves a
    /// self-signed certificate, so verification is skipped there by default.
    #[derive(Debug)]
    pub(super) struct NoVerification {
        provider: Arc<CryptoProvider>,
    }

    impl NoVerification {
        pub(super) fn new(provider: Arc<CryptoProvider>) -> Self {
            Self { provider }
        }
    }

    impl ServerCertVerifier for NoVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.provider.signature_verification_algorithms.supported_schemes()
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
