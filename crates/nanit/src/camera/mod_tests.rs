// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn make_camera() -> Camera {
    crate::transport::ws::ensure_crypto_provider();
    let rest = RestClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
    let tokens = Arc::new(TokenManager::new(rest.clone(), "tok".into(), "ref".into(), None));
    Camera::new("cam_uid_1", "baby_uid_1", tokens, rest, CameraConfig::default())
}

fn response_frame(request_id: u32, status_code: i32) -> Vec<u8> {
    codec::encode_message(&proto::Message {
        r#type: proto::MessageType::Response as i32,
        request: None,
        response: Some(proto::Response { request_id, status_code, ..Default::default() }),
    })
}

fn push_frame(request: proto::Request) -> Vec<u8> {
    codec::encode_message(&proto::Message {
        r#type: proto::MessageType::Request as i32,
        request: Some(request),
        response: None,
    })
}

// ── properties ────────────────────────────────────────────────────────

#[test]
fn new_camera_has_default_state() {
    let camera = make_camera();
    assert_eq!(camera.uid(), "cam_uid_1");
    assert_eq!(camera.baby_uid(), "baby_uid_1");
    assert_eq!(camera.state(), CameraState::default());
    assert!(!camera.is_connected());
    assert_eq!(camera.pending_count(), 0);
}

// ── connection change ─────────────────────────────────────────────────

#[test]
fn connected_sets_last_seen_and_resets_attempts() {
    let camera = make_camera();
    camera.inner.handle_connection_change(ConnectionState::Connected, TransportKind::Cloud, None);

    let conn = camera.state().connection;
    assert_eq!(conn.state, ConnectionState::Connected);
    assert_eq!(conn.transport, TransportKind::Cloud);
    assert!(conn.last_seen.is_some());
    assert_eq!(conn.reconnect_attempts, 0);
}

#[test]
fn reconnecting_increments_attempts_and_keeps_last_seen() {
    let camera = make_camera();
    camera.inner.handle_connection_change(ConnectionState::Connected, TransportKind::Cloud, None);
    let seen = camera.state().connection.last_seen;

    camera.inner.handle_connection_change(
        ConnectionState::Reconnecting,
        TransportKind::Cloud,
        Some("err".into()),
    );
    camera.inner.handle_connection_change(
        ConnectionState::Reconnecting,
        TransportKind::Cloud,
        Some("err2".into()),
    );

    let conn = camera.state().connection;
    assert_eq!(conn.reconnect_attempts, 2);
    assert_eq!(conn.last_seen, seen);
    assert_eq!(conn.last_error.as_deref(), Some("err2"));
}

#[test]
fn connected_after_a_streak_resets_attempts() {
    let camera = make_camera();
    camera.inner.handle_connection_change(ConnectionState::Reconnecting, TransportKind::Cloud, None);
    camera.inner.handle_connection_change(ConnectionState::Connected, TransportKind::Cloud, None);
    assert_eq!(camera.state().connection.reconnect_attempts, 0);
}

#[test]
fn disconnected_cancels_pending_with_transport_error() -> anyhow::Result<()> {
    let camera = make_camera();
    let id = camera.inner.pending.next_id();
    let mut awaiter = camera.inner.pending.track(id)?;

    camera.inner.handle_connection_change(
        ConnectionState::Disconnected,
        TransportKind::None,
        Some("lost".into()),
    );

    let result = awaiter.try_recv()?;
    assert!(matches!(result, Err(Error::Transport(msg)) if msg == "Connection lost"));
    assert_eq!(camera.pending_count(), 0);
    Ok(())
}

#[test]
fn reconnecting_also_drains_pending() -> anyhow::Result<()> {
    // The pending table must be empty whenever the session is not connected.
    let camera = make_camera();
    let id = camera.inner.pending.next_id();
    let _awaiter = camera.inner.pending.track(id)?;

    camera.inner.handle_connection_change(ConnectionState::Reconnecting, TransportKind::Cloud, None);
    assert_eq!(camera.pending_count(), 0);
    Ok(())
}

#[test]
fn connection_change_notifies_subscribers() -> anyhow::Result<()> {
    let camera = make_camera();
    let mut events = camera.subscribe();

    camera.inner.handle_connection_change(ConnectionState::Connected, TransportKind::Cloud, None);

    let event = events.try_recv()?;
    assert_eq!(event.kind, CameraEventKind::ConnectionChange);
    assert_eq!(event.state.connection.state, ConnectionState::Connected);
    Ok(())
}

// ── frame dispatch ────────────────────────────────────────────────────

#[test]
fn response_frame_resolves_pending() -> anyhow::Result<()> {
    let camera = make_camera();
    let id = camera.inner.pending.next_id();
    let mut awaiter = camera.inner.pending.track(id)?;

    camera.inner.handle_frame(&response_frame(id, 200));

    let response = awaiter.try_recv()??;
    assert_eq!(response.request_id, id);
    assert_eq!(response.status_code, 200);
    Ok(())
}

#[test]
fn response_for_unknown_request_is_dropped() {
    let camera = make_camera();
    camera.inner.handle_frame(&response_frame(99, 200));
    assert_eq!(camera.pending_count(), 0);
    assert_eq!(camera.state(), CameraState::default());
}

#[test]
fn undecodable_frame_is_dropped() {
    let camera = make_camera();
    camera.inner.handle_frame(&[0xff, 0xff, 0xff]);
    assert_eq!(camera.state(), CameraState::default());
}

#[test]
fn keepalive_frame_is_a_noop() -> anyhow::Result<()> {
    let camera = make_camera();
    let mut events = camera.subscribe();

    camera.inner.handle_frame(&codec::build_keepalive());

    assert_eq!(camera.state(), CameraState::default());
    assert!(events.try_recv().is_err());
    Ok(())
}

// ── push events ───────────────────────────────────────────────────────

#[test]
fn sensor_push_merges_and_notifies() -> anyhow::Result<()> {
    let camera = make_camera();
    let mut events = camera.subscribe();

    let frame = push_frame(proto::Request {
        r#type: proto::RequestType::PutSensorData as i32,
        sensor_data: vec![proto::SensorData {
            sensor_type: proto::SensorType::Temperature as i32,
            value_milli: Some(21_500),
            ..Default::default()
        }],
        ..Default::default()
    });
    camera.inner.handle_frame(&frame);

    assert_eq!(camera.state().sensors.temperature, Some(21.5));
    assert_eq!(camera.state().sensors.humidity, None);
    let event = events.try_recv()?;
    assert_eq!(event.kind, CameraEventKind::SensorUpdate);
    assert_eq!(event.state.sensors.temperature, Some(21.5));
    Ok(())
}

#[test]
fn settings_push_replaces_settings() -> anyhow::Result<()> {
    let camera = make_camera();
    let mut events = camera.subscribe();

    let frame = push_frame(proto::Request {
        r#type: proto::RequestType::PutSettings as i32,
        settings: Some(proto::Settings { volume: Some(42), ..Default::default() }),
        ..Default::default()
    });
    camera.inner.handle_frame(&frame);

    assert_eq!(camera.state().settings.volume, Some(42));
    assert_eq!(events.try_recv()?.kind, CameraEventKind::SettingsUpdate);
    Ok(())
}

#[test]
fn status_push_replaces_status() {
    let camera = make_camera();
    let frame = push_frame(proto::Request {
        r#type: proto::RequestType::PutStatus as i32,
        status: Some(proto::Status {
            connection_to_server: Some(proto::ConnectionToServer::Connected as i32),
            current_version: Some("2.0.0".into()),
            ..Default::default()
        }),
        ..Default::default()
    });
    camera.inner.handle_frame(&frame);

    let status = camera.state().status;
    assert_eq!(status.connected_to_server, Some(true));
    assert_eq!(status.firmware_version.as_deref(), Some("2.0.0"));
}

#[test]
fn control_push_replaces_control() {
    let camera = make_camera();
    let frame = push_frame(proto::Request {
        r#type: proto::RequestType::PutControl as i32,
        control: Some(proto::Control {
            night_light: Some(proto::ControlNightLight::LightOn as i32),
            ..Default::default()
        }),
        ..Default::default()
    });
    camera.inner.handle_frame(&frame);
    assert_eq!(camera.state().control.night_light, Some(NightLight::On));
}

#[test]
fn get_type_push_is_ignored() {
    let camera = make_camera();
    let mut events = camera.subscribe();
    let frame = push_frame(proto::Request {
        r#type: proto::RequestType::GetStatus as i32,
        ..Default::default()
    });
    camera.inner.handle_frame(&frame);
    assert!(events.try_recv().is_err());
}

#[test]
fn partial_updates_preserve_other_sections() {
    let camera = make_camera();
    camera.inner.handle_frame(&push_frame(proto::Request {
        r#type: proto::RequestType::PutSensorData as i32,
        sensor_data: vec![proto::SensorData {
            sensor_type: proto::SensorType::Temperature as i32,
            value_milli: Some(22_000),
            ..Default::default()
        }],
        ..Default::default()
    }));
    camera.inner.handle_frame(&push_frame(proto::Request {
        r#type: proto::RequestType::PutSettings as i32,
        settings: Some(proto::Settings { volume: Some(50), ..Default::default() }),
        ..Default::default()
    }));

    let state = camera.state();
    assert_eq!(state.sensors.temperature, Some(22.0));
    assert_eq!(state.settings.volume, Some(50));
}

// ── streaming url ─────────────────────────────────────────────────────

#[tokio::test]
async fn rtmps_url_embeds_baby_uid_and_fresh_token() -> anyhow::Result<()> {
    let camera = make_camera();
    let url = camera.rtmps_url().await?;
    assert_eq!(url, "rtmps://media-secured.nanit.com/nanit/baby_uid_1.tok");
    Ok(())
}

// ── stop ──────────────────────────────────────────────────────────────

#[test]
fn stop_drains_pending_and_is_idempotent() -> anyhow::Result<()> {
    let camera = make_camera();
    let id = camera.inner.pending.next_id();
    let mut awaiter = camera.inner.pending.track(id)?;

    camera.stop();
    assert_eq!(camera.pending_count(), 0);
    assert!(awaiter.try_recv().is_err());
    assert!(!camera.is_connected());

    camera.stop();
    assert_eq!(camera.pending_count(), 0);
    Ok(())
}
