// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated camera state snapshots.
//!
//! Every struct here is a plain value: updates clone the current snapshot,
//! replace the touched fields, and publish the result. Readers never observe
//! a half-applied update.

use serde::{Deserialize, Serialize};

/// Which transport the camera session currently runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Local,
    Cloud,
    #[default]
    None,
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Reconnecting,
}

/// Night light switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightLight {
    On,
    Off,
}

/// Wifi band preference reported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiBand {
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "2.4ghz")]
    Band24,
    #[serde(rename = "5ghz")]
    Band5,
}

/// Physical mounting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountingMode {
    Stand,
    Travel,
    Switch,
}

/// Latest sensor readings. Absent values mean the camera has not reported
/// that sensor yet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorState {
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity percentage.
    pub humidity: Option<f64>,
    /// Ambient light in lux.
    pub light: Option<i32>,
    pub sound_alert: bool,
    pub motion_alert: bool,
    /// True while the camera considers the room dark.
    pub night: bool,
}

/// Device settings. Any field may be absent when the device did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsState {
    pub night_vision: Option<bool>,
    /// Speaker volume, 0–100.
    pub volume: Option<u32>,
    pub sleep_mode: Option<bool>,
    pub status_light_on: Option<bool>,
    pub mic_mute_on: Option<bool>,
    pub wifi_band: Option<WifiBand>,
    pub mounting_mode: Option<MountingMode>,
}

/// Control-plane state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub night_light: Option<NightLight>,
    pub night_light_timeout: Option<u32>,
    pub sensor_data_transfer_enabled: Option<bool>,
}

/// Device status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusState {
    pub connected_to_server: Option<bool>,
    pub firmware_version: Option<String>,
    pub hardware_version: Option<String>,
    pub mounting_mode: Option<MountingMode>,
}

/// Connection bookkeeping for one camera session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub state: ConnectionState,
    pub transport: TransportKind,
    /// Epoch seconds of the most recent successful connect.
    pub last_seen: Option<u64>,
    pub last_error: Option<String>,
    /// Consecutive reconnect attempts in the current streak. Reset to zero on
    /// every successful connect.
    pub reconnect_attempts: u32,
}

/// Complete snapshot of everything known about one camera.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraState {
    pub connection: ConnectionInfo,
    pub sensors: SensorState,
    pub settings: SettingsState,
    pub control: ControlState,
    pub status: StatusState,
}

/// Return current epoch seconds.
pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
