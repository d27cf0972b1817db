// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire payload → state snapshot conversions.

use crate::proto;
use crate::state::{
    ControlState, MountingMode, NightLight, SensorState, SettingsState, StatusState, WifiBand,
};

/// Fold a batch of sensor readings into the current snapshot. Sensors absent
/// from the batch keep their previous values; pushes are deltas, not full
/// reports.
pub(crate) fn merge_sensor_data(data: &[proto::SensorData], current: &SensorState) -> SensorState {
    let mut next = *current;
    for entry in data {
        let Ok(sensor) = proto::SensorType::try_from(entry.sensor_type) else {
            tracing::debug!(sensor_type = entry.sensor_type, "unknown sensor type in push");
            continue;
        };
        match sensor {
            proto::SensorType::Temperature => {
                if let Some(v) = milli_or_value(entry) {
                    next.temperature = Some(v);
                }
            }
            proto::SensorType::Humidity => {
                if let Some(v) = milli_or_value(entry) {
                    next.humidity = Some(v);
                }
            }
            proto::SensorType::Light => {
                if let Some(v) = entry.value {
                    next.light = Some(v);
                }
            }
            proto::SensorType::Sound => next.sound_alert = entry.is_alert.unwrap_or(false),
            proto::SensorType::Motion => next.motion_alert = entry.is_alert.unwrap_or(false),
            proto::SensorType::Night => next.night = entry.value.unwrap_or(0) != 0,
        }
    }
    next
}

// Temperature and humidity arrive in thousandths; the plain integer field is
// the fallback for older firmware.
fn milli_or_value(entry: &proto::SensorData) -> Option<f64> {
    entry
        .value_milli
        .map(|milli| f64::from(milli) / 1000.0)
        .or_else(|| entry.value.map(f64::from))
}

pub(crate) fn parse_settings(settings: &proto::Settings) -> SettingsState {
    SettingsState {
        night_vision: settings.night_vision,
        volume: settings.volume,
        sleep_mode: settings.sleep_mode,
        status_light_on: settings.status_light_on,
        mic_mute_on: settings.mic_mute_on,
        wifi_band: settings
            .wifi_band
            .and_then(|v| proto::WifiBand::try_from(v).ok())
            .map(wifi_band),
        mounting_mode: settings
            .mounting_mode
            .and_then(|v| proto::MountingMode::try_from(v).ok())
            .map(mounting_mode),
    }
}

pub(crate) fn parse_control(control: &proto::Control) -> ControlState {
    ControlState {
        night_light: control
            .night_light
            .and_then(|v| proto::ControlNightLight::try_from(v).ok())
            .map(|v| match v {
                proto::ControlNightLight::LightOn => NightLight::On,
                proto::ControlNightLight::LightOff => NightLight::Off,
            }),
        night_light_timeout: control.night_light_timeout,
        sensor_data_transfer_enabled: control
            .sensor_data_transfer
            .as_ref()
            .map(|t| t.sound || t.motion || t.temperature || t.humidity || t.light || t.night),
    }
}

pub(crate) fn parse_status(status: &proto::Status) -> StatusState {
    StatusState {
        connected_to_server: status
            .connection_to_server
            .and_then(|v| proto::ConnectionToServer::try_from(v).ok())
            .map(|v| v == proto::ConnectionToServer::Connected),
        firmware_version: status.current_version.clone(),
        hardware_version: status.hardware_version.clone(),
        mounting_mode: status
            .mode
            .and_then(|v| proto::MountingMode::try_from(v).ok())
            .map(mounting_mode),
    }
}

fn wifi_band(band: proto::WifiBand) -> WifiBand {
    match band {
        proto::WifiBand::Any => WifiBand::Any,
        proto::WifiBand::Fr24ghz => WifiBand::Band24,
        proto::WifiBand::Fr50ghz => WifiBand::Band5,
    }
}

fn mounting_mode(mode: proto::MountingMode) -> MountingMode {
    match mode {
        proto::MountingMode::Stand => MountingMode::Stand,
        proto::MountingMode::Travel => MountingMode::Travel,
        proto::MountingMode::Switch => MountingMode::Switch,
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
