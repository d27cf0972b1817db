// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Camera events fanned out to subscribers.

use serde::{Deserialize, Serialize};

use crate::state::CameraState;

/// What changed in a [`CameraEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraEventKind {
    SensorUpdate,
    SettingsUpdate,
    ControlUpdate,
    StatusUpdate,
    ConnectionChange,
}

/// An event emitted after every state mutation. `state` is the full snapshot
/// as of the event, so a late subscriber can treat any event as a resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEvent {
    pub kind: CameraEventKind,
    pub state: CameraState,
}
