// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the camera's binary protobuf protocol.
//!
//! The schema is small and stable, so the messages are maintained by hand
//! with prost derives instead of a protoc build step. Both directions of the
//! WebSocket carry a single [`Message`] envelope: KEEPALIVE frames are empty,
//! REQUEST frames carry at most one typed payload, and RESPONSE frames mirror
//! the request payloads they answer.

/// Envelope discriminator. An empty buffer decodes to the default message,
/// which is a KEEPALIVE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Keepalive = 0,
    Request = 1,
    Response = 2,
}

/// Typed operation carried by a REQUEST (and echoed by its RESPONSE).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RequestType {
    Unknown = 0,
    GetSensorData = 1,
    PutSensorData = 2,
    GetSettings = 3,
    PutSettings = 4,
    GetControl = 5,
    PutControl = 6,
    GetStatus = 7,
    PutStatus = 8,
    PutStreaming = 9,
}

impl RequestType {
    /// Wire-style name, used in errors and logs.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::GetSensorData => "GET_SENSOR_DATA",
            Self::PutSensorData => "PUT_SENSOR_DATA",
            Self::GetSettings => "GET_SETTINGS",
            Self::PutSettings => "PUT_SETTINGS",
            Self::GetControl => "GET_CONTROL",
            Self::PutControl => "PUT_CONTROL",
            Self::GetStatus => "GET_STATUS",
            Self::PutStatus => "PUT_STATUS",
            Self::PutStreaming => "PUT_STREAMING",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SensorType {
    Sound = 0,
    Motion = 1,
    Temperature = 2,
    Humidity = 3,
    Light = 4,
    Night = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ControlNightLight {
    LightOff = 0,
    LightOn = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WifiBand {
    Any = 0,
    Fr24ghz = 1,
    Fr50ghz = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MountingMode {
    Stand = 0,
    Travel = 1,
    Switch = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ConnectionToServer {
    Disconnected = 0,
    Connected = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamIdentifier {
    Mobile = 0,
    Dvr = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamingStatus {
    Started = 0,
    Stopped = 1,
    Paused = 2,
}

/// Top-level envelope exchanged on the WebSocket.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(enumeration = "MessageType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub request: Option<Request>,
    #[prost(message, optional, tag = "3")]
    pub response: Option<Response>,
}

/// A request: either client-originated (with a correlation `id`) or a push
/// notification originated by the camera.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(enumeration = "RequestType", tag = "2")]
    pub r#type: i32,
    #[prost(message, optional, tag = "3")]
    pub get_sensor_data: Option<GetSensorData>,
    #[prost(message, repeated, tag = "4")]
    pub sensor_data: Vec<SensorData>,
    #[prost(message, optional, tag = "5")]
    pub settings: Option<Settings>,
    #[prost(message, optional, tag = "6")]
    pub get_control: Option<GetControl>,
    #[prost(message, optional, tag = "7")]
    pub control: Option<Control>,
    #[prost(message, optional, tag = "8")]
    pub get_status: Option<GetStatus>,
    #[prost(message, optional, tag = "9")]
    pub status: Option<Status>,
    #[prost(message, optional, tag = "10")]
    pub streaming: Option<Streaming>,
}

/// A reply correlated to an earlier [`Request`] by `request_id`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(uint32, tag = "1")]
    pub request_id: u32,
    #[prost(enumeration = "RequestType", tag = "2")]
    pub request_type: i32,
    #[prost(int32, tag = "3")]
    pub status_code: i32,
    #[prost(message, repeated, tag = "4")]
    pub sensor_data: Vec<SensorData>,
    #[prost(message, optional, tag = "5")]
    pub settings: Option<Settings>,
    #[prost(message, optional, tag = "6")]
    pub control: Option<Control>,
    #[prost(message, optional, tag = "7")]
    pub status: Option<Status>,
}

/// One sensor reading. Temperature and humidity arrive in thousandths via
/// `value_milli`; the integer `value` field is the fallback.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SensorData {
    #[prost(enumeration = "SensorType", tag = "1")]
    pub sensor_type: i32,
    #[prost(uint64, optional, tag = "2")]
    pub timestamp: Option<u64>,
    #[prost(int32, optional, tag = "3")]
    pub value: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub value_milli: Option<i32>,
    #[prost(bool, optional, tag = "5")]
    pub is_alert: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Settings {
    #[prost(bool, optional, tag = "1")]
    pub night_vision: Option<bool>,
    #[prost(uint32, optional, tag = "2")]
    pub volume: Option<u32>,
    #[prost(bool, optional, tag = "3")]
    pub sleep_mode: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub status_light_on: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub mic_mute_on: Option<bool>,
    #[prost(enumeration = "WifiBand", optional, tag = "6")]
    pub wifi_band: Option<i32>,
    #[prost(enumeration = "MountingMode", optional, tag = "7")]
    pub mounting_mode: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Control {
    #[prost(enumeration = "ControlNightLight", optional, tag = "1")]
    pub night_light: Option<i32>,
    #[prost(uint32, optional, tag = "2")]
    pub night_light_timeout: Option<u32>,
    #[prost(message, optional, tag = "3")]
    pub sensor_data_transfer: Option<SensorDataTransfer>,
}

/// Which sensors the camera should push unsolicited updates for.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SensorDataTransfer {
    #[prost(bool, tag = "1")]
    pub sound: bool,
    #[prost(bool, tag = "2")]
    pub motion: bool,
    #[prost(bool, tag = "3")]
    pub temperature: bool,
    #[prost(bool, tag = "4")]
    pub humidity: bool,
    #[prost(bool, tag = "5")]
    pub light: bool,
    #[prost(bool, tag = "6")]
    pub night: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    #[prost(enumeration = "ConnectionToServer", optional, tag = "1")]
    pub connection_to_server: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub current_version: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub hardware_version: Option<String>,
    #[prost(enumeration = "MountingMode", optional, tag = "4")]
    pub mode: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Streaming {
    #[prost(enumeration = "StreamIdentifier", tag = "1")]
    pub id: i32,
    #[prost(enumeration = "StreamingStatus", tag = "2")]
    pub status: i32,
    #[prost(string, tag = "3")]
    pub rtmp_url: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetStatus {
    #[prost(bool, tag = "1")]
    pub all: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSensorData {
    #[prost(bool, tag = "1")]
    pub all: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetControl {
    #[prost(bool, tag = "1")]
    pub night_light: bool,
}
