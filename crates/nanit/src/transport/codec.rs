// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope encode/decode helpers.
//!
//! This is the only place where wire bytes become typed messages; decode
//! failures surface as [`Error::Protocol`] so upper layers never see raw
//! prost errors. An empty frame decodes to the default envelope, which is a
//! KEEPALIVE: that is the wire idiom for the empty envelope, and decoding it
//! costs no allocation.

use prost::Message as _;

use crate::error::{Error, Result};
use crate::proto;

/// One-of payload attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestPayload {
    #[default]
    None,
    GetStatus(proto::GetStatus),
    GetSensorData(proto::GetSensorData),
    GetControl(proto::GetControl),
    Settings(proto::Settings),
    Control(proto::Control),
    Streaming(proto::Streaming),
}

/// Serialize an envelope.
pub fn encode_message(msg: &proto::Message) -> Vec<u8> {
    msg.encode_to_vec()
}

/// Deserialize an envelope, mapping any parse failure to a protocol error.
pub fn decode_message(data: &[u8]) -> Result<proto::Message> {
    proto::Message::decode(data).map_err(|e| Error::Protocol(format!("failed to decode envelope: {e}")))
}

/// Build a serialized KEEPALIVE envelope.
pub fn build_keepalive() -> Vec<u8> {
    encode_message(&proto::Message {
        r#type: proto::MessageType::Keepalive as i32,
        request: None,
        response: None,
    })
}

/// Build a serialized REQUEST envelope with the given correlation id, type,
/// and payload.
pub fn build_request(id: u32, request_type: proto::RequestType, payload: RequestPayload) -> Vec<u8> {
    let mut request = proto::Request {
        id,
        r#type: request_type as i32,
        ..Default::default()
    };
    match payload {
        RequestPayload::None => {}
        RequestPayload::GetStatus(p) => request.get_status = Some(p),
        RequestPayload::GetSensorData(p) => request.get_sensor_data = Some(p),
        RequestPayload::GetControl(p) => request.get_control = Some(p),
        RequestPayload::Settings(p) => request.settings = Some(p),
        RequestPayload::Control(p) => request.control = Some(p),
        RequestPayload::Streaming(p) => request.streaming = Some(p),
    }
    encode_message(&proto::Message {
        r#type: proto::MessageType::Request as i32,
        request: Some(request),
        response: None,
    })
}

/// Return the response carried by a RESPONSE envelope, if any.
pub fn extract_response(msg: &proto::Message) -> Option<&proto::Response> {
    if msg.r#type == proto::MessageType::Response as i32 {
        msg.response.as_ref()
    } else {
        None
    }
}

/// Return the request carried by a REQUEST envelope (a camera-originated
/// push), if any.
pub fn extract_request(msg: &proto::Message) -> Option<&proto::Request> {
    if msg.r#type == proto::MessageType::Request as i32 {
        msg.request.as_ref()
    } else {
        None
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
