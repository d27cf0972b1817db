// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport: envelope codec, request correlation, and the
//! reconnecting connection itself.

pub mod codec;
pub mod pending;
pub mod ws;

use bytes::Bytes;

use crate::state::{ConnectionState, TransportKind};

/// Events delivered from the transport to its owner, in wire order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A binary frame as received, uninterpreted.
    Frame(Bytes),
    /// A connection lifecycle transition.
    ConnectionChange {
        state: ConnectionState,
        transport: TransportKind,
        error: Option<String>,
    },
}
