// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation for outgoing requests.
//!
//! Each outgoing request gets a unique id and a one-shot awaiter. When a
//! response with a matching `request_id` arrives, the awaiter completes.
//! Timeouts are enforced at the call site; a timed-out entry left in the
//! table is reaped by the next `resolve` or `cancel_all`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::proto;

/// What a pending awaiter eventually yields: the correlated response, or the
/// error the table was drained with.
pub type PendingResult = std::result::Result<proto::Response, Error>;

/// Tracks in-flight requests and routes responses back to their awaiters.
pub struct PendingRequests {
    next_id: AtomicU32,
    pending: Mutex<HashMap<u32, oneshot::Sender<PendingResult>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self { next_id: AtomicU32::new(1), pending: Mutex::new(HashMap::new()) }
    }

    /// Allocate the next request id. Strictly monotonically increasing for
    /// the lifetime of the table, starting at 1.
    pub fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register an awaiter for `id`. Fails if the id is already tracked.
    pub fn track(&self, id: u32) -> Result<oneshot::Receiver<PendingResult>> {
        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            return Err(Error::Transport(format!("request {id} is already tracked")));
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok(rx)
    }

    /// Complete the awaiter for `id` with `response`.
    ///
    /// Returns true when an entry existed and its awaiter was still alive.
    /// Unknown ids and entries whose receiver was already dropped (e.g. by a
    /// caller-side timeout) return false; either way the entry is removed.
    pub fn resolve(&self, id: u32, response: proto::Response) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };
        tx.send(Ok(response)).is_ok()
    }

    /// Drop the entry for `id` without completing it. The awaiter, if still
    /// held, observes a cancellation.
    pub fn discard(&self, id: u32) {
        self.pending.lock().remove(&id);
    }

    /// Drain the table. Every awaiter completes with `error` when given,
    /// otherwise it is cancelled. Called on disconnect and close.
    pub fn cancel_all(&self, error: Option<Error>) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in drained {
            match &error {
                Some(e) => {
                    let _ = tx.send(Err(e.clone()));
                }
                None => drop(tx),
            }
        }
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
