// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: one-shot armed-waiter registry for select/poll readiness
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! A client appears at most once; arming again replaces the wake token.
//! Triggering takes the whole registry — every waiter is woken exactly once
//! and must re-arm to hear about the next event.

use crate::ClientId;

/// A client armed for a readiness wake-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmedWaiter {
    pub client: ClientId,
    pub token: u64,
}

#[derive(Debug, Default)]
pub struct NotifyRegistry {
    waiters: Vec<ArmedWaiter>,
}

impl NotifyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `client` with `token`, replacing any prior arming.
    pub fn arm(&mut self, client: ClientId, token: u64) {
        self.disarm(client);
        self.waiters.push(ArmedWaiter { client, token });
    }

    /// Removes a client's waiter if present; idempotent.
    pub fn disarm(&mut self, client: ClientId) {
        self.waiters.retain(|w| w.client != client);
    }

    /// Takes every armed waiter, clearing the registry.
    pub fn drain_armed(&mut self) -> Vec<ArmedWaiter> {
        std::mem::take(&mut self.waiters)
    }

    pub fn is_armed(&self, client: ClientId) -> bool {
        self.waiters.iter().any(|w| w.client == client)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
