// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: randd — entropy character-device service (`random` + `urandom` units)
//! OWNERS: @runtime @security
//! STATUS: Functional (host backend)
//! API_STABILITY: Unstable (v1 wire protocol)
//! TEST_COVERAGE: Unit tests per module + integration tests in `tests/`
//!   + end-to-end loopback tests in `tests/randd_e2e`
//!
//! PUBLIC API: server::Randd, server::Transport, server::Event,
//!   pool::EntropySource, protocol frame codecs
//! DEPENDS_ON: log, thiserror, sha2
//!
//! SECURITY INVARIANTS:
//!   - Entropy bytes MUST NOT be logged
//!   - Reads are bounded to MAX_READ_BYTES per request
//!   - Permission bits are checked before any handle is installed
//!
//! The service exposes two character devices over a message-passing
//! transport: unit 0 (`random`) behaves like a pipe and defers reads until
//! interrupt entropy arrives; unit 1 (`urandom`) never blocks and degrades
//! to derived output. All state is owned by a single dispatch loop; blocking
//! is modeled as deferred replies, never as a held thread.

#![forbid(unsafe_code)]

pub mod device;
pub mod handle;
pub mod notify;
pub mod pool;
pub mod protocol;
pub mod queue;
pub mod server;

/// Bytes moved per transfer attempt while satisfying a read.
pub const TRANSFER_CHUNK: usize = 4096;

/// Upper bound on a single READ request.
pub const MAX_READ_BYTES: u32 = 64 * 1024;

/// Transport-level identity of a client process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClientId(pub u64);

/// Client-local descriptor identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fd(pub u32);

/// Server-side identity of an open-handle record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HandleId(pub u32);
