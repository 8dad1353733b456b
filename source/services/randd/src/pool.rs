// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: entropy-pool collaborator seam and the interrupt-timing pool
//!
//! OWNERS: @runtime @security
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! The dispatcher only ever touches the five `EntropySource` operations; it
//! never inspects the mixing state. `available` meters credited interrupt
//! entropy and gates blocking reads on the `random` unit; `extract` always
//! fills the buffer, degrading to derived (hash-chained) output once the
//! credit is spent — that degradation is what makes `urandom` unlimited.
//!
//! SECURITY INVARIANTS:
//!   - Pool state and extracted bytes MUST NOT be logged
//!   - `InterruptPool` is a stand-in mixer, not a cryptographic design claim

use std::time::Instant;

use sha2::{Digest, Sha256};

/// Entropy credited per distinct interrupt event, in bytes.
pub const CREDIT_PER_INTERRUPT: usize = 16;

/// Cap on credited (not derived) entropy.
pub const POOL_CAP: usize = 4096;

/// The five operations the core is allowed to call.
pub trait EntropySource {
    /// One-time pool setup before the dispatch loop starts.
    fn init(&mut self);

    /// Binds the pool to an interrupt source; `false` fails startup.
    fn init_irq(&mut self, irq: u8) -> bool;

    /// Mixes in randomness attributable to one interrupt event.
    fn add_interrupt_entropy(&mut self, irq: u8);

    /// Currently credited bytes. Zero means a blocking `random` read defers.
    fn available(&self) -> usize;

    /// Fills `buf` completely, debiting credit down to zero and continuing
    /// with derived output beyond it.
    fn extract(&mut self, buf: &mut [u8]);
}

/// SHA-256 mixing pool fed by interrupt timing deltas.
pub struct InterruptPool {
    state: [u8; 32],
    counter: u64,
    credited: usize,
    epoch: Instant,
    last_nanos: u128,
    irq: Option<u8>,
}

impl InterruptPool {
    pub fn new() -> Self {
        Self {
            state: [0u8; 32],
            counter: 0,
            credited: 0,
            epoch: Instant::now(),
            last_nanos: 0,
            irq: None,
        }
    }

    fn mix(&mut self, material: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.state);
        hasher.update(material);
        self.state = hasher.finalize().into();
    }
}

impl Default for InterruptPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for InterruptPool {
    fn init(&mut self) {
        let nanos = self.epoch.elapsed().as_nanos();
        self.mix(&nanos.to_le_bytes());
        self.mix(&std::process::id().to_le_bytes());
    }

    fn init_irq(&mut self, irq: u8) -> bool {
        self.irq = Some(irq);
        true
    }

    fn add_interrupt_entropy(&mut self, irq: u8) {
        let nanos = self.epoch.elapsed().as_nanos();
        let delta = nanos.wrapping_sub(self.last_nanos);
        self.last_nanos = nanos;
        self.mix(&nanos.to_le_bytes());
        self.mix(&delta.to_le_bytes());
        self.mix(&[irq]);
        self.credited = (self.credited + CREDIT_PER_INTERRUPT).min(POOL_CAP);
    }

    fn available(&self) -> usize {
        self.credited
    }

    fn extract(&mut self, buf: &mut [u8]) {
        let mut filled = 0;
        while filled < buf.len() {
            let mut hasher = Sha256::new();
            hasher.update(self.state);
            hasher.update(self.counter.to_le_bytes());
            let block: [u8; 32] = hasher.finalize().into();
            self.counter = self.counter.wrapping_add(1);
            // Fold the block back so successive extractions never repeat.
            self.mix(&block);
            let n = (buf.len() - filled).min(block.len());
            buf[filled..filled + n].copy_from_slice(&block[..n]);
            filled += n;
        }
        self.credited = self.credited.saturating_sub(buf.len());
    }
}
