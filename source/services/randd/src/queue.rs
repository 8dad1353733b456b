// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: blocked-read queue, ordered by client priority then arrival
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! One entry per deferred read. Ordering invariant: descending priority,
//! FIFO among equals — a new entry is inserted before the first entry whose
//! priority is strictly lower. Removal is the sole destruction point; the
//! dispatcher releases the pinned handle link when it removes an entry.

use std::collections::VecDeque;

use crate::protocol::RanddError;
use crate::{ClientId, HandleId};

/// Cap on simultaneously deferred reads; one per blocked client call, so
/// this is effectively a client cap.
pub const MAX_BLOCKED_READS: usize = 256;

/// One deferred read call.
#[derive(Debug)]
pub struct ReadRequest {
    pub client: ClientId,
    pub handle: HandleId,
    pub requested: usize,
    pub delivered: usize,
    pub priority: u8,
}

#[derive(Debug, Default)]
pub struct BlockedReads {
    entries: VecDeque<ReadRequest>,
}

impl BlockedReads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts by descending priority, after existing entries of equal
    /// priority.
    pub fn enqueue(&mut self, req: ReadRequest) -> Result<(), RanddError> {
        if self.entries.len() >= MAX_BLOCKED_READS {
            return Err(RanddError::OutOfMemory);
        }
        let at = self
            .entries
            .iter()
            .position(|e| e.priority < req.priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, req);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ReadRequest> {
        self.entries.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<ReadRequest> {
        self.entries.remove(index)
    }

    /// Removes every zero-progress entry belonging to `client`. Matching is
    /// by client identity, never by handle: duplicated descriptors may share
    /// a handle across clients. Entries with progress are left for the
    /// normal drain path to complete.
    pub fn cancel_client(&mut self, client: ClientId) -> Vec<ReadRequest> {
        let mut cancelled = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].client == client && self.entries[index].delivered == 0 {
                if let Some(entry) = self.entries.remove(index) {
                    cancelled.push(entry);
                }
            } else {
                index += 1;
            }
        }
        cancelled
    }
}
