// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: open-handle table and per-client descriptor mappings
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! A `Handle` is one successful open, shared across duplicated descriptors
//! through link counting. The record is freed exactly when the last link
//! drops; a queued read holds one link so the record can never vanish under
//! a deferred reply.

use std::collections::HashMap;

use crate::protocol::RanddError;
use crate::{ClientId, Fd, HandleId};

/// Descriptor table capacity; open/dup beyond this fails with `OutOfMemory`.
pub const MAX_DESCRIPTORS: usize = 1024;

/// Open-file-state record.
#[derive(Debug)]
pub struct Handle {
    pub unit: u8,
    pub oflag: u32,
    links: u32,
}

impl Handle {
    pub fn links(&self) -> u32 {
        self.links
    }
}

#[derive(Debug, Default)]
pub struct HandleTable {
    handles: HashMap<HandleId, Handle>,
    descriptors: HashMap<(ClientId, Fd), HandleId>,
    next: u32,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh handle for `(client, fd)` with one link. An existing
    /// mapping for the same descriptor is closed first; the transport owns
    /// descriptor allocation and this table only mirrors it.
    pub fn open(
        &mut self,
        client: ClientId,
        fd: Fd,
        unit: u8,
        oflag: u32,
    ) -> Result<HandleId, RanddError> {
        if self.descriptors.len() >= MAX_DESCRIPTORS {
            return Err(RanddError::OutOfMemory);
        }
        let _ = self.close(client, fd);
        let id = HandleId(self.next);
        self.next = self.next.wrapping_add(1);
        self.handles.insert(id, Handle { unit, oflag, links: 1 });
        self.descriptors.insert((client, fd), id);
        Ok(id)
    }

    /// Maps `(dst_client, dst_fd)` onto the handle behind
    /// `(src_client, src_fd)`, bumping its link count.
    pub fn dup(
        &mut self,
        src_client: ClientId,
        src_fd: Fd,
        dst_client: ClientId,
        dst_fd: Fd,
    ) -> Result<HandleId, RanddError> {
        let id = *self
            .descriptors
            .get(&(src_client, src_fd))
            .ok_or(RanddError::BadDescriptor)?;
        if self.descriptors.len() >= MAX_DESCRIPTORS {
            return Err(RanddError::OutOfMemory);
        }
        let _ = self.close(dst_client, dst_fd);
        self.retain(id);
        self.descriptors.insert((dst_client, dst_fd), id);
        Ok(id)
    }

    /// Removes the mapping and drops one link. Closing an unmapped
    /// descriptor is an error the dispatcher tolerates as a no-op.
    pub fn close(&mut self, client: ClientId, fd: Fd) -> Result<(), RanddError> {
        let id = self
            .descriptors
            .remove(&(client, fd))
            .ok_or(RanddError::BadDescriptor)?;
        self.release(id);
        Ok(())
    }

    pub fn lookup(&self, client: ClientId, fd: Fd) -> Option<(HandleId, &Handle)> {
        let id = *self.descriptors.get(&(client, fd))?;
        self.handles.get(&id).map(|handle| (id, handle))
    }

    pub fn get(&self, id: HandleId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    /// Adds a link; used by queued reads to pin their handle.
    pub fn retain(&mut self, id: HandleId) {
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.links += 1;
        }
    }

    /// Drops a link, freeing the record at zero.
    pub fn release(&mut self, id: HandleId) {
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.links -= 1;
            if handle.links == 0 {
                self.handles.remove(&id);
            }
        }
    }

    /// True when no descriptor maps and no handle records remain.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.handles.is_empty()
    }

    pub fn open_descriptors(&self) -> usize {
        self.descriptors.len()
    }
}
