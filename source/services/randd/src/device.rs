// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: static registry of the two entropy device units
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! Unit 0 (`random`) is owner/group-readable and meters real interrupt
//! entropy; unit 1 (`urandom`) is world-readable and unlimited. Metadata is
//! fixed at startup except for timestamps; the access time is dirtied by
//! successful reads.

use crate::protocol::{RanddError, StatPayload, ACCMODE_MASK, ACC_READ, ACC_READ_WRITE, ACC_WRITE};

pub const UNIT_RANDOM: u8 = 0;
pub const UNIT_URANDOM: u8 = 1;
pub const UNIT_COUNT: usize = 2;

/// Character-special file type bit in `mode`.
pub const S_IFCHR: u32 = 0o020000;

/// One device unit's live metadata.
#[derive(Debug)]
pub struct Device {
    pub unit: u8,
    pub name: &'static str,
    pub unlimited: bool,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub ino: u64,
    pub dev: u64,
    pub rdev: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

impl Device {
    /// Stat snapshot with the caller-supplied size field (live entropy count).
    pub fn stat(&self, size: u64) -> StatPayload {
        StatPayload {
            ino: self.ino,
            dev: self.dev,
            rdev: self.rdev,
            mode: self.mode,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            size,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }

    pub fn touch_atime(&mut self, now: u64) {
        self.atime = now;
    }

    /// Owner/group/other permission check for the requested access mode.
    /// uid 0 bypasses the bits.
    pub fn check_access(&self, uid: u32, gid: u32, accmode: u32) -> Result<(), RanddError> {
        if uid == 0 {
            return Ok(());
        }
        let class = if uid == self.uid {
            (self.mode >> 6) & 0o7
        } else if gid == self.gid {
            (self.mode >> 3) & 0o7
        } else {
            self.mode & 0o7
        };
        let needed = match accmode & ACCMODE_MASK {
            ACC_READ => 0o4,
            ACC_WRITE => 0o2,
            ACC_READ_WRITE => 0o6,
            _ => return Err(RanddError::InvalidArgument),
        };
        if class & needed == needed {
            Ok(())
        } else {
            Err(RanddError::PermissionDenied)
        }
    }
}

/// The registry: exactly two units, created once at startup.
#[derive(Debug)]
pub struct DeviceTable {
    units: [Device; UNIT_COUNT],
}

impl DeviceTable {
    /// Builds both units. `node` seeds the synthetic dev/rdev identifiers;
    /// `now` stamps all timestamps.
    pub fn new(uid: u32, gid: u32, node: u64, now: u64) -> Self {
        let make = |unit: u8, name: &'static str, unlimited: bool, mode: u32| Device {
            unit,
            name,
            unlimited,
            uid,
            gid,
            mode: S_IFCHR | mode,
            ino: u64::from(unit),
            dev: (node << 16) | u64::from(unit),
            rdev: (node << 16) | u64::from(unit),
            atime: now,
            mtime: now,
            ctime: now,
        };
        Self {
            units: [
                make(UNIT_RANDOM, "random", false, 0o640),
                make(UNIT_URANDOM, "urandom", true, 0o444),
            ],
        }
    }

    pub fn get(&self, unit: u8) -> Option<&Device> {
        self.units.get(usize::from(unit))
    }

    pub fn get_mut(&mut self, unit: u8) -> Option<&mut Device> {
        self.units.get_mut(usize::from(unit))
    }
}
