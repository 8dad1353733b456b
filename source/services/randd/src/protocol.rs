// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: randd wire protocol v1 (versioned byte frames; bounded inputs)
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Tests in `source/services/randd/tests/protocol.rs`
//!   - Decode: happy path per opcode, reject malformed/oversized/unknown frames
//!   - Encode: response parse round-trips
//!   - Property tests for panic-freedom on arbitrary input
//!
//! Requests are `[b'R', b'D', VERSION, OP, ...]`; responses echo the opcode
//! with `OP_RESPONSE` set and carry a leading status byte. Read data itself
//! travels out of band through the transport's read-buffer channel, so a
//! READ response only carries the delivered byte count.

use thiserror::Error;

pub const MAGIC0: u8 = b'R';
pub const MAGIC1: u8 = b'D';
pub const VERSION: u8 = 1;

pub const OP_OPEN: u8 = 1;
pub const OP_CLOSE: u8 = 2;
pub const OP_DUP: u8 = 3;
pub const OP_READ: u8 = 4;
pub const OP_WRITE: u8 = 5;
pub const OP_FSTAT: u8 = 6;
pub const OP_STAT: u8 = 7;
pub const OP_LSEEK: u8 = 8;
pub const OP_SELECT: u8 = 9;
pub const OP_UNMOUNT: u8 = 10;
pub const OP_VERSION: u8 = 11;

/// Response flag, or'ed onto the request opcode.
pub const OP_RESPONSE: u8 = 0x80;

pub const STATUS_OK: u8 = 0;
pub const STATUS_NOT_FOUND: u8 = 1;
pub const STATUS_PERMISSION_DENIED: u8 = 2;
pub const STATUS_BAD_DESCRIPTOR: u8 = 3;
pub const STATUS_ALREADY_EXISTS: u8 = 4;
pub const STATUS_WOULD_BLOCK: u8 = 5;
pub const STATUS_INTERRUPTED: u8 = 6;
pub const STATUS_NOT_SEEKABLE: u8 = 7;
pub const STATUS_UNSUPPORTED: u8 = 8;
pub const STATUS_NO_MEMORY: u8 = 9;
pub const STATUS_INVALID_ARGUMENT: u8 = 10;
pub const STATUS_IO: u8 = 11;

/// Minimum frame length: MAGIC0 + MAGIC1 + VERSION + OP.
pub const MIN_FRAME_LEN: usize = 4;

pub const MAX_SELECT_ENTRIES: usize = 32;
pub const MAX_PATH_LEN: usize = 64;

// Access mode occupies the low two oflag bits; the rest are flags.
pub const ACCMODE_MASK: u32 = 0b11;
pub const ACC_READ: u32 = 0;
pub const ACC_WRITE: u32 = 1;
pub const ACC_READ_WRITE: u32 = 2;
pub const OFLAG_NONBLOCK: u32 = 1 << 2;
pub const OFLAG_CREAT: u32 = 1 << 3;
pub const OFLAG_EXCL: u32 = 1 << 4;

/// Select condition bits, both requested and reported.
pub const COND_READ: u8 = 1 << 0;
pub const COND_WRITE: u8 = 1 << 1;
pub const COND_EXCEPT: u8 = 1 << 2;

/// Per-request error taxonomy; every variant maps to a wire status byte and
/// is replied to the originating client, never escalated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RanddError {
    #[error("no such unit or path")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("bad descriptor")]
    BadDescriptor,
    #[error("device node already exists")]
    AlreadyExists,
    #[error("operation would block")]
    WouldBlock,
    #[error("interrupted")]
    Interrupted,
    #[error("not seekable")]
    NotSeekable,
    #[error("operation not supported")]
    Unsupported,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("i/o error")]
    Io,
}

impl RanddError {
    /// Wire status byte for this error.
    pub const fn status(self) -> u8 {
        match self {
            Self::NotFound => STATUS_NOT_FOUND,
            Self::PermissionDenied => STATUS_PERMISSION_DENIED,
            Self::BadDescriptor => STATUS_BAD_DESCRIPTOR,
            Self::AlreadyExists => STATUS_ALREADY_EXISTS,
            Self::WouldBlock => STATUS_WOULD_BLOCK,
            Self::Interrupted => STATUS_INTERRUPTED,
            Self::NotSeekable => STATUS_NOT_SEEKABLE,
            Self::Unsupported => STATUS_UNSUPPORTED,
            Self::OutOfMemory => STATUS_NO_MEMORY,
            Self::InvalidArgument => STATUS_INVALID_ARGUMENT,
            Self::Io => STATUS_IO,
        }
    }
}

/// Decode errors for v1 frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "decode errors must be handled"]
pub enum DecodeError {
    Malformed,
    Unsupported,
    TooLarge,
}

impl DecodeError {
    /// Status byte replied for a frame that failed to decode.
    pub const fn status(self) -> u8 {
        match self {
            Self::Malformed => STATUS_INVALID_ARGUMENT,
            Self::Unsupported => STATUS_UNSUPPORTED,
            Self::TooLarge => STATUS_INVALID_ARGUMENT,
        }
    }
}

/// A decoded v1 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open(OpenRequest),
    Close { fd: u32 },
    Dup { src_client: u64, src_fd: u32, dst_fd: u32 },
    Read { fd: u32, nbytes: u32 },
    Write { fd: u32, nbytes: u32 },
    Fstat { fd: u32 },
    Stat { unit: u8, path: Vec<u8> },
    Lseek { fd: u32, offset: i64, whence: u8 },
    Select(SelectRequest),
    Unmount { unit: u8, uid: u32, path: Vec<u8> },
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub unit: u8,
    pub fd: u32,
    pub oflag: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectMode {
    /// Report readiness only; clears any prior arming for the caller.
    Poll,
    /// Arm the caller for a one-shot wake on unsatisfied conditions.
    Arm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub mode: SelectMode,
    pub token: u64,
    pub entries: Vec<SelectEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectEntry {
    pub fd: u32,
    pub conds: u8,
}

/// Stat payload shared by STAT and FSTAT responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatPayload {
    pub ino: u64,
    pub dev: u64,
    pub rdev: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

const STAT_PAYLOAD_LEN: usize = 8 * 7 + 4 * 4;

fn take_u32(frame: &[u8], off: usize) -> Result<u32, DecodeError> {
    let bytes = frame.get(off..off + 4).ok_or(DecodeError::Malformed)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn take_u64(frame: &[u8], off: usize) -> Result<u64, DecodeError> {
    let bytes = frame.get(off..off + 8).ok_or(DecodeError::Malformed)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(raw))
}

fn take_u8(frame: &[u8], off: usize) -> Result<u8, DecodeError> {
    frame.get(off).copied().ok_or(DecodeError::Malformed)
}

/// Decodes a request frame. Total: no input panics, ever.
pub fn decode_request(frame: &[u8]) -> Result<Request, DecodeError> {
    if frame.len() < MIN_FRAME_LEN || frame[0] != MAGIC0 || frame[1] != MAGIC1 {
        return Err(DecodeError::Malformed);
    }
    if frame[2] != VERSION {
        return Err(DecodeError::Unsupported);
    }
    match frame[3] {
        OP_OPEN => decode_open(frame),
        OP_CLOSE => Ok(Request::Close { fd: decode_fd_only(frame)? }),
        OP_DUP => decode_dup(frame),
        OP_READ => decode_read(frame),
        OP_WRITE => decode_write(frame),
        OP_FSTAT => Ok(Request::Fstat { fd: decode_fd_only(frame)? }),
        OP_STAT => decode_stat(frame),
        OP_LSEEK => decode_lseek(frame),
        OP_SELECT => decode_select(frame),
        OP_UNMOUNT => decode_unmount(frame),
        OP_VERSION => decode_version(frame),
        _ => Err(DecodeError::Unsupported),
    }
}

fn decode_open(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, unit:u8, fd:u32, oflag:u32, mode:u32, uid:u32, gid:u32]
    if frame.len() != 25 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Open(OpenRequest {
        unit: frame[4],
        fd: take_u32(frame, 5)?,
        oflag: take_u32(frame, 9)?,
        mode: take_u32(frame, 13)?,
        uid: take_u32(frame, 17)?,
        gid: take_u32(frame, 21)?,
    }))
}

fn decode_fd_only(frame: &[u8]) -> Result<u32, DecodeError> {
    // [hdr, fd:u32]
    if frame.len() != 8 {
        return Err(DecodeError::Malformed);
    }
    take_u32(frame, 4)
}

fn decode_dup(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, src_client:u64, src_fd:u32, dst_fd:u32]
    if frame.len() != 20 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Dup {
        src_client: take_u64(frame, 4)?,
        src_fd: take_u32(frame, 12)?,
        dst_fd: take_u32(frame, 16)?,
    })
}

fn decode_read(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, fd:u32, nbytes:u32]
    if frame.len() != 12 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Read { fd: take_u32(frame, 4)?, nbytes: take_u32(frame, 8)? })
}

fn decode_write(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, fd:u32, nbytes:u32, data...]; the data is never consumed, the
    // operation is unconditionally unsupported, so trailing bytes are only
    // bounds-checked.
    if frame.len() < 12 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Write { fd: take_u32(frame, 4)?, nbytes: take_u32(frame, 8)? })
}

fn decode_path(frame: &[u8], off: usize) -> Result<Vec<u8>, DecodeError> {
    let len = take_u8(frame, off)? as usize;
    if len > MAX_PATH_LEN {
        return Err(DecodeError::TooLarge);
    }
    let start = off + 1;
    if frame.len() != start + len {
        return Err(DecodeError::Malformed);
    }
    Ok(frame[start..start + len].to_vec())
}

fn decode_stat(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, unit:u8, path_len:u8, path...]
    let unit = take_u8(frame, 4)?;
    Ok(Request::Stat { unit, path: decode_path(frame, 5)? })
}

fn decode_lseek(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, fd:u32, offset:i64, whence:u8]
    if frame.len() != 17 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Lseek {
        fd: take_u32(frame, 4)?,
        offset: take_u64(frame, 8)? as i64,
        whence: frame[16],
    })
}

fn decode_select(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, mode:u8, token:u64, count:u8, (fd:u32, conds:u8)*count]
    let mode = match take_u8(frame, 4)? {
        0 => SelectMode::Poll,
        1 => SelectMode::Arm,
        _ => return Err(DecodeError::Malformed),
    };
    let token = take_u64(frame, 5)?;
    let count = take_u8(frame, 13)? as usize;
    if count > MAX_SELECT_ENTRIES {
        return Err(DecodeError::TooLarge);
    }
    if frame.len() != 14 + count * 5 {
        return Err(DecodeError::Malformed);
    }
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let off = 14 + i * 5;
        entries.push(SelectEntry { fd: take_u32(frame, off)?, conds: take_u8(frame, off + 4)? });
    }
    Ok(Request::Select(SelectRequest { mode, token, entries }))
}

fn decode_unmount(frame: &[u8]) -> Result<Request, DecodeError> {
    // [hdr, unit:u8, uid:u32, path_len:u8, path...]
    let unit = take_u8(frame, 4)?;
    let uid = take_u32(frame, 5)?;
    Ok(Request::Unmount { unit, uid, path: decode_path(frame, 9)? })
}

fn decode_version(frame: &[u8]) -> Result<Request, DecodeError> {
    if frame.len() != MIN_FRAME_LEN {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Version)
}

// ---------------------------------------------------------------------------
// Request encoders (client side; used by the e2e and integration tests)
// ---------------------------------------------------------------------------

fn request_header(op: u8) -> Vec<u8> {
    vec![MAGIC0, MAGIC1, VERSION, op]
}

pub fn encode_open_request(req: &OpenRequest) -> Vec<u8> {
    let mut out = request_header(OP_OPEN);
    out.push(req.unit);
    out.extend_from_slice(&req.fd.to_le_bytes());
    out.extend_from_slice(&req.oflag.to_le_bytes());
    out.extend_from_slice(&req.mode.to_le_bytes());
    out.extend_from_slice(&req.uid.to_le_bytes());
    out.extend_from_slice(&req.gid.to_le_bytes());
    out
}

pub fn encode_close_request(fd: u32) -> Vec<u8> {
    let mut out = request_header(OP_CLOSE);
    out.extend_from_slice(&fd.to_le_bytes());
    out
}

pub fn encode_dup_request(src_client: u64, src_fd: u32, dst_fd: u32) -> Vec<u8> {
    let mut out = request_header(OP_DUP);
    out.extend_from_slice(&src_client.to_le_bytes());
    out.extend_from_slice(&src_fd.to_le_bytes());
    out.extend_from_slice(&dst_fd.to_le_bytes());
    out
}

pub fn encode_read_request(fd: u32, nbytes: u32) -> Vec<u8> {
    let mut out = request_header(OP_READ);
    out.extend_from_slice(&fd.to_le_bytes());
    out.extend_from_slice(&nbytes.to_le_bytes());
    out
}

pub fn encode_write_request(fd: u32, data: &[u8]) -> Vec<u8> {
    let mut out = request_header(OP_WRITE);
    out.extend_from_slice(&fd.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

pub fn encode_fstat_request(fd: u32) -> Vec<u8> {
    let mut out = request_header(OP_FSTAT);
    out.extend_from_slice(&fd.to_le_bytes());
    out
}

pub fn encode_stat_request(unit: u8, path: &[u8]) -> Vec<u8> {
    let mut out = request_header(OP_STAT);
    out.push(unit);
    out.push(path.len() as u8);
    out.extend_from_slice(path);
    out
}

pub fn encode_lseek_request(fd: u32, offset: i64, whence: u8) -> Vec<u8> {
    let mut out = request_header(OP_LSEEK);
    out.extend_from_slice(&fd.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.push(whence);
    out
}

pub fn encode_select_request(mode: SelectMode, token: u64, entries: &[SelectEntry]) -> Vec<u8> {
    let mut out = request_header(OP_SELECT);
    out.push(match mode {
        SelectMode::Poll => 0,
        SelectMode::Arm => 1,
    });
    out.extend_from_slice(&token.to_le_bytes());
    out.push(entries.len() as u8);
    for entry in entries {
        out.extend_from_slice(&entry.fd.to_le_bytes());
        out.push(entry.conds);
    }
    out
}

pub fn encode_unmount_request(unit: u8, uid: u32, path: &[u8]) -> Vec<u8> {
    let mut out = request_header(OP_UNMOUNT);
    out.push(unit);
    out.extend_from_slice(&uid.to_le_bytes());
    out.push(path.len() as u8);
    out.extend_from_slice(path);
    out
}

pub fn encode_version_request() -> Vec<u8> {
    request_header(OP_VERSION)
}

// ---------------------------------------------------------------------------
// Response encoders and parsers
// ---------------------------------------------------------------------------

fn response_header(op: u8, status: u8) -> Vec<u8> {
    vec![MAGIC0, MAGIC1, VERSION, op | OP_RESPONSE, status]
}

/// Status-only response, used by every operation without a payload.
pub fn encode_status_response(op: u8, status: u8) -> Vec<u8> {
    response_header(op, status)
}

pub fn encode_read_response(status: u8, nbytes: u32) -> Vec<u8> {
    let mut out = response_header(OP_READ, status);
    out.extend_from_slice(&nbytes.to_le_bytes());
    out
}

pub fn encode_stat_response(op: u8, status: u8, stat: &StatPayload) -> Vec<u8> {
    let mut out = response_header(op, status);
    out.extend_from_slice(&stat.ino.to_le_bytes());
    out.extend_from_slice(&stat.dev.to_le_bytes());
    out.extend_from_slice(&stat.rdev.to_le_bytes());
    out.extend_from_slice(&stat.mode.to_le_bytes());
    out.extend_from_slice(&stat.nlink.to_le_bytes());
    out.extend_from_slice(&stat.uid.to_le_bytes());
    out.extend_from_slice(&stat.gid.to_le_bytes());
    out.extend_from_slice(&stat.size.to_le_bytes());
    out.extend_from_slice(&stat.atime.to_le_bytes());
    out.extend_from_slice(&stat.mtime.to_le_bytes());
    out.extend_from_slice(&stat.ctime.to_le_bytes());
    out
}

pub fn encode_select_response(status: u8, armed: bool, readies: &[u8]) -> Vec<u8> {
    let mut out = response_header(OP_SELECT, status);
    out.push(u8::from(armed));
    out.push(readies.len() as u8);
    out.extend_from_slice(readies);
    out
}

pub fn encode_version_response(status: u8, name: &str, version: &str) -> Vec<u8> {
    let mut out = response_header(OP_VERSION, status);
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    out.push(version.len() as u8);
    out.extend_from_slice(version.as_bytes());
    out
}

/// Splits a response frame into `(opcode, status, payload)`.
pub fn parse_response(frame: &[u8]) -> Option<(u8, u8, &[u8])> {
    if frame.len() < 5 || frame[0] != MAGIC0 || frame[1] != MAGIC1 || frame[2] != VERSION {
        return None;
    }
    if frame[3] & OP_RESPONSE == 0 {
        return None;
    }
    Some((frame[3] & !OP_RESPONSE, frame[4], &frame[5..]))
}

/// Parses a READ response into `(status, nbytes)`.
pub fn parse_read_response(frame: &[u8]) -> Option<(u8, u32)> {
    let (op, status, payload) = parse_response(frame)?;
    if op != OP_READ {
        return None;
    }
    if payload.is_empty() {
        // Error replies may omit the count.
        return Some((status, 0));
    }
    if payload.len() != 4 {
        return None;
    }
    Some((status, u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]])))
}

/// Parses a STAT or FSTAT response into `(status, stat)`.
pub fn parse_stat_response(frame: &[u8]) -> Option<(u8, StatPayload)> {
    let (op, status, payload) = parse_response(frame)?;
    if op != OP_STAT && op != OP_FSTAT {
        return None;
    }
    if payload.len() != STAT_PAYLOAD_LEN {
        return None;
    }
    let u64_at = |off: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&payload[off..off + 8]);
        u64::from_le_bytes(raw)
    };
    let u32_at = |off: usize| {
        u32::from_le_bytes([payload[off], payload[off + 1], payload[off + 2], payload[off + 3]])
    };
    Some((
        status,
        StatPayload {
            ino: u64_at(0),
            dev: u64_at(8),
            rdev: u64_at(16),
            mode: u32_at(24),
            nlink: u32_at(28),
            uid: u32_at(32),
            gid: u32_at(36),
            size: u64_at(40),
            atime: u64_at(48),
            mtime: u64_at(56),
            ctime: u64_at(64),
        },
    ))
}

/// Parses a SELECT response into `(status, armed, per-entry ready bits)`.
pub fn parse_select_response(frame: &[u8]) -> Option<(u8, bool, Vec<u8>)> {
    let (op, status, payload) = parse_response(frame)?;
    if op != OP_SELECT || payload.len() < 2 {
        return None;
    }
    let armed = payload[0] != 0;
    let count = payload[1] as usize;
    if payload.len() != 2 + count {
        return None;
    }
    Some((status, armed, payload[2..].to_vec()))
}

/// Parses a VERSION response into `(status, name, version)`.
pub fn parse_version_response(frame: &[u8]) -> Option<(u8, String, String)> {
    let (op, status, payload) = parse_response(frame)?;
    if op != OP_VERSION || payload.is_empty() {
        return None;
    }
    let name_len = payload[0] as usize;
    let name = payload.get(1..1 + name_len)?;
    let rest = payload.get(1 + name_len..)?;
    let ver_len = *rest.first()? as usize;
    let version = rest.get(1..1 + ver_len)?;
    if rest.len() != 1 + ver_len {
        return None;
    }
    Some((
        status,
        String::from_utf8_lossy(name).into_owned(),
        String::from_utf8_lossy(version).into_owned(),
    ))
}
