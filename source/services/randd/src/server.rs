// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: single-threaded dispatcher, transport seam and interrupt bridge
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional (host backend)
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Integration tests in `source/services/randd/tests/` and
//!   `tests/randd_e2e` drive the dispatcher through `LoopbackTransport`.
//!
//! One event per loop iteration: a client frame, a coalesced interrupt, or a
//! client-gone notice. No operation blocks inside the loop — a read that
//! cannot complete is parked in the blocked-read queue and answered later,
//! so interrupt events stay responsive while reads are pending. All four
//! shared collections live in [`Randd`] and are mutated only here.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use thiserror::Error;

use crate::device::{DeviceTable, UNIT_COUNT};
use crate::handle::HandleTable;
use crate::notify::NotifyRegistry;
use crate::pool::EntropySource;
use crate::protocol::{
    self, OpenRequest, RanddError, Request, SelectMode, SelectRequest, COND_READ, COND_WRITE,
    OFLAG_CREAT, OFLAG_EXCL, OFLAG_NONBLOCK, OP_CLOSE, OP_DUP, OP_FSTAT, OP_OPEN, OP_STAT,
    OP_UNMOUNT, STATUS_INTERRUPTED, STATUS_OK,
};
use crate::queue::{BlockedReads, ReadRequest};
use crate::{ClientId, Fd, MAX_READ_BYTES, TRANSFER_CHUNK};

/// Result alias used by the service.
pub type Result<T> = core::result::Result<T, ServerError>;

/// Fatal (setup or transport) failures; per-request errors become reply
/// status bytes and never surface here.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transport level failure.
    #[error("transport error: {0}")]
    Transport(TransportError),
    /// Startup wiring failed before the loop began.
    #[error("setup error: {0}")]
    Setup(String),
}

impl From<TransportError> for ServerError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Transport level failures surfaced by [`Transport`] implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection closed by the peer.
    #[error("transport closed")]
    Closed,
    /// I/O failure.
    #[error("io error: {0}")]
    Io(String),
    /// Any other failure category.
    #[error("transport error: {0}")]
    Other(String),
}

/// One occurrence delivered to the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A client request frame, stamped with the client's scheduling
    /// priority at send time.
    Frame { client: ClientId, priority: u8, frame: Vec<u8> },
    /// One logical interrupt; bursts are coalesced at the transport edge.
    Interrupt,
    /// The client died or aborted its in-flight call with a signal.
    ClientGone(ClientId),
}

/// Message-transport seam. The dispatcher needs exactly four capabilities:
/// receive the next event, reply to a previously received client, push read
/// data into a client's buffer (possibly short), and deliver a select wake.
pub trait Transport {
    /// Error surfaced by the transport implementation.
    type Error: Into<TransportError>;

    /// Next event, or `None` once the transport is closed.
    fn recv(&mut self) -> core::result::Result<Option<Event>, Self::Error>;

    /// Delivers a response frame to `client`.
    fn reply(&mut self, client: ClientId, frame: &[u8]) -> core::result::Result<(), Self::Error>;

    /// Writes read data into `client`'s receive buffer at `offset`,
    /// returning how many bytes the channel accepted (may be short).
    fn write_read_data(
        &mut self,
        client: ClientId,
        offset: usize,
        data: &[u8],
    ) -> core::result::Result<usize, Self::Error>;

    /// Signals an armed waiter's wake token.
    fn wake(&mut self, client: ClientId, token: u64) -> core::result::Result<(), Self::Error>;
}

/// Loop continuation decision after one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// No units bound and no open files remain.
    Exit,
}

/// Startup parameters captured from the process environment.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Owner uid stamped on both device nodes.
    pub uid: u32,
    /// Owner gid stamped on both device nodes.
    pub gid: u32,
    /// Interrupt source used for entropy.
    pub irq: u8,
    /// Node identity folded into the synthetic dev/rdev numbers.
    pub node: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self { uid: 0, gid: 0, irq: 1, node: 1 }
    }
}

enum Pump {
    Keep,
    Complete(u8),
}

/// The driver state: every shared collection, owned by the dispatch loop.
pub struct Randd<P: EntropySource> {
    devices: DeviceTable,
    handles: HandleTable,
    queue: BlockedReads,
    notify: NotifyRegistry,
    pool: P,
    bound: [bool; UNIT_COUNT],
    irq: u8,
}

impl<P: EntropySource> Randd<P> {
    /// Initializes the pool and binds both device units. Failures here are
    /// fatal; nothing else in the server is.
    pub fn new(mut pool: P, config: Config) -> Result<Self> {
        pool.init();
        if !pool.init_irq(config.irq) {
            return Err(ServerError::Setup(format!(
                "interrupt source {} unavailable",
                config.irq
            )));
        }
        let now = unix_now();
        Ok(Self {
            devices: DeviceTable::new(config.uid, config.gid, config.node, now),
            handles: HandleTable::new(),
            queue: BlockedReads::new(),
            notify: NotifyRegistry::new(),
            pool,
            bound: [true; UNIT_COUNT],
            irq: config.irq,
        })
    }

    /// Runs the dispatch loop until the transport closes or the last unit
    /// is unmounted with no files left open.
    pub fn run<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        info!("randd: ready; units random + urandom bound");
        loop {
            let event = match transport.recv() {
                Ok(Some(event)) => event,
                Ok(None) => return Ok(()),
                Err(err) => return Err(ServerError::Transport(err.into())),
            };
            if self.handle_event(transport, event)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Services exactly one event. Public so tests can single-step the loop.
    pub fn handle_event<T: Transport>(&mut self, transport: &mut T, event: Event) -> Result<Flow> {
        match event {
            Event::Frame { client, priority, frame } => {
                self.service(transport, client, priority, &frame);
            }
            Event::Interrupt => self.on_interrupt(transport),
            Event::ClientGone(client) => self.cancel_client(transport, client),
        }
        if self.should_exit() {
            info!("randd: no units bound and no open files; exiting");
            return Ok(Flow::Exit);
        }
        Ok(Flow::Continue)
    }

    // Interrupt bridge. Order matters: the wake and the drain must both
    // observe the post-replenishment pool.
    fn on_interrupt<T: Transport>(&mut self, transport: &mut T) {
        self.pool.add_interrupt_entropy(self.irq);
        for waiter in self.notify.drain_armed() {
            if let Err(err) = transport.wake(waiter.client, waiter.token) {
                let err: TransportError = err.into();
                debug!("randd: wake of {:?} failed: {err}; dropped", waiter.client);
            }
        }
        self.drain_queue(transport);
    }

    fn service<T: Transport>(
        &mut self,
        transport: &mut T,
        client: ClientId,
        priority: u8,
        frame: &[u8],
    ) {
        let op = frame.get(3).copied().unwrap_or(0);
        let request = match protocol::decode_request(frame) {
            Ok(request) => request,
            Err(err) => {
                warn!("randd: undecodable frame from {client:?} (op {op:#x}): {err:?}");
                let reply = protocol::encode_status_response(op, err.status());
                self.send_reply(transport, client, &reply);
                return;
            }
        };
        let outcome = match request {
            Request::Open(open) => self.op_open(client, open),
            Request::Close { fd } => self.op_close(client, fd),
            Request::Dup { src_client, src_fd, dst_fd } => {
                self.op_dup(client, src_client, src_fd, dst_fd)
            }
            Request::Read { fd, nbytes } => self.op_read(transport, client, priority, fd, nbytes),
            Request::Write { .. } => Err(RanddError::Unsupported),
            Request::Fstat { fd } => self.op_fstat(client, fd),
            Request::Stat { unit, path } => self.op_stat(unit, &path),
            Request::Lseek { .. } => Err(RanddError::NotSeekable),
            Request::Select(select) => self.op_select(client, select),
            Request::Unmount { unit, uid, path } => self.op_unmount(unit, uid, &path),
            Request::Version => self.op_version(),
        };
        match outcome {
            Ok(Some(reply)) => self.send_reply(transport, client, &reply),
            // Deferred: the blocked-read queue answers later.
            Ok(None) => {}
            Err(err) => {
                debug!("randd: request from {client:?} (op {op}) failed: {err}");
                let reply = protocol::encode_status_response(op, err.status());
                self.send_reply(transport, client, &reply);
            }
        }
    }

    fn op_open(
        &mut self,
        client: ClientId,
        req: OpenRequest,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        let device = self.devices.get(req.unit).ok_or(RanddError::NotFound)?;
        // Device nodes cannot be created, so exclusive creation can only
        // ever collide with the existing node.
        if req.oflag & OFLAG_CREAT != 0 && req.oflag & OFLAG_EXCL != 0 {
            return Err(RanddError::AlreadyExists);
        }
        device.check_access(req.uid, req.gid, req.oflag)?;
        self.handles.open(client, Fd(req.fd), req.unit, req.oflag)?;
        debug!("randd: {client:?} opened unit {} as fd {}", req.unit, req.fd);
        Ok(Some(protocol::encode_status_response(OP_OPEN, STATUS_OK)))
    }

    fn op_close(
        &mut self,
        client: ClientId,
        fd: u32,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        self.handles.close(client, Fd(fd))?;
        Ok(Some(protocol::encode_status_response(OP_CLOSE, STATUS_OK)))
    }

    fn op_dup(
        &mut self,
        client: ClientId,
        src_client: u64,
        src_fd: u32,
        dst_fd: u32,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        self.handles.dup(ClientId(src_client), Fd(src_fd), client, Fd(dst_fd))?;
        Ok(Some(protocol::encode_status_response(OP_DUP, STATUS_OK)))
    }

    fn op_read<T: Transport>(
        &mut self,
        transport: &mut T,
        client: ClientId,
        priority: u8,
        fd: u32,
        nbytes: u32,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        let (hid, unit, oflag) = {
            let (hid, handle) =
                self.handles.lookup(client, Fd(fd)).ok_or(RanddError::BadDescriptor)?;
            (hid, handle.unit, handle.oflag)
        };
        let requested = nbytes.min(MAX_READ_BYTES) as usize;
        if requested == 0 {
            return Ok(Some(protocol::encode_read_response(STATUS_OK, 0)));
        }
        let unlimited = self.devices.get(unit).ok_or(RanddError::NotFound)?.unlimited;

        if !unlimited && self.pool.available() == 0 {
            if oflag & OFLAG_NONBLOCK != 0 {
                return Err(RanddError::WouldBlock);
            }
            self.queue.enqueue(ReadRequest {
                client,
                handle: hid,
                requested,
                delivered: 0,
                priority,
            })?;
            // The queue entry pins the handle until completion.
            self.handles.retain(hid);
            debug!(
                "randd: deferred read of {requested} bytes for {client:?} (prio {priority}, {} queued)",
                self.queue.len()
            );
            // Replay immediately in case entropy arrived this iteration.
            self.drain_queue(transport);
            return Ok(None);
        }

        let mut buf = vec![0u8; TRANSFER_CHUNK];
        let mut delivered = 0usize;
        loop {
            let budget = if unlimited { requested - delivered } else { self.pool.available() };
            let want = (requested - delivered).min(TRANSFER_CHUNK).min(budget);
            if want == 0 {
                break;
            }
            self.pool.extract(&mut buf[..want]);
            match transport.write_read_data(client, delivered, &buf[..want]) {
                Err(err) => {
                    let err: TransportError = err.into();
                    if delivered == 0 {
                        debug!("randd: read transfer to {client:?} failed: {err}");
                        return Err(RanddError::Io);
                    }
                    // Data already flowed; report the short read as success.
                    break;
                }
                Ok(accepted) => {
                    delivered += accepted;
                    if accepted < want {
                        break;
                    }
                }
            }
        }
        if delivered > 0 {
            if let Some(device) = self.devices.get_mut(unit) {
                device.touch_atime(unix_now());
            }
        }
        Ok(Some(protocol::encode_read_response(STATUS_OK, delivered as u32)))
    }

    fn op_fstat(
        &mut self,
        client: ClientId,
        fd: u32,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        let unit = {
            let (_, handle) =
                self.handles.lookup(client, Fd(fd)).ok_or(RanddError::BadDescriptor)?;
            handle.unit
        };
        self.stat_reply(unit, OP_FSTAT)
    }

    fn op_stat(
        &mut self,
        unit: u8,
        path: &[u8],
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        // The devices are leaves; any residual path component is a caller
        // error.
        if !path.is_empty() {
            return Err(RanddError::InvalidArgument);
        }
        self.stat_reply(unit, OP_STAT)
    }

    fn stat_reply(
        &mut self,
        unit: u8,
        op: u8,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        let available = self.pool.available();
        let device = self.devices.get(unit).ok_or(RanddError::NotFound)?;
        let size = if device.unlimited { TRANSFER_CHUNK as u64 } else { available as u64 };
        Ok(Some(protocol::encode_stat_response(op, STATUS_OK, &device.stat(size))))
    }

    fn op_select(
        &mut self,
        client: ClientId,
        req: SelectRequest,
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        let available = self.pool.available();
        let mut readies = Vec::with_capacity(req.entries.len());
        let mut needs_arm = false;
        for entry in &req.entries {
            let unit = {
                let (_, handle) = self
                    .handles
                    .lookup(client, Fd(entry.fd))
                    .ok_or(RanddError::BadDescriptor)?;
                handle.unit
            };
            let unlimited = self.devices.get(unit).ok_or(RanddError::NotFound)?.unlimited;
            let read_ready = unlimited || available > 0;
            // Writes never block (they fail fast instead) and exceptional
            // conditions are never asserted.
            let mut satisfied = entry.conds & COND_WRITE;
            if read_ready {
                satisfied |= entry.conds & COND_READ;
            }
            readies.push(satisfied);
            if entry.conds & COND_READ != 0 && !read_ready {
                needs_arm = true;
            }
        }
        let armed = match req.mode {
            SelectMode::Poll => {
                self.notify.disarm(client);
                false
            }
            SelectMode::Arm => {
                if needs_arm {
                    self.notify.arm(client, req.token);
                }
                needs_arm
            }
        };
        Ok(Some(protocol::encode_select_response(STATUS_OK, armed, &readies)))
    }

    fn op_unmount(
        &mut self,
        unit: u8,
        uid: u32,
        path: &[u8],
    ) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        if !path.is_empty() {
            return Err(RanddError::InvalidArgument);
        }
        let owner = {
            let device = self.devices.get(unit).ok_or(RanddError::NotFound)?;
            device.uid
        };
        if !self.bound[usize::from(unit)] {
            return Err(RanddError::NotFound);
        }
        if uid != 0 && uid != owner {
            return Err(RanddError::PermissionDenied);
        }
        self.bound[usize::from(unit)] = false;
        if let Some(device) = self.devices.get(unit) {
            info!("randd: detached unit {} ({})", unit, device.name);
        }
        Ok(Some(protocol::encode_status_response(OP_UNMOUNT, STATUS_OK)))
    }

    fn op_version(&self) -> core::result::Result<Option<Vec<u8>>, RanddError> {
        Ok(Some(protocol::encode_version_response(
            STATUS_OK,
            "randd",
            env!("CARGO_PKG_VERSION"),
        )))
    }

    /// Replays the blocked-read queue against the current pool, high
    /// priority first. Pipe semantics: an entry completes as soon as it has
    /// any bytes and either reached its total, or the pool or channel could
    /// not keep up.
    fn drain_queue<T: Transport>(&mut self, transport: &mut T) {
        let mut buf = vec![0u8; TRANSFER_CHUNK];
        let mut index = 0;
        while index < self.queue.len() {
            match self.pump_entry(transport, index, &mut buf) {
                Pump::Keep => index += 1,
                Pump::Complete(status) => {
                    if let Some(entry) = self.queue.remove(index) {
                        let unit = self.handles.get(entry.handle).map(|h| h.unit);
                        self.handles.release(entry.handle);
                        if entry.delivered > 0 {
                            if let Some(device) = unit.and_then(|u| self.devices.get_mut(u)) {
                                device.touch_atime(unix_now());
                            }
                        }
                        debug!(
                            "randd: completed deferred read for {:?}: {} of {} bytes (status {status})",
                            entry.client, entry.delivered, entry.requested
                        );
                        let reply =
                            protocol::encode_read_response(status, entry.delivered as u32);
                        self.send_reply(transport, entry.client, &reply);
                    }
                }
            }
        }
    }

    // Moves bytes for the queue entry at `index` until it completes or the
    // pool runs dry. Returns what to do with the entry.
    fn pump_entry<T: Transport>(
        &mut self,
        transport: &mut T,
        index: usize,
        buf: &mut [u8],
    ) -> Pump {
        loop {
            let (client, requested, delivered) = match self.queue.get_mut(index) {
                Some(entry) => (entry.client, entry.requested, entry.delivered),
                None => return Pump::Keep,
            };
            let remaining = requested - delivered;
            let want = remaining.min(TRANSFER_CHUNK).min(self.pool.available());
            if want == 0 {
                return if delivered > 0 { Pump::Complete(STATUS_OK) } else { Pump::Keep };
            }
            self.pool.extract(&mut buf[..want]);
            match transport.write_read_data(client, delivered, &buf[..want]) {
                Err(err) => {
                    let err: TransportError = err.into();
                    debug!("randd: deferred transfer to {client:?} failed: {err}");
                    // A failure before any data is an aborted read; after
                    // data it is an ordinary short read.
                    return if delivered == 0 {
                        Pump::Complete(protocol::STATUS_IO)
                    } else {
                        Pump::Complete(STATUS_OK)
                    };
                }
                Ok(accepted) => {
                    if let Some(entry) = self.queue.get_mut(index) {
                        entry.delivered += accepted;
                    }
                    if delivered + accepted == requested || accepted < want {
                        return Pump::Complete(STATUS_OK);
                    }
                }
            }
        }
    }

    /// Client death or a client-side signal: cancel its zero-progress
    /// queued reads with `Interrupted`. Entries with progress are left for
    /// the drain path, which completes them as short reads.
    fn cancel_client<T: Transport>(&mut self, transport: &mut T, client: ClientId) {
        for entry in self.queue.cancel_client(client) {
            self.handles.release(entry.handle);
            debug!("randd: cancelled deferred read for {client:?}");
            let reply = protocol::encode_read_response(STATUS_INTERRUPTED, 0);
            if let Err(err) = transport.reply(client, &reply) {
                let err: TransportError = err.into();
                debug!("randd: interrupt reply to {client:?} failed: {err}; dropped");
            }
        }
    }

    fn send_reply<T: Transport>(&mut self, transport: &mut T, client: ClientId, frame: &[u8]) {
        if let Err(err) = transport.reply(client, frame) {
            let err: TransportError = err.into();
            debug!("randd: reply to {client:?} failed: {err}; dropped");
        }
    }

    fn should_exit(&self) -> bool {
        self.bound.iter().all(|bound| !bound) && self.handles.is_empty()
    }

    // Read-only probes for tests and introspection.

    pub fn blocked_reads(&self) -> usize {
        self.queue.len()
    }

    pub fn armed_waiters(&self) -> usize {
        self.notify.len()
    }

    pub fn is_bound(&self, unit: u8) -> bool {
        self.bound.get(usize::from(unit)).copied().unwrap_or(false)
    }

    pub fn open_descriptors(&self) -> usize {
        self.handles.open_descriptors()
    }

    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Loopback transport for host testing
// ---------------------------------------------------------------------------

/// Deterministic in-process transport: tests script the event sequence and
/// inspect recorded replies, read buffers and wakes. Back-to-back interrupt
/// events are coalesced the way a kernel pulse channel folds overruns.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    events: VecDeque<Event>,
    replies: Vec<(ClientId, Vec<u8>)>,
    read_data: HashMap<ClientId, Vec<u8>>,
    wakes: Vec<(ClientId, u64)>,
    transfer_caps: HashMap<ClientId, usize>,
    failing: HashSet<ClientId>,
    failing_transfers: HashSet<ClientId>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request frame from `client` at `priority`.
    pub fn push_frame(&mut self, client: ClientId, priority: u8, frame: Vec<u8>) {
        self.events.push_back(Event::Frame { client, priority, frame });
    }

    /// Queues one interrupt event.
    pub fn push_interrupt(&mut self) {
        self.events.push_back(Event::Interrupt);
    }

    /// Queues a client-gone notice.
    pub fn push_client_gone(&mut self, client: ClientId) {
        self.events.push_back(Event::ClientGone(client));
    }

    /// Caps how many bytes one `write_read_data` call will accept for
    /// `client`, simulating a channel that cannot keep up.
    pub fn set_transfer_cap(&mut self, client: ClientId, cap: usize) {
        self.transfer_caps.insert(client, cap);
    }

    /// Makes every delivery to `client` fail, simulating a vanished peer.
    pub fn fail_client(&mut self, client: ClientId) {
        self.failing.insert(client);
    }

    /// Makes only read-data transfers to `client` fail, while replies still
    /// go through; lets tests observe the error status.
    pub fn fail_transfers(&mut self, client: ClientId) {
        self.failing_transfers.insert(client);
    }

    /// Drains recorded response frames for `client`, oldest first.
    pub fn take_replies(&mut self, client: ClientId) -> Vec<Vec<u8>> {
        let mut taken = Vec::new();
        self.replies.retain(|(to, frame)| {
            if *to == client {
                taken.push(frame.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// Bytes accumulated in `client`'s read buffer.
    pub fn read_data(&self, client: ClientId) -> &[u8] {
        self.read_data.get(&client).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drains recorded `(client, token)` wake deliveries.
    pub fn take_wakes(&mut self) -> Vec<(ClientId, u64)> {
        std::mem::take(&mut self.wakes)
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl Transport for LoopbackTransport {
    type Error = TransportError;

    fn recv(&mut self) -> core::result::Result<Option<Event>, Self::Error> {
        let event = self.events.pop_front();
        if matches!(event, Some(Event::Interrupt)) {
            // Coalesce an interrupt burst into one logical event.
            while matches!(self.events.front(), Some(Event::Interrupt)) {
                self.events.pop_front();
            }
        }
        Ok(event)
    }

    fn reply(&mut self, client: ClientId, frame: &[u8]) -> core::result::Result<(), Self::Error> {
        if self.failing.contains(&client) {
            return Err(TransportError::Closed);
        }
        self.replies.push((client, frame.to_vec()));
        Ok(())
    }

    fn write_read_data(
        &mut self,
        client: ClientId,
        offset: usize,
        data: &[u8],
    ) -> core::result::Result<usize, Self::Error> {
        if self.failing.contains(&client) || self.failing_transfers.contains(&client) {
            return Err(TransportError::Closed);
        }
        let accepted =
            data.len().min(self.transfer_caps.get(&client).copied().unwrap_or(usize::MAX));
        // `offset` addresses the client's per-call receive buffer; the
        // recorder just appends across calls.
        let _ = offset;
        let buffer = self.read_data.entry(client).or_default();
        buffer.extend_from_slice(&data[..accepted]);
        Ok(accepted)
    }

    fn wake(&mut self, client: ClientId, token: u64) -> core::result::Result<(), Self::Error> {
        if self.failing.contains(&client) {
            return Err(TransportError::Closed);
        }
        self.wakes.push((client, token));
        Ok(())
    }
}
