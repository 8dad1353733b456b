// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures: a scripted entropy source with settable credit and
//! helpers to step the dispatcher one event at a time.

#![allow(dead_code)]

use randd::pool::EntropySource;
use randd::protocol::{self, OpenRequest};
use randd::server::{Config, Flow, LoopbackTransport, Randd, Transport};
use randd::ClientId;

/// Deterministic pool: `credited` is set by tests, every interrupt adds
/// `credit_per_interrupt`, and extraction emits a counting byte pattern.
pub struct ScriptedPool {
    pub credited: usize,
    pub credit_per_interrupt: usize,
    pub interrupts_seen: usize,
    counter: u8,
}

impl ScriptedPool {
    pub fn with_credit(credited: usize) -> Self {
        Self { credited, credit_per_interrupt: 16, interrupts_seen: 0, counter: 0 }
    }
}

impl EntropySource for ScriptedPool {
    fn init(&mut self) {}

    fn init_irq(&mut self, _irq: u8) -> bool {
        true
    }

    fn add_interrupt_entropy(&mut self, _irq: u8) {
        self.interrupts_seen += 1;
        self.credited += self.credit_per_interrupt;
    }

    fn available(&self) -> usize {
        self.credited
    }

    fn extract(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.counter;
            self.counter = self.counter.wrapping_add(1);
        }
        self.credited = self.credited.saturating_sub(buf.len());
    }
}

pub fn new_server(credit: usize) -> Randd<ScriptedPool> {
    Randd::new(ScriptedPool::with_credit(credit), Config::default()).expect("server setup")
}

/// Delivers exactly one queued event to the server.
pub fn step(server: &mut Randd<ScriptedPool>, transport: &mut LoopbackTransport) -> Flow {
    let event = transport.recv().expect("recv").expect("an event must be queued");
    server.handle_event(transport, event).expect("handle_event")
}

/// Delivers every queued event.
pub fn drain(server: &mut Randd<ScriptedPool>, transport: &mut LoopbackTransport) {
    while transport.pending_events() > 0 {
        step(server, transport);
    }
}

pub fn open_frame(unit: u8, fd: u32, oflag: u32, uid: u32, gid: u32) -> Vec<u8> {
    protocol::encode_open_request(&OpenRequest { unit, fd, oflag, mode: 0, uid, gid })
}

/// Opens `unit` as `fd` for `client` with root credentials and asserts
/// success.
pub fn open_ok(
    server: &mut Randd<ScriptedPool>,
    transport: &mut LoopbackTransport,
    client: ClientId,
    unit: u8,
    fd: u32,
    oflag: u32,
) {
    transport.push_frame(client, 10, open_frame(unit, fd, oflag, 0, 0));
    step(server, transport);
    let status = single_status(transport, client);
    assert_eq!(status, protocol::STATUS_OK, "open of unit {unit} failed");
}

/// Takes the single pending reply for `client` and returns its status byte.
pub fn single_status(transport: &mut LoopbackTransport, client: ClientId) -> u8 {
    let replies = transport.take_replies(client);
    assert_eq!(replies.len(), 1, "expected exactly one reply");
    let (_, status, _) = protocol::parse_response(&replies[0]).expect("response frame");
    status
}

/// Takes the single pending READ reply for `client` as `(status, nbytes)`.
pub fn single_read_reply(transport: &mut LoopbackTransport, client: ClientId) -> (u8, u32) {
    let replies = transport.take_replies(client);
    assert_eq!(replies.len(), 1, "expected exactly one read reply");
    protocol::parse_read_response(&replies[0]).expect("read response frame")
}
