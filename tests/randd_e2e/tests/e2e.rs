// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: End-to-end randd lifecycle tests over the loopback transport
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Scripted whole-session runs with the real interrupt pool:
//!   deferred reads, select wakes and unmount-driven shutdown

use randd::device::{UNIT_RANDOM, UNIT_URANDOM};
use randd::pool::{InterruptPool, CREDIT_PER_INTERRUPT};
use randd::protocol::{
    encode_close_request, encode_open_request, encode_read_request, encode_select_request,
    encode_unmount_request, encode_version_request, parse_read_response, parse_response,
    parse_version_response, ACC_READ, COND_READ, OpenRequest, SelectEntry, SelectMode, STATUS_OK,
};
use randd::server::{Config, LoopbackTransport, Randd};
use randd::ClientId;

const ALICE: ClientId = ClientId(1);
const BOB: ClientId = ClientId(2);

fn open_frame(unit: u8, fd: u32) -> Vec<u8> {
    encode_open_request(&OpenRequest { unit, fd, oflag: ACC_READ, mode: 0, uid: 0, gid: 0 })
}

fn new_server() -> Randd<InterruptPool> {
    Randd::new(InterruptPool::new(), Config::default()).expect("server setup")
}

#[test]
fn full_session_with_deferred_read_and_shutdown() {
    let mut server = new_server();
    let mut t = LoopbackTransport::new();

    // Alice blocks on random; Bob reads urandom immediately. One interrupt
    // credits 16 bytes, so Alice's 24-byte read completes short.
    t.push_frame(ALICE, 10, open_frame(UNIT_RANDOM, 3));
    t.push_frame(ALICE, 10, encode_read_request(3, 24));
    t.push_frame(BOB, 10, open_frame(UNIT_URANDOM, 4));
    t.push_frame(BOB, 10, encode_read_request(4, 16));
    t.push_interrupt();
    t.push_frame(ALICE, 10, encode_close_request(3));
    t.push_frame(BOB, 10, encode_close_request(4));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_RANDOM, 0, b""));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_URANDOM, 0, b""));

    server.run(&mut t).expect("run");
    assert_eq!(t.pending_events(), 0, "the whole script must be consumed");

    let alice_replies = t.take_replies(ALICE);
    // open, read, close, unmount, unmount
    assert_eq!(alice_replies.len(), 5);
    let (status, nbytes) = parse_read_response(&alice_replies[1]).expect("read reply");
    assert_eq!((status, nbytes), (STATUS_OK, CREDIT_PER_INTERRUPT as u32));
    assert_eq!(t.read_data(ALICE).len(), CREDIT_PER_INTERRUPT);

    let bob_replies = t.take_replies(BOB);
    assert_eq!(bob_replies.len(), 3);
    let (status, nbytes) = parse_read_response(&bob_replies[1]).expect("read reply");
    assert_eq!((status, nbytes), (STATUS_OK, 16));
    assert_eq!(t.read_data(BOB).len(), 16);

    for reply in alice_replies.iter().chain(&bob_replies) {
        let (_, status, _) = parse_response(reply).expect("response frame");
        assert_eq!(status, STATUS_OK);
    }
}

#[test]
fn select_wake_fires_before_the_session_ends() {
    let mut server = new_server();
    let mut t = LoopbackTransport::new();

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(ALICE, 10, open_frame(UNIT_RANDOM, 3));
    t.push_frame(ALICE, 10, encode_select_request(SelectMode::Arm, 0xbeef, &entries));
    t.push_interrupt();
    t.push_frame(ALICE, 10, encode_close_request(3));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_RANDOM, 0, b""));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_URANDOM, 0, b""));

    server.run(&mut t).expect("run");

    assert_eq!(t.take_wakes(), [(ALICE, 0xbeef)]);
    assert_eq!(t.pending_events(), 0);
}

#[test]
fn shutdown_happens_exactly_at_the_last_release() {
    let mut server = new_server();
    let mut t = LoopbackTransport::new();

    t.push_frame(ALICE, 10, open_frame(UNIT_URANDOM, 3));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_RANDOM, 0, b""));
    t.push_frame(ALICE, 10, encode_unmount_request(UNIT_URANDOM, 0, b""));
    t.push_frame(ALICE, 10, encode_close_request(3));
    // Anything after the close must never be serviced.
    t.push_frame(ALICE, 10, encode_version_request());

    server.run(&mut t).expect("run");

    assert_eq!(t.pending_events(), 1, "the loop must stop at the exit event");
    let replies = t.take_replies(ALICE);
    assert_eq!(replies.len(), 4);
    assert!(replies.iter().all(|r| parse_version_response(r).is_none()));
}
