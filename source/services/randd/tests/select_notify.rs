// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host tests for randd select readiness and one-shot arming
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Poll vs arm, one-shot wake delivery, re-arm and disarm,
//!   per-condition readiness

mod common;

use common::{new_server, open_ok, step};

use randd::device::{UNIT_RANDOM, UNIT_URANDOM};
use randd::protocol::{
    encode_read_request, encode_select_request, parse_response, parse_select_response, ACC_READ,
    COND_EXCEPT, COND_READ, COND_WRITE, SelectEntry, SelectMode, STATUS_BAD_DESCRIPTOR, STATUS_OK,
};
use randd::server::LoopbackTransport;
use randd::ClientId;

const C1: ClientId = ClientId(1);
const C2: ClientId = ClientId(2);

fn select_reply(t: &mut LoopbackTransport, client: ClientId) -> (u8, bool, Vec<u8>) {
    let replies = t.take_replies(client);
    assert_eq!(replies.len(), 1, "expected exactly one select reply");
    parse_select_response(&replies[0]).expect("select response frame")
}

#[test]
fn urandom_is_always_read_ready() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_URANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 7, &entries));
    step(&mut server, &mut t);

    let (status, armed, readies) = select_reply(&mut t, C1);
    assert_eq!(status, STATUS_OK);
    assert!(!armed, "a satisfied select must not arm");
    assert_eq!(readies, [COND_READ]);
    assert_eq!(server.armed_waiters(), 0);
}

#[test]
fn poll_reports_unready_without_arming() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Poll, 7, &entries));
    step(&mut server, &mut t);

    let (status, armed, readies) = select_reply(&mut t, C1);
    assert_eq!(status, STATUS_OK);
    assert!(!armed);
    assert_eq!(readies, [0]);
    assert_eq!(server.armed_waiters(), 0);
}

#[test]
fn armed_waiter_is_woken_exactly_once() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 0xabc, &entries));
    step(&mut server, &mut t);
    let (_, armed, _) = select_reply(&mut t, C1);
    assert!(armed);
    assert_eq!(server.armed_waiters(), 1);

    t.push_interrupt();
    step(&mut server, &mut t);
    assert_eq!(t.take_wakes(), [(C1, 0xabc)]);
    assert_eq!(server.armed_waiters(), 0);

    // One-shot: a second interrupt wakes nobody.
    t.push_interrupt();
    step(&mut server, &mut t);
    assert!(t.take_wakes().is_empty());
}

#[test]
fn rearming_replaces_the_token() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 1, &entries));
    step(&mut server, &mut t);
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 2, &entries));
    step(&mut server, &mut t);
    t.take_replies(C1);
    assert_eq!(server.armed_waiters(), 1);

    t.push_interrupt();
    step(&mut server, &mut t);
    assert_eq!(t.take_wakes(), [(C1, 2)]);
}

#[test]
fn poll_clears_a_previous_arming() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 1, &entries));
    step(&mut server, &mut t);
    t.push_frame(C1, 10, encode_select_request(SelectMode::Poll, 0, &entries));
    step(&mut server, &mut t);
    t.take_replies(C1);

    assert_eq!(server.armed_waiters(), 0);
    t.push_interrupt();
    step(&mut server, &mut t);
    assert!(t.take_wakes().is_empty());
}

#[test]
fn write_condition_is_always_satisfied() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_WRITE }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 0, &entries));
    step(&mut server, &mut t);

    let (status, armed, readies) = select_reply(&mut t, C1);
    assert_eq!(status, STATUS_OK);
    assert!(!armed);
    assert_eq!(readies, [COND_WRITE]);
}

#[test]
fn except_condition_never_fires_and_never_arms() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 3, conds: COND_EXCEPT }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Arm, 0, &entries));
    step(&mut server, &mut t);

    let (status, armed, readies) = select_reply(&mut t, C1);
    assert_eq!(status, STATUS_OK);
    assert!(!armed);
    assert_eq!(readies, [0]);
    assert_eq!(server.armed_waiters(), 0);
}

#[test]
fn select_on_unknown_descriptor_fails() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);

    let entries = [SelectEntry { fd: 99, conds: COND_READ }];
    t.push_frame(C1, 10, encode_select_request(SelectMode::Poll, 0, &entries));
    step(&mut server, &mut t);

    let replies = t.take_replies(C1);
    let (_, status, _) = parse_response(&replies[0]).expect("response frame");
    assert_eq!(status, STATUS_BAD_DESCRIPTOR);
}

#[test]
fn interrupt_wakes_waiter_and_serves_blocked_read_together() {
    let mut server = new_server(0);
    let mut t = LoopbackTransport::new();
    open_ok(&mut server, &mut t, C1, UNIT_RANDOM, 3, ACC_READ);
    open_ok(&mut server, &mut t, C2, UNIT_RANDOM, 4, ACC_READ);

    t.push_frame(C1, 10, encode_read_request(3, 8));
    step(&mut server, &mut t);

    let entries = [SelectEntry { fd: 4, conds: COND_READ }];
    t.push_frame(C2, 10, encode_select_request(SelectMode::Arm, 5, &entries));
    step(&mut server, &mut t);
    t.take_replies(C2);

    t.push_interrupt();
    step(&mut server, &mut t);

    // The wake observes the replenished pool, and the queued read drains
    // from the same event.
    assert_eq!(t.take_wakes(), [(C2, 5)]);
    assert_eq!(common::single_read_reply(&mut t, C1), (STATUS_OK, 8));
}
