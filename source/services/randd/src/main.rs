// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: randd daemon entry point — entropy character-device service
//! OWNERS: @runtime @security
//! STATUS: Functional (host backend)
//! API_STABILITY: Unstable
//! TEST_COVERAGE: See lib.rs
//!
//! SECURITY INVARIANTS:
//!   - Entropy bytes MUST NOT be logged

#![forbid(unsafe_code)]

use std::process::ExitCode;

use log::error;

use randd::pool::InterruptPool;
use randd::server::{Config, LoopbackTransport, Randd};

fn main() -> ExitCode {
    env_logger::init();

    let config = Config::default();
    let mut server = match Randd::new(InterruptPool::new(), config) {
        Ok(server) => server,
        Err(err) => {
            error!("randd: startup failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    // The host build has no kernel message channel; the loopback transport
    // closes immediately and real traffic goes through the library API.
    let mut transport = LoopbackTransport::new();
    if let Err(err) = server.run(&mut transport) {
        error!("randd: {err}");
        return ExitCode::FAILURE;
    }
    println!("randd: host mode - use library API for testing");
    ExitCode::SUCCESS
}
