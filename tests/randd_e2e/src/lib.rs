//! CONTEXT: randd end-to-end test harness library
//! INTENT: Full-lifecycle device-service testing over the loopback transport
//! IDL (target): OPEN/CLOSE/DUP/READ/FSTAT/STAT/SELECT/UNMOUNT/VERSION
//! DEPS: randd (service integration)
//! READINESS: Host backend ready; loopback transport established
//! TESTS: Open-read-wake lifecycle, deferred reads, unmount-driven shutdown
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
