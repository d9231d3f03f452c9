// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulated platform for Unveil orchestrators.
//!
//! - [`document`] models a scrollable page of rectangular nodes.
//! - [`platform`] implements [`Platform`](unveil_core::backend::Platform)
//!   over that page with a virtual clock, scripted capabilities, and logs
//!   of everything the orchestrator asked for.
//! - [`sim`] drives an orchestrator the way a browser event loop would:
//!   scrolling delivers intersection batches, advancing the clock fires the
//!   armed wakeup, and load outcomes are resolved on demand.

#![no_std]

extern crate alloc;

pub mod document;
pub mod platform;
pub mod sim;

#[cfg(test)]
mod properties;
