// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for unveil.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`Unveil`]: owning handle that wires an orchestrator to the page
//! - [`WebPlatform`]: `IntersectionObserver`, `MutationObserver`,
//!   `setTimeout` and detached `Image` decoding behind the core traits
//! - [`DomPresenter`]: class toggles and resource promotion
//! - [`dom`]: the markup conventions (key, order, connector and static
//!   attributes, event names)
//!
//! Signals are dispatched on the root as `unveil:<name>` custom events.

#![no_std]

extern crate alloc;

pub mod dom;
mod handle;
mod load;
mod observe;
mod platform;
mod presenter;
mod timer;

pub use handle::Unveil;
pub use platform::{REDUCED_MOTION_QUERY, WebPlatform};
pub use presenter::{ClassNames, DomPresenter};
pub use unveil_core::backend::Presenter;

use unveil_core::time::HostTime;

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks.
#[must_use]
pub fn now() -> HostTime {
    from_millis(timer::performance_now())
}

/// Converts a `DOMHighResTimeStamp` to microsecond ticks.
#[must_use]
pub fn from_millis(ms: f64) -> HostTime {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "performance.now() returns small positive f64; µs fits in u64"
    )]
    let us = (ms * 1000.0) as u64;
    HostTime(us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_become_microseconds() {
        assert_eq!(from_millis(16.5), HostTime(16_500));
        assert_eq!(from_millis(0.0), HostTime(0));
    }

    #[test]
    fn negative_timestamps_saturate_to_zero() {
        assert_eq!(from_millis(-3.0), HostTime(0));
    }
}
