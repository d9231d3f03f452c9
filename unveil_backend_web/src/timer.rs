// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` wakeup source.
//!
//! The orchestrator asks for at most one wakeup at a time. [`WakeupTimer`]
//! keeps a single persistent closure that calls
//! [`Orchestrator::poll_timers`] and re-arms a browser timeout for each
//! request, clearing the previous one.
//!
//! [`Orchestrator::poll_timers`]: unveil_core::orchestrator::Orchestrator::poll_timers

use alloc::boxed::Box;
use core::fmt;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use unveil_core::time::HostTime;

use crate::platform::{Handle, dispatch};

// Direct global bindings instead of `web_sys::Window` methods, so timers
// work without fetching the Window object on every request.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "setTimeout")]
    pub(crate) fn set_timeout(callback: &JsValue, delay_ms: i32) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);
}

/// The single armed browser timeout of one orchestrator.
pub(crate) struct WakeupTimer {
    closure: Option<Closure<dyn FnMut()>>,
    pending: Option<i32>,
}

impl WakeupTimer {
    pub(crate) fn new(handle: Handle) -> Self {
        let closure = Closure::wrap(Box::new(move || {
            dispatch(&handle, |orchestrator| orchestrator.poll_timers());
        }) as Box<dyn FnMut()>);
        Self {
            closure: Some(closure),
            pending: None,
        }
    }

    /// Replaces the armed timeout with one firing at `at`, or just clears it.
    pub(crate) fn arm(&mut self, at: Option<HostTime>, now: HostTime) {
        if let Some(id) = self.pending.take() {
            clear_timeout(id);
        }
        if let (Some(at), Some(closure)) = (at, &self.closure) {
            self.pending = Some(set_timeout(closure.as_ref(), delay_ms(at, now)));
        }
    }

    /// Clears the timeout and drops the closure.
    pub(crate) fn release(&mut self) {
        self.arm(None, HostTime(0));
        self.closure = None;
    }
}

impl Drop for WakeupTimer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for WakeupTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeupTimer")
            .field("pending", &self.pending)
            .field("released", &self.closure.is_none())
            .finish()
    }
}

/// Whole milliseconds from `now` until `at`, rounded up so the timeout
/// never fires before the deadline.
pub(crate) fn delay_ms(at: HostTime, now: HostTime) -> i32 {
    let micros = at.ticks().saturating_sub(now.ticks());
    i32::try_from(micros.div_ceil(1_000)).unwrap_or(i32::MAX)
}
