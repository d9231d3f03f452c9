// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource materialization through detached `Image` objects.
//!
//! Each attempt decodes the reference into a fresh `HtmlImageElement` that
//! is never attached to the document. `load` reports success and `error`
//! reports [`LoadFailure::Network`]; the presenter promotes the reference
//! into the real node only after success, so the browser serves it from
//! cache.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::HtmlImageElement;

use unveil_core::loader::{LoadFailure, LoadTicket};

use crate::platform::{Handle, dispatch};
use crate::timer::set_timeout;

struct Attempt {
    image: HtmlImageElement,
    _on_load: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut()>,
}

impl Attempt {
    fn detach(&self) {
        self.image.set_onload(None);
        self.image.set_onerror(None);
    }
}

/// In-flight attempts keyed by ticket.
#[derive(Default)]
pub(crate) struct ImageLoader {
    in_flight: BTreeMap<LoadTicket, Attempt>,
    /// Settled attempts whose closures may still be on the stack.
    retired: Vec<Attempt>,
}

impl ImageLoader {
    /// Starts decoding `reference` for `ticket`.
    pub(crate) fn start(&mut self, handle: &Handle, ticket: LoadTicket, reference: &str) {
        self.retired.clear();
        let Ok(image) = HtmlImageElement::new() else {
            fail_soon(handle.clone(), ticket);
            return;
        };
        let on_load = completion(handle.clone(), ticket, Ok(()));
        let on_error = completion(handle.clone(), ticket, Err(LoadFailure::Network));
        image.set_onload(Some(on_load.as_ref().unchecked_ref()));
        image.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        image.set_src(reference);
        self.in_flight.insert(
            ticket,
            Attempt {
                image,
                _on_load: on_load,
                _on_error: on_error,
            },
        );
    }

    /// Forgets a settled attempt.
    pub(crate) fn settle(&mut self, ticket: LoadTicket) {
        if let Some(attempt) = self.in_flight.remove(&ticket) {
            attempt.detach();
            self.retired.push(attempt);
        }
    }

    /// Abandons an attempt; its outcome is never reported.
    pub(crate) fn cancel(&mut self, ticket: LoadTicket) {
        self.settle(ticket);
    }

    /// Abandons every attempt.
    pub(crate) fn clear(&mut self) {
        for attempt in self.in_flight.values() {
            attempt.detach();
        }
        self.in_flight.clear();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("in_flight", &self.in_flight.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn completion(
    handle: Handle,
    ticket: LoadTicket,
    outcome: Result<(), LoadFailure>,
) -> Closure<dyn FnMut()> {
    Closure::wrap(Box::new(move || {
        dispatch(&handle, |orchestrator| {
            orchestrator.platform_mut().loads.settle(ticket);
            orchestrator.complete_load(ticket, outcome);
        });
    }) as Box<dyn FnMut()>)
}

/// Reports a failed attempt on a fresh task, keeping completion
/// asynchronous even when no image could be created.
fn fail_soon(handle: Handle, ticket: LoadTicket) {
    let callback = Closure::once_into_js(move || {
        dispatch(&handle, |orchestrator| {
            orchestrator.complete_load(ticket, Err(LoadFailure::Network));
        });
    });
    set_timeout(&callback, 0);
}
