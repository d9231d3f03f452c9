// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer bridges.
//!
//! [`VisibilityBridge`] wraps an `IntersectionObserver` and
//! [`InsertionBridge`] a `MutationObserver`. Both callbacks translate their
//! records into orchestrator input and re-enter it through the shared
//! [`Handle`].

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use js_sys::Array;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    MutationObserver, MutationObserverInit, MutationRecord, NodeList,
};

use unveil_core::backend::Unsupported;
use unveil_core::visibility::{IntersectionSample, VisibilityOptions};

use crate::dom::{read_key, root_margin};
use crate::platform::{Handle, dispatch};

type RecordsClosure = Closure<dyn FnMut(Array)>;

/// Live `IntersectionObserver` for one orchestrator.
pub(crate) struct VisibilityBridge {
    observer: IntersectionObserver,
    _callback: RecordsClosure,
}

impl VisibilityBridge {
    pub(crate) fn connect(handle: Handle, options: &VisibilityOptions) -> Result<Self, Unsupported> {
        let callback: RecordsClosure = Closure::wrap(Box::new(move |entries: Array| {
            let reports: Vec<(Element, f64, bool)> = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|entry| {
                    (
                        entry.target(),
                        entry.intersection_ratio(),
                        entry.is_intersecting(),
                    )
                })
                .collect();
            dispatch(&handle, |orchestrator| {
                let samples: Vec<IntersectionSample> = reports
                    .iter()
                    .filter_map(|(target, ratio, intersecting)| {
                        Some(IntersectionSample {
                            element: orchestrator.store().lookup(read_key(target)?)?,
                            ratio: *ratio,
                            intersecting: *intersecting,
                        })
                    })
                    .collect();
                orchestrator.handle_intersections(&samples);
            });
        }) as Box<dyn FnMut(Array)>);

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&root_margin(options.margin));
        init.set_threshold(&JsValue::from_f64(options.threshold));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(|_| Unsupported::VISIBILITY)?;
        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub(crate) fn observe(&self, element: &Element) {
        self.observer.observe(element);
    }

    pub(crate) fn unobserve(&self, element: &Element) {
        self.observer.unobserve(element);
    }
}

impl Drop for VisibilityBridge {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl fmt::Debug for VisibilityBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityBridge").finish_non_exhaustive()
    }
}

/// Live `MutationObserver` over the orchestrated subtree.
pub(crate) struct InsertionBridge {
    observer: MutationObserver,
    _callback: RecordsClosure,
}

impl InsertionBridge {
    /// Watches `root` for added nodes matching the selector list `list`.
    pub(crate) fn connect(handle: Handle, root: &Element, list: String) -> Result<Self, Unsupported> {
        let callback: RecordsClosure = Closure::wrap(Box::new(move |records: Array| {
            let mut inserted = Vec::new();
            for record in records
                .iter()
                .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
            {
                for node in nodes(&record.added_nodes()) {
                    collect_matches(node, &list, &mut inserted);
                }
            }
            if inserted.is_empty() {
                return;
            }
            dispatch(&handle, |orchestrator| {
                let candidates = orchestrator.platform_mut().describe_all(&inserted);
                orchestrator.handle_insertions(candidates);
            });
        }) as Box<dyn FnMut(Array)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|_| Unsupported::INSERTIONS)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(root, &init)
            .map_err(|_| Unsupported::INSERTIONS)?;
        Ok(Self {
            observer,
            _callback: callback,
        })
    }
}

impl Drop for InsertionBridge {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl fmt::Debug for InsertionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertionBridge").finish_non_exhaustive()
    }
}

/// Elements of a `NodeList`, skipping text and comment nodes.
pub(crate) fn nodes(list: &NodeList) -> impl Iterator<Item = Element> + '_ {
    (0..list.length()).filter_map(|i| list.get(i)?.dyn_into::<Element>().ok())
}

/// Pushes `node` and its descendants that match `list`, in document order.
fn collect_matches(node: Element, list: &str, out: &mut Vec<Element>) {
    let descendants = node.query_selector_all(list).ok();
    if node.matches(list).unwrap_or(false) {
        out.push(node);
    }
    if let Some(descendants) = descendants {
        out.extend(nodes(&descendants));
    }
}
