// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The browser [`Platform`].
//!
//! [`WebPlatform`] owns every browser resource an orchestrator uses: the
//! node registry, both observers, the image loader and the wakeup timer.
//! Callbacks reach the orchestrator through a weak [`Handle`] so that
//! dropping the [`Unveil`](crate::Unveil) handle frees everything.

use alloc::collections::BTreeMap;
use alloc::rc::Weak;
use alloc::vec::Vec;
use core::cell::RefCell;

use js_sys::{Object, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{CustomEvent, CustomEventInit, Element};

use unveil_core::backend::{Platform, Presenter, Unsupported};
use unveil_core::config::Selector;
use unveil_core::content::InsertionSource;
use unveil_core::element::{Candidate, ElementId, ElementStore, NodeKey, StateChanges};
use unveil_core::loader::{LoadTicket, Materializer, ResourceRef};
use unveil_core::orchestrator::Orchestrator;
use unveil_core::signal::Signal;
use unveil_core::time::HostTime;
use unveil_core::visibility::{VisibilityOptions, VisibilityPrimitive};

use crate::dom::{NodeRegistry, STATIC_ATTR, event_name, selector_list};
use crate::load::ImageLoader;
use crate::observe::{InsertionBridge, VisibilityBridge, nodes};
use crate::presenter::DomPresenter;
use crate::timer::{WakeupTimer, set_timeout};

/// Media query of the reduced-motion preference.
pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

/// Weak reference from browser callbacks back to their orchestrator.
pub(crate) type Handle = Weak<RefCell<Orchestrator<WebPlatform>>>;

/// Runs `f` on the orchestrator behind `handle`.
///
/// Does nothing once the orchestrator is gone or while it is already
/// borrowed.
pub(crate) fn dispatch(handle: &Handle, f: impl FnOnce(&mut Orchestrator<WebPlatform>)) {
    let Some(cell) = handle.upgrade() else {
        return;
    };
    let Ok(mut orchestrator) = cell.try_borrow_mut() else {
        return;
    };
    f(&mut orchestrator);
}

/// Browser integration for one orchestrated subtree.
#[derive(Debug)]
pub struct WebPlatform {
    root: Element,
    handle: Handle,
    nodes: NodeRegistry,
    /// Element handles to nodes, filled as registrations are presented.
    elements: BTreeMap<ElementId, NodeKey>,
    presenter: DomPresenter,
    selection: Vec<Selector>,
    visibility: Option<VisibilityBridge>,
    insertions: Option<InsertionBridge>,
    pub(crate) loads: ImageLoader,
    wakeup: Option<WakeupTimer>,
}

impl WebPlatform {
    /// Creates a platform orchestrating the subtree under `root`.
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self {
            root,
            handle: Weak::new(),
            nodes: NodeRegistry::default(),
            elements: BTreeMap::new(),
            presenter: DomPresenter::default(),
            selection: Vec::new(),
            visibility: None,
            insertions: None,
            loads: ImageLoader::default(),
            wakeup: None,
        }
    }

    /// Replaces the presenter.
    #[must_use]
    pub fn with_presenter(mut self, presenter: DomPresenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// The orchestrated root.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The DOM node tracked under `key`.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Element> {
        self.nodes.get(key)
    }

    /// Number of attempts currently decoding.
    #[must_use]
    pub fn loads_in_flight(&self) -> usize {
        self.loads.in_flight()
    }

    /// Connects browser callbacks to the orchestrator that owns this
    /// platform.
    pub(crate) fn bind(&mut self, handle: Handle) {
        self.wakeup = Some(WakeupTimer::new(handle.clone()));
        self.handle = handle;
    }

    /// Describes the matching elements among `elements`.
    pub(crate) fn describe_all(&mut self, elements: &[Element]) -> Vec<Candidate> {
        elements
            .iter()
            .filter_map(|element| self.nodes.describe(element, &self.selection))
            .collect()
    }

    /// Drops every browser resource and strips key attributes.
    pub(crate) fn release(&mut self) {
        self.visibility = None;
        self.insertions = None;
        self.loads.clear();
        if let Some(mut timer) = self.wakeup.take() {
            timer.release();
        }
        self.nodes.clear();
        self.elements.clear();
    }

    fn element_node(&self, element: ElementId) -> Option<&Element> {
        self.nodes.get(*self.elements.get(&element)?)
    }
}

fn query_reduced_motion() -> Option<bool> {
    let list = web_sys::window()?.match_media(REDUCED_MOTION_QUERY).ok()??;
    Some(list.matches())
}

impl VisibilityPrimitive for WebPlatform {
    fn connect_visibility(&mut self, options: &VisibilityOptions) -> Result<(), Unsupported> {
        self.visibility = Some(VisibilityBridge::connect(self.handle.clone(), options)?);
        Ok(())
    }

    fn observe(&mut self, _element: ElementId, key: NodeKey) {
        if let (Some(bridge), Some(node)) = (&self.visibility, self.nodes.get(key)) {
            bridge.observe(node);
        }
    }

    fn unobserve(&mut self, _element: ElementId, key: NodeKey) {
        if let (Some(bridge), Some(node)) = (&self.visibility, self.nodes.get(key)) {
            bridge.unobserve(node);
        }
    }

    fn disconnect_visibility(&mut self) {
        self.visibility = None;
    }
}

impl InsertionSource for WebPlatform {
    fn connect_insertions(&mut self, selection: &[Selector]) -> Result<(), Unsupported> {
        self.selection = selection.to_vec();
        self.insertions = Some(InsertionBridge::connect(
            self.handle.clone(),
            &self.root,
            selector_list(selection),
        )?);
        Ok(())
    }

    fn disconnect_insertions(&mut self) {
        self.insertions = None;
    }
}

impl Materializer for WebPlatform {
    fn materialize(&mut self, ticket: LoadTicket, reference: &ResourceRef) {
        self.loads.start(&self.handle, ticket, reference.as_str());
    }

    fn cancel(&mut self, ticket: LoadTicket) {
        self.loads.cancel(ticket);
    }
}

impl Presenter for WebPlatform {
    fn apply(&mut self, store: &ElementStore, changes: &StateChanges) {
        for &id in &changes.registered {
            self.elements.insert(id, store.key(id));
        }
        self.presenter.apply(&self.nodes, store, changes);
    }
}

impl Platform for WebPlatform {
    fn now(&self) -> HostTime {
        crate::now()
    }

    fn prefers_reduced_motion(&self) -> bool {
        query_reduced_motion().unwrap_or(false)
    }

    fn root_is_static(&self) -> bool {
        self.root.has_attribute(STATIC_ATTR)
    }

    fn scan(&mut self, selection: &[Selector]) -> Vec<Candidate> {
        let Ok(found) = self.root.query_selector_all(&selector_list(selection)) else {
            return Vec::new();
        };
        nodes(&found)
            .filter_map(|element| self.nodes.describe(&element, selection))
            .collect()
    }

    fn request_wakeup(&mut self, at: Option<HostTime>) {
        let now = self.now();
        if let Some(timer) = &mut self.wakeup {
            timer.arm(at, now);
        }
    }

    /// Dispatches one `unveil:<signal>` custom event per signal on the
    /// root, on a fresh task so listeners may call back into the handle.
    fn emit(&mut self, signals: &[Signal]) {
        let events: Vec<CustomEvent> = signals
            .iter()
            .filter_map(|signal| self.custom_event(signal))
            .collect();
        if events.is_empty() {
            return;
        }
        let root = self.root.clone();
        let callback = Closure::once_into_js(move || {
            for event in &events {
                let _ = root.dispatch_event(event);
            }
        });
        set_timeout(&callback, 0);
    }
}

impl WebPlatform {
    /// Builds the event for `signal`. `detail.element` is the node the
    /// signal concerns (absent for sequence completion) and
    /// `detail.attempts` the attempt count of a terminal failure.
    fn custom_event(&self, signal: &Signal) -> Option<CustomEvent> {
        let detail = Object::new();
        if let Some(node) = signal.element().and_then(|id| self.element_node(id)) {
            Reflect::set(&detail, &JsValue::from_str("element"), node).ok()?;
        }
        if let Signal::LoadError { attempts, .. } = signal {
            Reflect::set(
                &detail,
                &JsValue::from_str("attempts"),
                &JsValue::from_f64(f64::from(*attempts)),
            )
            .ok()?;
        }
        let init = CustomEventInit::new();
        init.set_detail(&detail);
        CustomEvent::new_with_event_init_dict(&event_name(signal), &init).ok()
    }
}
