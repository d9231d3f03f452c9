// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM presentation.
//!
//! Translates [`ElementStore`] state into class toggles and attribute
//! promotion by applying incremental updates from [`StateChanges`].
//!
//! [`ElementStore`]: unveil_core::element::ElementStore
//! [`StateChanges`]: unveil_core::element::StateChanges

use unveil_core::element::{ElementId, ElementStore, Fallback, StateChanges};
use wasm_bindgen::JsCast as _;
use web_sys::{Element, HtmlElement, HtmlImageElement};

use crate::dom::{NodeRegistry, SOURCE_ATTR, css_url};

/// Class names the presenter toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassNames {
    /// Reveal target waiting to be revealed.
    pub pending: &'static str,
    /// Reveal presentation.
    pub revealed: &'static str,
    /// Active connector.
    pub connector: &'static str,
    /// Deferred resource not loaded yet.
    pub placeholder: &'static str,
    /// Attempt in flight or waiting for backoff.
    pub loading: &'static str,
    /// Resource promoted.
    pub loaded: &'static str,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            pending: "unveil-pending",
            revealed: "unveil-revealed",
            connector: "unveil-connector-active",
            placeholder: "unveil-placeholder",
            loading: "unveil-loading",
            loaded: "unveil-loaded",
        }
    }
}

/// Applies [`StateChanges`] to live DOM nodes.
///
/// Applied presentation is never rolled back, not even on teardown.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomPresenter {
    classes: ClassNames,
}

impl DomPresenter {
    /// Creates a presenter toggling `classes`.
    #[must_use]
    pub fn new(classes: ClassNames) -> Self {
        Self { classes }
    }

    /// The class names in use.
    #[must_use]
    pub fn classes(&self) -> &ClassNames {
        &self.classes
    }

    pub(crate) fn apply(&self, nodes: &NodeRegistry, store: &ElementStore, changes: &StateChanges) {
        let c = &self.classes;
        let node = |id: ElementId| nodes.get(store.key(id));

        // 1. Registration
        for &id in &changes.registered {
            let Some(el) = node(id) else { continue };
            if store.is_reveal_target(id) {
                add(el, c.pending);
            }
            if store.flags(id).placeholder {
                add(el, c.placeholder);
            }
        }

        // 2. Reveals
        for &id in &changes.revealed {
            if let Some(el) = node(id) {
                remove(el, c.pending);
                add(el, c.revealed);
            }
        }

        // 3. Connectors
        for &id in &changes.connectors {
            if let Some(el) = node(id) {
                add(el, c.connector);
            }
        }

        // 4. Loading
        for &id in &changes.loading {
            if let Some(el) = node(id) {
                add(el, c.loading);
            }
        }

        // 5. Loaded: promote the resource
        for &id in &changes.loaded {
            let (Some(el), Some(resource)) = (node(id), store.resource(id)) else {
                continue;
            };
            promote(el, resource.as_str());
            remove(el, c.loading);
            remove(el, c.placeholder);
            add(el, c.loaded);
        }

        // 6. Terminal fallback
        for &id in &changes.errored {
            if let Some(el) = node(id) {
                remove(el, c.loading);
                add(el, store.fallback(id).unwrap_or(Fallback::TERMINAL).marker);
            }
        }

        // 7. Reset
        for &id in &changes.reset {
            if let Some(el) = node(id) {
                remove(el, Fallback::TERMINAL.marker);
                if store.flags(id).placeholder {
                    add(el, c.placeholder);
                }
            }
        }
    }
}

fn add(el: &Element, class: &str) {
    let _ = el.class_list().add_1(class);
}

fn remove(el: &Element, class: &str) {
    let _ = el.class_list().remove_1(class);
}

/// Moves the deferred reference into its rendering slot: `src` for images,
/// `background-image` for everything else.
fn promote(el: &Element, reference: &str) {
    if let Some(img) = el.dyn_ref::<HtmlImageElement>() {
        img.set_src(reference);
    } else if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.style().set_property("background-image", &css_url(reference));
    }
    let _ = el.remove_attribute(SOURCE_ATTR);
}
