// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity and markup conventions.
//!
//! Every node the platform reports gets a `data-unveil-key` attribute holding
//! its [`NodeKey`], so later scans and mutation records map back to the same
//! key.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use unveil_core::config::{Margin, Selector};
use unveil_core::element::{Candidate, NodeKey};
use unveil_core::signal::Signal;
use web_sys::Element;

/// Attribute holding the platform key of a tracked node.
pub const KEY_ATTR: &str = "data-unveil-key";
/// Attribute declaring an explicit stagger position.
pub const ORDER_ATTR: &str = "data-unveil-order";
/// Attribute marking a node with a paired connector.
pub const CONNECTOR_ATTR: &str = "data-unveil-connector";
/// Non-rendering attribute carrying the deferred resource.
pub const SOURCE_ATTR: &str = "data-src";
/// Root marker that disables all deferral.
pub const STATIC_ATTR: &str = "data-unveil-static";
/// Prefix of the custom events dispatched on the root.
pub const EVENT_PREFIX: &str = "unveil:";

/// Maps [`NodeKey`]s to live elements.
#[derive(Debug, Default)]
pub(crate) struct NodeRegistry {
    nodes: Vec<Element>,
}

impl NodeRegistry {
    /// The key of `element`, assigning a fresh one on first sight.
    ///
    /// A key attribute copied onto a cloned node does not match the stored
    /// element, so the clone gets its own key.
    pub(crate) fn key_of(&mut self, element: &Element) -> Option<NodeKey> {
        if let Some(key) = read_key(element)
            && self.get(key) == Some(element)
        {
            return Some(key);
        }
        let key = NodeKey(self.nodes.len() as u64);
        element
            .set_attribute(KEY_ATTR, &key.0.to_string())
            .ok()?;
        self.nodes.push(element.clone());
        Some(key)
    }

    /// The element registered under `key`.
    pub(crate) fn get(&self, key: NodeKey) -> Option<&Element> {
        self.nodes.get(usize::try_from(key.0).ok()?)
    }

    /// Removes the key attribute from every node and forgets them.
    pub(crate) fn clear(&mut self) {
        for node in self.nodes.drain(..) {
            let _ = node.remove_attribute(KEY_ATTR);
        }
    }

    /// Describes `element` against `selection`, or `None` if it matches no
    /// selector.
    pub(crate) fn describe(&mut self, element: &Element, selection: &[Selector]) -> Option<Candidate> {
        let (group, selector) = selection
            .iter()
            .enumerate()
            .find(|(_, s)| element.matches(&s.pattern).unwrap_or(false))?;
        Some(Candidate {
            key: self.key_of(element)?,
            group: u32::try_from(group).ok()?,
            ordinal: element.get_attribute(ORDER_ATTR).as_deref().and_then(parse_ordinal),
            resource: if selector.kind.loads() {
                element.get_attribute(SOURCE_ATTR)
            } else {
                None
            },
            reveal: selector.kind.reveals(),
            connector: element.has_attribute(CONNECTOR_ATTR),
        })
    }
}

/// Reads the key attribute of an already tracked node.
pub(crate) fn read_key(element: &Element) -> Option<NodeKey> {
    element
        .get_attribute(KEY_ATTR)?
        .parse()
        .ok()
        .map(NodeKey)
}

/// Parses a declared stagger position. Anything but a non-negative integer
/// is ignored.
#[must_use]
pub fn parse_ordinal(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Joins every selector pattern into one selector list.
#[must_use]
pub fn selector_list(selection: &[Selector]) -> String {
    selection
        .iter()
        .map(|s| s.pattern.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats a margin as an `IntersectionObserver` `rootMargin`.
#[must_use]
pub fn root_margin(margin: Margin) -> String {
    format!(
        "{}px {}px {}px {}px",
        margin.top, margin.right, margin.bottom, margin.left
    )
}

/// Name of the custom event dispatched for `signal`.
#[must_use]
pub fn event_name(signal: &Signal) -> String {
    format!("{EVENT_PREFIX}{}", signal.name())
}

/// CSS `background-image` value for a resource URL.
#[must_use]
pub fn css_url(reference: &str) -> String {
    let escaped = reference.replace('\\', "\\\\").replace('"', "\\\"");
    format!("url(\"{escaped}\")")
}
