// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A simulated document: rectangular nodes under a scrollable viewport.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Rect};
use unveil_core::config::{Margin, Selector};
use unveil_core::element::{Candidate, NodeKey};
use unveil_core::geometry::{Intersection, intersection_ratio};

/// One node of the simulated document.
///
/// A node matches the first selector whose pattern equals its
/// [`pattern`](Self::pattern).
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    /// Identity reported to the orchestrator.
    pub key: NodeKey,
    /// Selector pattern the node matches.
    pub pattern: String,
    /// Layout box in document coordinates.
    pub bounds: Rect,
    /// Declared stagger position.
    pub ordinal: Option<u32>,
    /// Raw deferred-resource reference.
    pub resource: Option<String>,
    /// Whether a connector is paired with the node.
    pub connector: bool,
}

impl SimNode {
    /// Creates a node with no ordinal, resource, or connector.
    #[must_use]
    pub fn new(key: u64, pattern: impl Into<String>, bounds: Rect) -> Self {
        Self {
            key: NodeKey(key),
            pattern: pattern.into(),
            bounds,
            ordinal: None,
            resource: None,
            connector: false,
        }
    }

    /// Declares an explicit stagger position.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Attaches a deferred-resource reference.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Pairs a connector with the node.
    #[must_use]
    pub fn with_connector(mut self) -> Self {
        self.connector = true;
        self
    }

    /// Describes the node as a [`Candidate`] for `selection`, or `None` if
    /// no selector matches.
    ///
    /// The resource reference is only reported for selectors that load.
    #[must_use]
    pub fn candidate(&self, selection: &[Selector]) -> Option<Candidate> {
        let (group, selector) = selection
            .iter()
            .enumerate()
            .find(|(_, s)| s.pattern == self.pattern)?;
        Some(Candidate {
            key: self.key,
            group: u32::try_from(group).ok()?,
            ordinal: self.ordinal,
            resource: if selector.kind.loads() {
                self.resource.clone()
            } else {
                None
            },
            reveal: selector.kind.reveals(),
            connector: self.connector,
        })
    }
}

/// A page of [`SimNode`]s in document order plus the current viewport.
#[derive(Clone, Debug)]
pub struct SimDocument {
    nodes: Vec<SimNode>,
    viewport: Rect,
}

impl SimDocument {
    /// Creates an empty document with a `width × height` viewport at the
    /// top of the page.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            nodes: Vec::new(),
            viewport: Rect::new(0.0, 0.0, width, height),
        }
    }

    /// Appends a node in document order.
    pub fn push(&mut self, node: SimNode) {
        self.nodes.push(node);
    }

    /// Moves the viewport so its top edge sits at `y`.
    pub fn scroll_to(&mut self, y: f64) {
        self.viewport = self.viewport.with_origin(Point::new(self.viewport.x0, y));
    }

    /// The current viewport rectangle.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// All nodes in document order.
    #[must_use]
    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// Looks up a node by key.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&SimNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    /// Every node matching `selection`, in document order.
    #[must_use]
    pub fn scan(&self, selection: &[Selector]) -> Vec<Candidate> {
        self.nodes
            .iter()
            .filter_map(|n| n.candidate(selection))
            .collect()
    }

    /// Tests the node `key` against the viewport grown by `margin`.
    #[must_use]
    pub fn intersection(&self, key: NodeKey, margin: Margin) -> Option<Intersection> {
        let node = self.node(key)?;
        Some(intersection_ratio(node.bounds, self.viewport, margin))
    }
}
