// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use super::id::NodeKey;

/// A node reported by the platform as matching one of the configured
/// selectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Platform identity of the node.
    pub key: NodeKey,
    /// Index of the first selector the node matched.
    pub group: u32,
    /// Explicit stagger position, if the node declares one.
    pub ordinal: Option<u32>,
    /// Raw deferred-resource reference, unvalidated.
    pub resource: Option<String>,
    /// Whether the node takes part in the reveal sequence.
    pub reveal: bool,
    /// Whether a decorative connector is paired with the node.
    pub connector: bool,
}

impl Candidate {
    /// A reveal target with no resource or connector.
    #[must_use]
    pub fn reveal(key: NodeKey, group: u32) -> Self {
        Self {
            key,
            group,
            ordinal: None,
            resource: None,
            reveal: true,
            connector: false,
        }
    }

    /// A load-only node carrying `resource`.
    #[must_use]
    pub fn lazy(key: NodeKey, group: u32, resource: impl Into<String>) -> Self {
        Self {
            key,
            group,
            ordinal: None,
            resource: Some(resource.into()),
            reveal: false,
            connector: false,
        }
    }

    /// Sets an explicit stagger position.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Attaches a deferred resource reference.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Marks the node as having a paired connector.
    #[must_use]
    pub fn with_connector(mut self) -> Self {
        self.connector = true;
        self
    }
}
