// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signals emitted to external collaborators.
//!
//! These are the only contract surface exposed to analytics and similar
//! consumers. The orchestrator batches them per operation and hands them to
//! [`Platform::emit`](crate::backend::Platform::emit).

use crate::element::ElementId;

/// A lifecycle notification for an element or the reveal sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The element crossed the visibility threshold.
    EnteredView(ElementId),
    /// The element's `revealed` flag was set.
    RevealComplete(ElementId),
    /// Every registered reveal target is revealed.
    SequenceComplete,
    /// The element's resource materialized; it is safe to show.
    LoadSuccess(ElementId),
    /// The element exhausted its retries.
    LoadError {
        /// The element that failed.
        element: ElementId,
        /// Total materialization attempts made.
        attempts: u32,
    },
}

impl Signal {
    /// Stable event name, as used for DOM custom events and trace output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnteredView(_) => "entered-view",
            Self::RevealComplete(_) => "reveal-complete",
            Self::SequenceComplete => "sequence-complete",
            Self::LoadSuccess(_) => "load-success",
            Self::LoadError { .. } => "load-error",
        }
    }

    /// The element the signal concerns, if any.
    #[must_use]
    pub const fn element(&self) -> Option<ElementId> {
        match *self {
            Self::EnteredView(id) | Self::RevealComplete(id) | Self::LoadSuccess(id) => Some(id),
            Self::LoadError { element, .. } => Some(element),
            Self::SequenceComplete => None,
        }
    }
}
