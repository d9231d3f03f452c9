// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use super::id::ElementId;

/// The set of state transitions produced by a single orchestrator operation.
///
/// Each list holds the elements that made the corresponding transition, in
/// the order they happened. Presenters read the current values from the
/// [`ElementStore`](super::ElementStore) rather than from this batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateChanges {
    /// Newly registered elements (placeholder presentation applies).
    pub registered: Vec<ElementId>,
    /// Elements whose `revealed` flag was set.
    pub revealed: Vec<ElementId>,
    /// Elements whose paired connector became active.
    pub connectors: Vec<ElementId>,
    /// Elements that entered the loading state.
    pub loading: Vec<ElementId>,
    /// Elements whose resource materialized; safe to show.
    pub loaded: Vec<ElementId>,
    /// Elements that exhausted their retries; terminal fallback applies.
    pub errored: Vec<ElementId>,
    /// Errored elements returned to idle by explicit re-registration.
    pub reset: Vec<ElementId>,
}

impl StateChanges {
    /// Returns `true` if no transition was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
            && self.revealed.is_empty()
            && self.connectors.is_empty()
            && self.loading.is_empty()
            && self.loaded.is_empty()
            && self.errored.is_empty()
            && self.reset.is_empty()
    }

    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.registered.clear();
        self.revealed.clear();
        self.connectors.clear();
        self.loading.clear();
        self.loaded.clear();
        self.errored.clear();
        self.reset.clear();
    }
}
