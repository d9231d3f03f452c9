// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic content detection.
//!
//! Content added to the document after initialization (infinite scroll,
//! client-side rendering) is reported by the platform's [`InsertionSource`]
//! as a batch of [`Candidate`]s. [`ContentWatcher::accept`] narrows a batch
//! down to nodes that are new to the orchestrator; the orchestrator then
//! registers them exactly like nodes found by the initial scan.
//!
//! Insertion observation is optional. Without it, callers pick up new
//! content with [`Orchestrator::refresh`](crate::orchestrator::Orchestrator::refresh).

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::backend::Unsupported;
use crate::config::Selector;
use crate::element::{Candidate, ElementStore};

/// The platform's subtree-insertion mechanism.
pub trait InsertionSource {
    /// Starts watching the orchestrated subtree for nodes matching
    /// `selection`.
    ///
    /// # Errors
    ///
    /// Returns [`Unsupported`] if insertions cannot be observed.
    fn connect_insertions(&mut self, selection: &[Selector]) -> Result<(), Unsupported>;

    /// Stops watching for insertions.
    fn disconnect_insertions(&mut self);
}

/// Filters insertion batches down to unregistered candidates.
#[derive(Debug)]
pub struct ContentWatcher {
    groups: usize,
}

impl ContentWatcher {
    /// Connects the insertion source for `selection`.
    ///
    /// # Errors
    ///
    /// Propagates [`Unsupported`] from the source.
    pub fn connect(
        selection: &[Selector],
        source: &mut dyn InsertionSource,
    ) -> Result<Self, Unsupported> {
        source.connect_insertions(selection)?;
        Ok(Self {
            groups: selection.len(),
        })
    }

    /// Returns the candidates in `inserted` that should be registered.
    ///
    /// Drops nodes the store already tracks, repeated keys within the batch
    /// (a node inserted, moved, and reinserted in one mutation burst), and
    /// candidates naming a selector group that does not exist. Order is
    /// preserved.
    #[must_use]
    pub fn accept(&self, store: &ElementStore, inserted: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen = BTreeSet::new();
        inserted
            .into_iter()
            .filter(|c| (c.group as usize) < self.groups)
            .filter(|c| store.lookup(c.key).is_none())
            .filter(|c| seen.insert(c.key))
            .collect()
    }

    /// Stops watching for insertions.
    pub fn disconnect(self, source: &mut dyn InsertionSource) {
        source.disconnect_insertions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NodeKey;
    use alloc::vec;

    #[derive(Default)]
    struct FakeSource {
        supported: bool,
        connected: bool,
    }

    impl InsertionSource for FakeSource {
        fn connect_insertions(&mut self, _: &[Selector]) -> Result<(), Unsupported> {
            if !self.supported {
                return Err(Unsupported::INSERTIONS);
            }
            self.connected = true;
            Ok(())
        }
        fn disconnect_insertions(&mut self) {
            self.connected = false;
        }
    }

    fn selection() -> Vec<Selector> {
        vec![Selector::reveal("[data-reveal]"), Selector::lazy("img[data-src]")]
    }

    #[test]
    fn unsupported_source_reports_capability() {
        let mut source = FakeSource::default();
        let err = ContentWatcher::connect(&selection(), &mut source).unwrap_err();
        assert_eq!(err, Unsupported::INSERTIONS);
    }

    #[test]
    fn accept_skips_tracked_and_repeated_keys() {
        let mut source = FakeSource {
            supported: true,
            ..FakeSource::default()
        };
        let watcher = ContentWatcher::connect(&selection(), &mut source).unwrap();
        assert!(source.connected, "source connected");

        let mut store = ElementStore::new();
        store.insert(&Candidate::reveal(NodeKey(1), 0), None);

        let accepted = watcher.accept(
            &store,
            vec![
                Candidate::reveal(NodeKey(1), 0),
                Candidate::reveal(NodeKey(2), 0),
                Candidate::lazy(NodeKey(3), 1, "a.png"),
                Candidate::reveal(NodeKey(2), 0),
                Candidate::reveal(NodeKey(4), 7),
            ],
        );
        let keys: Vec<NodeKey> = accepted.iter().map(|c| c.key).collect();
        assert_eq!(keys, [NodeKey(2), NodeKey(3)]);

        watcher.disconnect(&mut source);
        assert!(!source.connected, "source disconnected");
    }
}
