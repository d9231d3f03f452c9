// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`SimPlatform`]: a scripted [`Platform`] over a [`SimDocument`].
//!
//! Every request the orchestrator makes is logged with the virtual time it
//! happened at, so scenarios can assert on ordering and timing afterwards.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use unveil_core::backend::{Platform, Presenter, Unsupported};
use unveil_core::config::Selector;
use unveil_core::content::InsertionSource;
use unveil_core::element::{Candidate, ElementId, ElementStore, NodeKey, StateChanges};
use unveil_core::loader::{LoadTicket, Materializer, ResourceRef};
use unveil_core::signal::Signal;
use unveil_core::time::HostTime;
use unveil_core::visibility::{IntersectionSample, VisibilityOptions, VisibilityPrimitive};

use crate::document::SimDocument;

/// Kind of presentation change applied to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Presentation {
    /// Placeholder state applied at registration.
    Registered,
    /// Reveal presentation applied.
    Revealed,
    /// Connector activated.
    Connector,
    /// Loading indicator applied.
    Loading,
    /// Resource promoted; safe to show.
    Loaded,
    /// Terminal fallback applied.
    Errored,
    /// Fallback cleared by re-registration.
    Reset,
}

/// One presentation change, as seen by the simulated presenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Presented {
    /// Virtual time of the change.
    pub at: HostTime,
    /// Node the change applies to.
    pub key: NodeKey,
    /// What changed.
    pub what: Presentation,
}

/// A materialization request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Started {
    /// Virtual time of the request.
    pub at: HostTime,
    /// Ticket handed to the platform.
    pub ticket: LoadTicket,
}

/// Simulated host for one orchestrator.
#[derive(Debug)]
pub struct SimPlatform {
    document: SimDocument,
    now: HostTime,
    reduced_motion: bool,
    static_root: bool,
    visibility_supported: bool,
    insertions_supported: bool,

    visibility: Option<VisibilityOptions>,
    observed: BTreeMap<ElementId, NodeKey>,
    insertion_selection: Option<Vec<Selector>>,
    in_flight: BTreeSet<LoadTicket>,
    wakeup: Option<HostTime>,

    started: Vec<Started>,
    cancelled: Vec<LoadTicket>,
    presented: Vec<Presented>,
    signals: Vec<(HostTime, Signal)>,
}

impl SimPlatform {
    /// Creates a fully capable platform at time zero.
    #[must_use]
    pub fn new(document: SimDocument) -> Self {
        Self {
            document,
            now: HostTime(0),
            reduced_motion: false,
            static_root: false,
            visibility_supported: true,
            insertions_supported: true,
            visibility: None,
            observed: BTreeMap::new(),
            insertion_selection: None,
            in_flight: BTreeSet::new(),
            wakeup: None,
            started: Vec::new(),
            cancelled: Vec::new(),
            presented: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Sets the reduced-motion preference.
    #[must_use]
    pub fn with_reduced_motion(mut self, prefers: bool) -> Self {
        self.reduced_motion = prefers;
        self
    }

    /// Marks the root as static.
    #[must_use]
    pub fn with_static_root(mut self) -> Self {
        self.static_root = true;
        self
    }

    /// Makes the visibility primitive unavailable.
    #[must_use]
    pub fn without_visibility(mut self) -> Self {
        self.visibility_supported = false;
        self
    }

    /// Makes insertion observation unavailable.
    #[must_use]
    pub fn without_insertions(mut self) -> Self {
        self.insertions_supported = false;
        self
    }

    // -- Clock --

    /// Moves the virtual clock. Time never goes backwards.
    pub fn set_now(&mut self, at: HostTime) {
        self.now = self.now.max(at);
    }

    /// Changes the live reduced-motion preference. The host still has to
    /// tell the orchestrator.
    pub fn set_reduced_motion(&mut self, prefers: bool) {
        self.reduced_motion = prefers;
    }

    // -- Document --

    /// The simulated page.
    #[must_use]
    pub fn document(&self) -> &SimDocument {
        &self.document
    }

    /// The simulated page, mutably.
    pub fn document_mut(&mut self) -> &mut SimDocument {
        &mut self.document
    }

    // -- Visibility --

    /// Whether `element` is currently observed.
    #[must_use]
    pub fn is_observing(&self, element: ElementId) -> bool {
        self.observed.contains_key(&element)
    }

    /// Number of observed elements.
    #[must_use]
    pub fn observed_len(&self) -> usize {
        self.observed.len()
    }

    /// Intersection samples for every observed element at the current
    /// scroll position, in element order.
    #[must_use]
    pub fn samples(&self) -> Vec<IntersectionSample> {
        let Some(options) = &self.visibility else {
            return Vec::new();
        };
        self.observed
            .iter()
            .filter_map(|(&element, &key)| {
                let hit = self.document.intersection(key, options.margin)?;
                Some(IntersectionSample {
                    element,
                    ratio: hit.ratio,
                    intersecting: hit.intersecting,
                })
            })
            .collect()
    }

    // -- Insertions --

    /// Selection passed to a live insertion observer, if one is connected.
    #[must_use]
    pub fn insertion_selection(&self) -> Option<&[Selector]> {
        self.insertion_selection.as_deref()
    }

    // -- Loads --

    /// Attempts that were started and have not been resolved or cancelled.
    pub fn in_flight(&self) -> impl Iterator<Item = LoadTicket> + '_ {
        self.in_flight.iter().copied()
    }

    /// Removes `ticket` from the in-flight set; `false` if it was not there.
    pub fn settle(&mut self, ticket: LoadTicket) -> bool {
        self.in_flight.remove(&ticket)
    }

    /// Every materialization request, in order.
    #[must_use]
    pub fn started(&self) -> &[Started] {
        &self.started
    }

    /// Attempts the orchestrator abandoned.
    #[must_use]
    pub fn cancelled(&self) -> &[LoadTicket] {
        &self.cancelled
    }

    // -- Output --

    /// Every presentation change, in order.
    #[must_use]
    pub fn presented(&self) -> &[Presented] {
        &self.presented
    }

    /// Every emitted signal with its emission time.
    #[must_use]
    pub fn signals(&self) -> &[(HostTime, Signal)] {
        &self.signals
    }

    /// The currently armed wakeup.
    #[must_use]
    pub fn wakeup(&self) -> Option<HostTime> {
        self.wakeup
    }

    fn present(&mut self, store: &ElementStore, ids: &[ElementId], what: Presentation) {
        let at = self.now;
        self.presented.extend(ids.iter().map(|&id| Presented {
            at,
            key: store.key(id),
            what,
        }));
    }
}

impl VisibilityPrimitive for SimPlatform {
    fn connect_visibility(&mut self, options: &VisibilityOptions) -> Result<(), Unsupported> {
        if !self.visibility_supported {
            return Err(Unsupported::VISIBILITY);
        }
        self.visibility = Some(*options);
        Ok(())
    }

    fn observe(&mut self, element: ElementId, key: NodeKey) {
        self.observed.insert(element, key);
    }

    fn unobserve(&mut self, element: ElementId, _key: NodeKey) {
        self.observed.remove(&element);
    }

    fn disconnect_visibility(&mut self) {
        self.observed.clear();
        self.visibility = None;
    }
}

impl InsertionSource for SimPlatform {
    fn connect_insertions(&mut self, selection: &[Selector]) -> Result<(), Unsupported> {
        if !self.insertions_supported {
            return Err(Unsupported::INSERTIONS);
        }
        self.insertion_selection = Some(selection.to_vec());
        Ok(())
    }

    fn disconnect_insertions(&mut self) {
        self.insertion_selection = None;
    }
}

impl Materializer for SimPlatform {
    fn materialize(&mut self, ticket: LoadTicket, _reference: &ResourceRef) {
        self.started.push(Started {
            at: self.now,
            ticket,
        });
        self.in_flight.insert(ticket);
    }

    fn cancel(&mut self, ticket: LoadTicket) {
        if self.in_flight.remove(&ticket) {
            self.cancelled.push(ticket);
        }
    }
}

impl Presenter for SimPlatform {
    fn apply(&mut self, store: &ElementStore, changes: &StateChanges) {
        self.present(store, &changes.registered, Presentation::Registered);
        self.present(store, &changes.revealed, Presentation::Revealed);
        self.present(store, &changes.connectors, Presentation::Connector);
        self.present(store, &changes.loading, Presentation::Loading);
        self.present(store, &changes.loaded, Presentation::Loaded);
        self.present(store, &changes.errored, Presentation::Errored);
        self.present(store, &changes.reset, Presentation::Reset);
    }
}

impl Platform for SimPlatform {
    fn now(&self) -> HostTime {
        self.now
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    fn root_is_static(&self) -> bool {
        self.static_root
    }

    fn scan(&mut self, selection: &[Selector]) -> Vec<Candidate> {
        self.document.scan(selection)
    }

    fn request_wakeup(&mut self, at: Option<HostTime>) {
        self.wakeup = at;
    }

    fn emit(&mut self, signals: &[Signal]) {
        let at = self.now;
        self.signals.extend(signals.iter().map(|&s| (at, s)));
    }
}
