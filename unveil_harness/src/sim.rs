// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event-loop driver for an orchestrator on a [`SimPlatform`].
//!
//! After every step that can change what is observed or where the viewport
//! sits, the driver delivers a fresh intersection batch, the way a browser
//! reports observer entries after layout.

use alloc::vec;
use alloc::vec::Vec;

use unveil_core::backend::Platform;
use unveil_core::config::{ConfigError, OrchestratorConfig};
use unveil_core::element::{ElementId, NodeKey};
use unveil_core::loader::{LoadFailure, LoadTicket};
use unveil_core::orchestrator::{LifecycleError, Orchestrator};
use unveil_core::time::{Duration, HostTime};

use crate::document::SimNode;
use crate::platform::SimPlatform;

/// An orchestrator bound to a simulated platform.
#[derive(Debug)]
pub struct Simulation {
    orchestrator: Orchestrator<SimPlatform>,
}

impl Simulation {
    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(config: OrchestratorConfig, platform: SimPlatform) -> Result<Self, ConfigError> {
        Ok(Self {
            orchestrator: Orchestrator::new(config, platform)?,
        })
    }

    /// Wraps an already constructed orchestrator (for example one with a
    /// trace sink installed).
    #[must_use]
    pub fn from_orchestrator(orchestrator: Orchestrator<SimPlatform>) -> Self {
        Self { orchestrator }
    }

    /// The orchestrator under test.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<SimPlatform> {
        &self.orchestrator
    }

    /// The orchestrator under test, mutably.
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<SimPlatform> {
        &mut self.orchestrator
    }

    /// The simulated platform.
    #[must_use]
    pub fn platform(&self) -> &SimPlatform {
        self.orchestrator.platform()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.platform().now()
    }

    /// Handle of the element registered for `key`.
    #[must_use]
    pub fn element(&self, key: u64) -> Option<ElementId> {
        self.orchestrator.store().lookup(NodeKey(key))
    }

    // -- Lifecycle --

    /// Initializes the orchestrator and delivers the initial intersection
    /// batch.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        self.orchestrator.initialize()?;
        self.deliver_intersections();
        Ok(())
    }

    /// Re-scans the document.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn refresh(&mut self) -> Result<usize, LifecycleError> {
        let added = self.orchestrator.refresh()?;
        self.deliver_intersections();
        Ok(added)
    }

    /// Re-registers the errored element for `key`.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn reset_element(&mut self, key: u64) -> Result<bool, LifecycleError> {
        let reset = self.orchestrator.reset_element(NodeKey(key))?;
        self.deliver_intersections();
        Ok(reset)
    }

    /// Tears the orchestrator down.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`].
    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        self.orchestrator.destroy()
    }

    // -- Host events --

    /// Scrolls the viewport to `y` and reports intersections.
    pub fn scroll_to(&mut self, y: f64) {
        self.orchestrator.platform_mut().document_mut().scroll_to(y);
        self.deliver_intersections();
    }

    /// Appends `node` to the document. A connected insertion observer
    /// reports it if it matches.
    ///
    /// Returns the number of elements the orchestrator registered.
    pub fn insert(&mut self, node: SimNode) -> usize {
        let candidate = self
            .platform()
            .insertion_selection()
            .and_then(|selection| node.candidate(selection));
        self.orchestrator.platform_mut().document_mut().push(node);
        let added = match candidate {
            Some(candidate) => self.orchestrator.handle_insertions(vec![candidate]),
            None => 0,
        };
        self.deliver_intersections();
        added
    }

    /// Reports the outcome of one attempt.
    pub fn resolve(&mut self, ticket: LoadTicket, outcome: Result<(), LoadFailure>) {
        self.orchestrator.platform_mut().settle(ticket);
        self.orchestrator.complete_load(ticket, outcome);
        self.deliver_intersections();
    }

    /// Resolves every in-flight attempt with `outcome`, returning how many
    /// were resolved.
    pub fn resolve_in_flight(&mut self, outcome: Result<(), LoadFailure>) -> usize {
        let tickets: Vec<LoadTicket> = self.platform().in_flight().collect();
        for &ticket in &tickets {
            self.resolve(ticket, outcome);
        }
        tickets.len()
    }

    /// Changes the reduced-motion preference and notifies the orchestrator.
    pub fn set_reduced_motion(&mut self, prefers: bool) {
        self.orchestrator.platform_mut().set_reduced_motion(prefers);
        self.orchestrator.set_reduced_motion(prefers);
        self.deliver_intersections();
    }

    /// Advances the clock by `by`, firing every armed wakeup on the way.
    ///
    /// Each wakeup fires at most once; a wakeup left armed at or before the
    /// one just fired ends the walk instead of firing again.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        let mut fired: Option<HostTime> = None;
        while let Some(at) = self.platform().wakeup() {
            if at > target || fired.is_some_and(|last| at <= last) {
                break;
            }
            fired = Some(at);
            self.orchestrator.platform_mut().set_now(at);
            self.orchestrator.poll_timers();
            self.deliver_intersections();
        }
        self.orchestrator.platform_mut().set_now(target);
    }

    /// Hands the orchestrator the current samples of every observed
    /// element.
    pub fn deliver_intersections(&mut self) {
        let samples = self.platform().samples();
        if !samples.is_empty() {
            self.orchestrator.handle_intersections(&samples);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SimDocument;
    use kurbo::Rect;
    use unveil_core::config::Selector;

    fn sim() -> Simulation {
        let mut doc = SimDocument::new(800.0, 600.0);
        doc.push(SimNode::new(1, ".card", Rect::new(0.0, 0.0, 100.0, 100.0)));
        doc.push(SimNode::new(2, ".card", Rect::new(0.0, 2_000.0, 100.0, 2_100.0)));
        let config = OrchestratorConfig::new(vec![Selector::reveal(".card")]);
        Simulation::new(config, SimPlatform::new(doc)).unwrap()
    }

    #[test]
    fn advance_stops_at_target() {
        let mut sim = sim();
        sim.initialize().unwrap();
        sim.advance(Duration::from_millis(250));
        assert_eq!(sim.now(), HostTime::from_millis(250));
        assert_eq!(sim.platform().wakeup(), None, "nothing left to wake for");
    }

    #[test]
    fn spent_wakeup_fires_once_and_is_cancelled() {
        let mut sim = sim();
        sim.initialize().unwrap();
        let now = sim.now();
        sim.orchestrator_mut().platform_mut().request_wakeup(Some(now));
        sim.advance(Duration::from_millis(10));
        assert_eq!(sim.now(), HostTime::from_millis(10));
        assert_eq!(sim.platform().wakeup(), None, "empty queue cancels the wakeup");
    }

    #[test]
    fn scrolling_reports_new_entries() {
        let mut sim = sim();
        sim.initialize().unwrap();
        let below = sim.element(2).unwrap();
        assert!(sim.platform().is_observing(below), "below the fold");
        sim.scroll_to(1_800.0);
        assert!(!sim.platform().is_observing(below), "fired and released");
    }
}
