// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot viewport entry detection.
//!
//! [`VisibilityWatcher`] keeps the set of *pending* registrations and turns
//! raw [`IntersectionSample`]s from the platform into a list of elements
//! that entered the trigger region. A registration fires at most once: on
//! firing it is removed and the platform is told to stop observing the
//! element, and the watcher refuses to register it again.
//!
//! The watcher never mutates element state. What entering *means* (a reveal,
//! a load, both) is decided by the orchestrator.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::backend::Unsupported;
use crate::config::Margin;
use crate::element::{ElementId, NodeKey};

/// Intersection options handed to the platform primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityOptions {
    /// Minimum visible fraction (0–1).
    pub threshold: f64,
    /// Trigger region adjustment.
    pub margin: Margin,
}

/// One platform intersection report for an observed element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionSample {
    /// The observed element.
    pub element: ElementId,
    /// Visible fraction of the element inside the trigger region.
    pub ratio: f64,
    /// Whether the element touches the trigger region at all.
    pub intersecting: bool,
}

/// The platform's viewport-intersection mechanism.
pub trait VisibilityPrimitive {
    /// Prepares the primitive with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Unsupported`] if the platform has no intersection
    /// mechanism or it could not be created.
    fn connect_visibility(&mut self, options: &VisibilityOptions) -> Result<(), Unsupported>;

    /// Starts reporting intersections for `element`.
    fn observe(&mut self, element: ElementId, key: NodeKey);

    /// Stops reporting intersections for `element`.
    fn unobserve(&mut self, element: ElementId, key: NodeKey);

    /// Stops reporting anything and releases the primitive.
    fn disconnect_visibility(&mut self);
}

/// Tracks pending visibility registrations.
#[derive(Debug)]
pub struct VisibilityWatcher {
    options: VisibilityOptions,
    pending: BTreeMap<ElementId, NodeKey>,
    fired: BTreeSet<ElementId>,
}

impl VisibilityWatcher {
    /// Connects the platform primitive and creates a watcher.
    ///
    /// # Errors
    ///
    /// Returns [`Unsupported`] synchronously when the primitive is
    /// unavailable, so the caller can switch to eager mode.
    pub fn connect(
        options: VisibilityOptions,
        primitive: &mut dyn VisibilityPrimitive,
    ) -> Result<Self, Unsupported> {
        primitive.connect_visibility(&options)?;
        Ok(Self {
            options,
            pending: BTreeMap::new(),
            fired: BTreeSet::new(),
        })
    }

    /// Options the primitive was connected with.
    #[must_use]
    pub fn options(&self) -> &VisibilityOptions {
        &self.options
    }

    /// Begins watching `element`.
    ///
    /// Returns `false` if it is already pending or has already fired.
    pub fn register(
        &mut self,
        element: ElementId,
        key: NodeKey,
        primitive: &mut dyn VisibilityPrimitive,
    ) -> bool {
        if self.fired.contains(&element) || self.pending.contains_key(&element) {
            return false;
        }
        self.pending.insert(element, key);
        primitive.observe(element, key);
        true
    }

    /// Allows a fired element to be registered again.
    ///
    /// Used only for explicit re-registration of errored elements.
    pub fn forget(&mut self, element: ElementId) {
        self.fired.remove(&element);
    }

    /// Processes one batch of intersection reports.
    ///
    /// Returns each pending element that crossed the threshold, in batch
    /// order, and stops observing it. Reports for elements that are not
    /// pending are ignored.
    pub fn process(
        &mut self,
        samples: &[IntersectionSample],
        primitive: &mut dyn VisibilityPrimitive,
    ) -> Vec<ElementId> {
        let mut entered = Vec::new();
        for sample in samples {
            if !self.qualifies(sample) {
                continue;
            }
            if let Some(key) = self.pending.remove(&sample.element) {
                self.fired.insert(sample.element);
                primitive.unobserve(sample.element, key);
                entered.push(sample.element);
            }
        }
        entered
    }

    /// Returns `true` if `element` is registered and has not fired.
    #[must_use]
    pub fn is_pending(&self, element: ElementId) -> bool {
        self.pending.contains_key(&element)
    }

    /// Number of pending registrations.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Stops watching every pending element.
    pub fn unregister_all(&mut self, primitive: &mut dyn VisibilityPrimitive) {
        for (element, key) in core::mem::take(&mut self.pending) {
            primitive.unobserve(element, key);
        }
    }

    /// Stops watching everything and disconnects the primitive.
    pub fn destroy(mut self, primitive: &mut dyn VisibilityPrimitive) {
        self.unregister_all(primitive);
        primitive.disconnect_visibility();
    }

    fn qualifies(&self, sample: &IntersectionSample) -> bool {
        sample.intersecting && sample.ratio >= self.options.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePrimitive {
        supported: bool,
        observed: BTreeSet<ElementId>,
        disconnected: bool,
    }

    impl VisibilityPrimitive for FakePrimitive {
        fn connect_visibility(&mut self, _: &VisibilityOptions) -> Result<(), Unsupported> {
            if self.supported {
                Ok(())
            } else {
                Err(Unsupported::VISIBILITY)
            }
        }
        fn observe(&mut self, element: ElementId, _: NodeKey) {
            self.observed.insert(element);
        }
        fn unobserve(&mut self, element: ElementId, _: NodeKey) {
            self.observed.remove(&element);
        }
        fn disconnect_visibility(&mut self) {
            self.disconnected = true;
        }
    }

    fn options(threshold: f64) -> VisibilityOptions {
        VisibilityOptions {
            threshold,
            margin: Margin::ZERO,
        }
    }

    fn sample(idx: u32, ratio: f64) -> IntersectionSample {
        IntersectionSample {
            element: ElementId(idx),
            ratio,
            intersecting: ratio > 0.0,
        }
    }

    fn connected(threshold: f64) -> (VisibilityWatcher, FakePrimitive) {
        let mut prim = FakePrimitive {
            supported: true,
            ..FakePrimitive::default()
        };
        let watcher = VisibilityWatcher::connect(options(threshold), &mut prim).unwrap();
        (watcher, prim)
    }

    #[test]
    fn unsupported_primitive_fails_at_construction() {
        let mut prim = FakePrimitive::default();
        let err = VisibilityWatcher::connect(options(0.1), &mut prim).unwrap_err();
        assert_eq!(err, Unsupported::VISIBILITY);
    }

    #[test]
    fn fires_once_then_stops_observing() {
        let (mut watcher, mut prim) = connected(0.25);
        assert!(watcher.register(ElementId(0), NodeKey(10), &mut prim));
        assert!(prim.observed.contains(&ElementId(0)), "observation started");

        let entered = watcher.process(&[sample(0, 0.5)], &mut prim);
        assert_eq!(entered, [ElementId(0)]);
        assert!(prim.observed.is_empty(), "observation stopped after firing");

        let again = watcher.process(&[sample(0, 0.0), sample(0, 1.0)], &mut prim);
        assert!(again.is_empty(), "re-entry never re-fires");
        assert!(
            !watcher.register(ElementId(0), NodeKey(10), &mut prim),
            "fired element cannot be re-registered"
        );
    }

    #[test]
    fn below_threshold_stays_pending() {
        let (mut watcher, mut prim) = connected(0.5);
        watcher.register(ElementId(1), NodeKey(1), &mut prim);
        assert!(watcher.process(&[sample(1, 0.49)], &mut prim).is_empty());
        assert!(watcher.is_pending(ElementId(1)), "still pending");
        assert_eq!(watcher.process(&[sample(1, 0.5)], &mut prim), [ElementId(1)]);
    }

    #[test]
    fn zero_threshold_needs_intersection() {
        let (mut watcher, mut prim) = connected(0.0);
        watcher.register(ElementId(2), NodeKey(2), &mut prim);
        let miss = IntersectionSample {
            element: ElementId(2),
            ratio: 0.0,
            intersecting: false,
        };
        assert!(watcher.process(&[miss], &mut prim).is_empty());
        let touch = IntersectionSample {
            intersecting: true,
            ..miss
        };
        assert_eq!(watcher.process(&[touch], &mut prim), [ElementId(2)]);
    }

    #[test]
    fn forget_allows_explicit_re_registration() {
        let (mut watcher, mut prim) = connected(0.1);
        watcher.register(ElementId(3), NodeKey(3), &mut prim);
        watcher.process(&[sample(3, 1.0)], &mut prim);
        watcher.forget(ElementId(3));
        assert!(watcher.register(ElementId(3), NodeKey(3), &mut prim));
    }

    #[test]
    fn destroy_releases_everything() {
        let (mut watcher, mut prim) = connected(0.1);
        for idx in 0..3 {
            watcher.register(ElementId(idx), NodeKey(u64::from(idx)), &mut prim);
        }
        assert_eq!(watcher.pending_len(), 3);
        watcher.destroy(&mut prim);
        assert!(prim.observed.is_empty(), "all observation released");
        assert!(prim.disconnected, "primitive disconnected");
    }
}
