// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! Unveil splits platform-specific work into *backend* crates. A backend
//! implements [`Platform`], which bundles these pieces:
//!
//! - **Clock** — [`Platform::now`] reads the monotonic clock in microsecond
//!   ticks.
//!
//! - **Environment** — [`Platform::prefers_reduced_motion`] and
//!   [`Platform::root_is_static`] expose the two override inputs;
//!   [`Platform::scan`] reports the nodes currently matching the configured
//!   selectors, in document order.
//!
//! - **Visibility** — [`VisibilityPrimitive`] wraps the platform's
//!   intersection mechanism. Its `connect_visibility` may fail with [`Unsupported`], in
//!   which case the orchestrator runs in eager mode.
//!
//! - **Insertions** — [`InsertionSource`] watches the subtree for inserted
//!   nodes. Optional; on [`Unsupported`] only `refresh` picks up new content.
//!
//! - **Materialization** — [`Materializer`] fetches/decodes a deferred
//!   resource and later reports back through
//!   [`Orchestrator::complete_load`].
//!
//! - **Wakeups** — [`Platform::request_wakeup`] arms (or cancels) a single
//!   platform timer; when it fires the host calls
//!   [`Orchestrator::poll_timers`].
//!
//! - **Presenter** — Implements the [`Presenter`] trait to apply
//!   [`StateChanges`] to the platform's nodes (classes, attributes).
//!
//! - **Signals** — [`Platform::emit`] forwards [`Signal`]s to external
//!   consumers.
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! orchestrator.initialize()?;
//!
//! // intersection callback
//! orchestrator.handle_intersections(&samples);
//! // mutation callback
//! orchestrator.handle_insertions(candidates);
//! // resource callback
//! orchestrator.complete_load(ticket, outcome);
//! // wakeup timer
//! orchestrator.poll_timers();
//! // media-query change
//! orchestrator.set_reduced_motion(matches);
//! ```
//!
//! [`VisibilityPrimitive`]: crate::visibility::VisibilityPrimitive
//! [`InsertionSource`]: crate::content::InsertionSource
//! [`Materializer`]: crate::loader::Materializer
//! [`Orchestrator::complete_load`]: crate::orchestrator::Orchestrator::complete_load
//! [`Orchestrator::poll_timers`]: crate::orchestrator::Orchestrator::poll_timers

use alloc::vec::Vec;
use core::fmt;

use crate::config::Selector;
use crate::content::InsertionSource;
use crate::element::{Candidate, ElementStore, StateChanges};
use crate::loader::Materializer;
use crate::signal::Signal;
use crate::time::HostTime;
use crate::visibility::VisibilityPrimitive;

/// A platform capability the orchestrator can run without.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Viewport intersection detection.
    Visibility,
    /// Subtree insertion observation.
    Insertions,
}

/// A platform capability is missing or failed to set up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unsupported {
    /// Which capability.
    pub capability: Capability,
}

impl Unsupported {
    /// Visibility detection is unavailable.
    pub const VISIBILITY: Self = Self {
        capability: Capability::Visibility,
    };

    /// Insertion observation is unavailable.
    pub const INSERTIONS: Self = Self {
        capability: Capability::Insertions,
    };
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capability {
            Capability::Visibility => write!(f, "viewport intersection is not supported"),
            Capability::Insertions => write!(f, "insertion observation is not supported"),
        }
    }
}

impl core::error::Error for Unsupported {}

/// Applies state transitions to platform nodes.
///
/// Both DOM-based and simulated presenters implement this trait, enabling
/// test doubles.
pub trait Presenter {
    /// Applies `changes`, reading current flags and load states from `store`
    /// as needed.
    fn apply(&mut self, store: &ElementStore, changes: &StateChanges);
}

/// Everything the orchestrator needs from its host.
pub trait Platform: VisibilityPrimitive + InsertionSource + Materializer + Presenter {
    /// Current monotonic time.
    fn now(&self) -> HostTime;

    /// Whether the user currently prefers reduced motion.
    fn prefers_reduced_motion(&self) -> bool;

    /// Whether the orchestrated root carries the static kill-switch marker.
    fn root_is_static(&self) -> bool;

    /// Reports every node currently matching `selection`, in document order.
    ///
    /// Nodes already reported before must keep their [`NodeKey`]; the
    /// orchestrator skips keys it already tracks.
    ///
    /// [`NodeKey`]: crate::element::NodeKey
    fn scan(&mut self, selection: &[Selector]) -> Vec<Candidate>;

    /// Arms a single wakeup at `at`, replacing any earlier request. `None`
    /// cancels the pending wakeup.
    fn request_wakeup(&mut self, at: Option<HostTime>);

    /// Forwards signals to external consumers.
    fn emit(&mut self, signals: &[Signal]) {
        _ = signals;
    }
}
