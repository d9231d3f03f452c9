// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The orchestrator façade.
//!
//! [`Orchestrator`] owns one configuration, one [`Platform`], and the four
//! components. The host drives it from platform callbacks; every entry point
//! ends with a *flush* that hands accumulated [`StateChanges`] to the
//! presenter, forwards signals, and re-arms the platform wakeup when the
//! earliest deadline moved.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──▶ Active ──destroy──▶ Destroyed
//!                                     │                                 ▲
//!                                     └───────────destroy───────────────┘
//! ```
//!
//! `initialize`, `refresh`, `reset_element` and `destroy` return
//! [`LifecycleError`] when called in the wrong phase. Callback entry points
//! (`handle_intersections`, `handle_insertions`, `complete_load`,
//! `poll_timers`, `set_reduced_motion`) are silent no-ops outside `Active`,
//! which is what keeps late asynchronous continuations harmless after
//! teardown.
//!
//! # Modes
//!
//! The effective [`Mode`] is decided at `initialize`:
//!
//! | Condition                                   | Mode            |
//! |---------------------------------------------|-----------------|
//! | static root or forced static                | `Eager`         |
//! | visibility primitive unsupported            | `Eager`         |
//! | reduced motion preferred (and respected)    | `EagerReveal`   |
//! | otherwise                                   | `Deferred`      |
//!
//! `EagerReveal` only changes reveal timing; resource loading still waits
//! for visibility and keeps its retry policy.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::backend::{Capability, Platform, Unsupported};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::content::ContentWatcher;
use crate::context::Shared;
use crate::element::{Candidate, ElementId, ElementStore, NodeKey};
use crate::loader::{LoadFailure, LoadTicket, ResourceLoader, ResourceRef, RetryPolicy};
use crate::reveal::RevealScheduler;
use crate::signal::Signal;
use crate::time::HostTime;
use crate::timer::TimerTask;
use crate::trace::{
    DegradedEvent, InvalidReferenceEvent, LifecycleEvent, ModeEvent, RegisteredEvent, TraceSink,
    Tracer,
};
use crate::visibility::{IntersectionSample, VisibilityOptions, VisibilityWatcher};

/// Lifecycle phase of an [`Orchestrator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Constructed, nothing wired.
    Uninitialized,
    /// Sub-components are being wired.
    Initializing,
    /// Reacting to platform events.
    Active,
    /// Torn down; only a fresh construction can continue.
    Destroyed,
}

/// How reveal and load work is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Reveals and loads wait for visibility.
    Deferred,
    /// Reveals happen immediately; loads wait for visibility.
    EagerReveal,
    /// Everything is revealed and loaded immediately.
    Eager,
}

/// A phase-checked orchestrator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Orchestrator::initialize`].
    Initialize,
    /// [`Orchestrator::refresh`].
    Refresh,
    /// [`Orchestrator::reset_element`].
    ResetElement,
    /// [`Orchestrator::destroy`].
    Destroy,
}

/// An operation was called in a phase that does not allow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleError {
    /// `operation` is not valid in phase `from`.
    InvalidTransition {
        /// Phase at the time of the call.
        from: Phase,
        /// The rejected operation.
        operation: Operation,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, operation } => {
                write!(f, "{operation:?} is not valid in the {from:?} phase")
            }
        }
    }
}

impl core::error::Error for LifecycleError {}

/// Visibility-triggered reveal and load orchestration for one subtree.
#[derive(Debug)]
pub struct Orchestrator<P: Platform> {
    config: OrchestratorConfig,
    platform: P,
    phase: Phase,
    mode: Mode,
    reduced_motion: bool,
    shared: Shared,
    visibility: Option<VisibilityWatcher>,
    content: Option<ContentWatcher>,
    scheduler: RevealScheduler,
    loader: ResourceLoader,
    armed: Option<HostTime>,
}

impl<P: Platform> Orchestrator<P> {
    /// Validates `config` and creates an uninitialized orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] before anything touches the platform.
    pub fn new(config: OrchestratorConfig, platform: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = RevealScheduler::new(config.stagger_interval, config.connector_delay, false);
        let loader = ResourceLoader::new(RetryPolicy {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            backoff_ceiling: config.backoff_ceiling,
            timeout: config.load_timeout,
        });
        Ok(Self {
            config,
            platform,
            phase: Phase::Uninitialized,
            mode: Mode::Deferred,
            reduced_motion: false,
            shared: Shared::default(),
            visibility: None,
            content: None,
            scheduler,
            loader,
            armed: None,
        })
    }

    /// Installs a trace sink. Without the `trace` feature the sink is
    /// dropped.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.shared.tracer = Tracer::new(sink);
        self
    }

    /// Removes and returns the trace sink, if any.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.shared.tracer.take_sink()
    }

    // -- Accessors --

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective mode (meaningful once initialized).
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Registered elements and their state.
    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.shared.store
    }

    /// The platform.
    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.shared.timers.next_deadline()
    }

    /// Whether every registered reveal target has been revealed.
    #[must_use]
    pub fn is_sequence_complete(&self) -> bool {
        self.scheduler.is_complete()
    }

    /// Elements whose visibility registration is still pending.
    #[must_use]
    pub fn pending_visibility(&self) -> usize {
        self.visibility.as_ref().map_or(0, VisibilityWatcher::pending_len)
    }

    // -- Lifecycle --

    /// Wires the components, registers every matching node, and applies the
    /// global overrides.
    ///
    /// Capability failures never fail initialization: a missing visibility
    /// primitive switches to [`Mode::Eager`], a missing insertion source
    /// leaves `refresh` as the only way to pick up new content.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is
    /// [`Phase::Uninitialized`].
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        self.expect_phase(Operation::Initialize, &[Phase::Uninitialized])?;
        self.transition(Phase::Initializing);
        let now = self.platform.now();

        let static_root = self.config.force_static || self.platform.root_is_static();
        self.reduced_motion =
            self.config.respect_reduced_motion && self.platform.prefers_reduced_motion();

        if !static_root {
            let options = VisibilityOptions {
                threshold: self.config.threshold,
                margin: self.config.margin,
            };
            match VisibilityWatcher::connect(options, &mut self.platform) {
                Ok(watcher) => self.visibility = Some(watcher),
                Err(Unsupported { capability }) => self.degraded(capability, now),
            }
        }

        self.mode = if static_root || self.visibility.is_none() {
            Mode::Eager
        } else if self.reduced_motion {
            Mode::EagerReveal
        } else {
            Mode::Deferred
        };
        self.scheduler = RevealScheduler::new(
            self.config.stagger_interval,
            self.config.connector_delay,
            self.mode != Mode::Deferred,
        );
        self.shared.tracer.mode(&ModeEvent {
            mode: self.mode,
            reduced_motion: self.reduced_motion,
            static_root,
            at: now,
        });

        match ContentWatcher::connect(&self.config.selection, &mut self.platform) {
            Ok(watcher) => self.content = Some(watcher),
            Err(Unsupported { capability }) => self.degraded(capability, now),
        }

        let candidates = self.platform.scan(&self.config.selection);
        self.register(candidates, now);

        self.transition(Phase::Active);
        self.flush();
        Ok(())
    }

    /// Re-scans the platform for matching nodes that are not registered yet.
    ///
    /// Returns the number of newly registered elements.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is
    /// [`Phase::Active`].
    pub fn refresh(&mut self) -> Result<usize, LifecycleError> {
        self.expect_phase(Operation::Refresh, &[Phase::Active])?;
        let now = self.platform.now();
        let candidates = self.platform.scan(&self.config.selection);
        let added = self.register(candidates, now);
        self.flush();
        Ok(added)
    }

    /// Re-registers an errored element so it can load again.
    ///
    /// Returns `false` if `key` is unknown or its element is not errored.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is
    /// [`Phase::Active`].
    pub fn reset_element(&mut self, key: NodeKey) -> Result<bool, LifecycleError> {
        self.expect_phase(Operation::ResetElement, &[Phase::Active])?;
        let Some(element) = self.shared.store.lookup(key) else {
            return Ok(false);
        };
        let now = self.platform.now();
        let mut cx = self.shared.cx(now);
        if !self.loader.reset(&mut cx, element) {
            return Ok(false);
        }
        match &mut self.visibility {
            Some(watcher) if self.mode != Mode::Eager => {
                watcher.forget(element);
                watcher.register(element, key, &mut self.platform);
            }
            _ => {
                self.loader.load(&mut cx, element, &mut self.platform);
            }
        }
        self.flush();
        Ok(true)
    }

    /// Tears everything down.
    ///
    /// Stops all observation, cancels every pending timer and in-flight
    /// attempt, and drops all registrations. Presentation already applied to
    /// the platform's nodes is left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] unless the orchestrator is
    /// [`Phase::Active`] or [`Phase::Initializing`].
    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        self.expect_phase(Operation::Destroy, &[Phase::Active, Phase::Initializing])?;
        if let Some(watcher) = self.visibility.take() {
            watcher.destroy(&mut self.platform);
        }
        if let Some(watcher) = self.content.take() {
            watcher.disconnect(&mut self.platform);
        }
        self.loader.clear(&mut self.platform);
        self.scheduler.clear();
        self.shared.timers.clear();
        self.shared.store.clear();
        self.shared.changes.clear();
        self.shared.signals.clear();
        if self.armed.take().is_some() {
            self.platform.request_wakeup(None);
        }
        self.transition(Phase::Destroyed);
        Ok(())
    }

    // -- Platform callbacks --

    /// Processes a batch of intersection reports.
    pub fn handle_intersections(&mut self, samples: &[IntersectionSample]) {
        if self.phase != Phase::Active {
            return;
        }
        let Some(watcher) = &mut self.visibility else {
            return;
        };
        let entered = watcher.process(samples, &mut self.platform);
        if entered.is_empty() {
            return;
        }
        let mut cx = self.shared.cx(self.platform.now());
        for element in entered {
            cx.signal(Signal::EnteredView(element));
            self.scheduler.on_element_entered(&mut cx, element);
            self.loader.load(&mut cx, element, &mut self.platform);
        }
        self.flush();
    }

    /// Registers nodes inserted into the subtree after initialization.
    ///
    /// Returns the number of newly registered elements.
    pub fn handle_insertions(&mut self, inserted: Vec<Candidate>) -> usize {
        if self.phase != Phase::Active {
            return 0;
        }
        let Some(watcher) = &self.content else {
            return 0;
        };
        let accepted = watcher.accept(&self.shared.store, inserted);
        if accepted.is_empty() {
            return 0;
        }
        let now = self.platform.now();
        let added = self.register(accepted, now);
        self.flush();
        added
    }

    /// Reports the outcome of a materialization attempt.
    pub fn complete_load(&mut self, ticket: LoadTicket, outcome: Result<(), LoadFailure>) {
        if self.phase != Phase::Active {
            return;
        }
        let mut cx = self.shared.cx(self.platform.now());
        self.loader.complete(&mut cx, ticket, outcome);
        self.flush();
    }

    /// Runs every deadline that has passed.
    pub fn poll_timers(&mut self) {
        if self.phase != Phase::Active {
            return;
        }
        let now = self.platform.now();
        while let Some((_, task)) = self.shared.timers.pop_due(now) {
            let mut cx = self.shared.cx(now);
            match task {
                TimerTask::Reveal(element) => self.scheduler.fire(&mut cx, element),
                TimerTask::Connector(element) => self.scheduler.fire_connector(&mut cx, element),
                TimerTask::Retry(ticket) => {
                    self.loader.retry_due(&mut cx, ticket, &mut self.platform);
                }
                TimerTask::Timeout(ticket) => {
                    self.loader.timeout_due(&mut cx, ticket, &mut self.platform);
                }
            }
        }
        self.present();
        // The wakeup that brought us here is spent, so always re-arm.
        self.rearm(true);
    }

    /// Applies a live change of the reduced-motion preference.
    ///
    /// Switching to reduced motion completes every pending reveal at once.
    /// Ignored when the configuration does not respect the preference or the
    /// orchestrator already runs in [`Mode::Eager`].
    pub fn set_reduced_motion(&mut self, prefers: bool) {
        if !self.config.respect_reduced_motion {
            return;
        }
        self.reduced_motion = prefers;
        if self.phase != Phase::Active || self.mode == Mode::Eager {
            return;
        }
        let mode = if prefers {
            Mode::EagerReveal
        } else {
            Mode::Deferred
        };
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        let now = self.platform.now();
        self.shared.tracer.mode(&ModeEvent {
            mode,
            reduced_motion: prefers,
            static_root: false,
            at: now,
        });
        let mut cx = self.shared.cx(now);
        self.scheduler.set_immediate(&mut cx, prefers);
        self.flush();
    }

    // -- Internals --

    fn expect_phase(&self, operation: Operation, allowed: &[Phase]) -> Result<(), LifecycleError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.phase,
                operation,
            })
        }
    }

    fn transition(&mut self, to: Phase) {
        let from = core::mem::replace(&mut self.phase, to);
        self.shared.tracer.lifecycle(&LifecycleEvent {
            from,
            to,
            at: self.platform.now(),
        });
    }

    fn degraded(&mut self, capability: Capability, at: HostTime) {
        self.shared
            .tracer
            .degraded(&DegradedEvent { capability, at });
    }

    /// Registers `candidates`, then starts whatever work the mode demands.
    ///
    /// All candidates are stored before any reveal runs, so sequence
    /// completion is judged against the whole batch.
    fn register(&mut self, candidates: Vec<Candidate>, now: HostTime) -> usize {
        let mut added: Vec<ElementId> = Vec::new();
        for candidate in candidates {
            let resource = match candidate.resource.as_deref().map(ResourceRef::parse) {
                Some(Ok(resource)) => Some(resource),
                Some(Err(error)) => {
                    self.shared.tracer.invalid_reference(&InvalidReferenceEvent {
                        key: candidate.key,
                        error,
                        at: now,
                    });
                    None
                }
                None => None,
            };
            let has_resource = resource.is_some();
            let Some(element) = self.shared.store.insert(&candidate, resource) else {
                continue;
            };
            self.shared.changes.registered.push(element);
            self.shared.tracer.registered(&RegisteredEvent {
                element,
                key: candidate.key,
                ordinal: self.shared.store.ordinal(element),
                reveal: candidate.reveal,
                has_resource,
                at: now,
            });
            if candidate.reveal {
                self.scheduler.note_target();
            }
            added.push(element);
        }
        if added.is_empty() {
            return 0;
        }

        let mut cx = self.shared.cx(now);
        match self.mode {
            Mode::Eager => {
                self.scheduler.reveal_all(&mut cx);
                for &element in &added {
                    self.loader.load(&mut cx, element, &mut self.platform);
                }
            }
            Mode::EagerReveal | Mode::Deferred => {
                if self.mode == Mode::EagerReveal {
                    self.scheduler.reveal_all(&mut cx);
                }
                if let Some(watcher) = &mut self.visibility {
                    for &element in &added {
                        let store = &*cx.store;
                        let wants_reveal =
                            self.mode == Mode::Deferred && store.is_reveal_target(element);
                        if wants_reveal || store.resource(element).is_some() {
                            watcher.register(element, store.key(element), &mut self.platform);
                        }
                    }
                }
            }
        }
        added.len()
    }

    /// Presents changes, forwards signals, and re-arms the wakeup.
    fn flush(&mut self) {
        self.present();
        self.rearm(false);
    }

    fn present(&mut self) {
        if !self.shared.changes.is_empty() {
            self.platform.apply(&self.shared.store, &self.shared.changes);
            self.shared.changes.clear();
        }
        if !self.shared.signals.is_empty() {
            self.platform.emit(&self.shared.signals);
            self.shared.signals.clear();
        }
    }

    /// Asks the platform for a wakeup at the earliest deadline, or cancels
    /// it when the queue is empty. Unless `force`d, an unchanged deadline is
    /// not re-requested.
    fn rearm(&mut self, force: bool) {
        let deadline = self.shared.timers.next_deadline();
        if force || deadline != self.armed {
            self.armed = deadline;
            self.platform.request_wakeup(deadline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Presenter;
    use crate::config::Selector;
    use crate::content::InsertionSource;
    use crate::element::{LoadState, StateChanges};
    use crate::loader::Materializer;
    use crate::time::Duration;
    use crate::visibility::VisibilityPrimitive;
    use alloc::vec;

    #[derive(Debug, Default)]
    struct FakePlatform {
        now: u64,
        reduced_motion: bool,
        static_root: bool,
        no_visibility: bool,
        no_insertions: bool,
        nodes: Vec<Candidate>,
        observed: Vec<ElementId>,
        started: Vec<LoadTicket>,
        presented: Vec<StateChanges>,
        emitted: Vec<Signal>,
        wakeup: Option<HostTime>,
    }

    impl VisibilityPrimitive for FakePlatform {
        fn connect_visibility(&mut self, _: &VisibilityOptions) -> Result<(), Unsupported> {
            if self.no_visibility {
                Err(Unsupported::VISIBILITY)
            } else {
                Ok(())
            }
        }
        fn observe(&mut self, element: ElementId, _: NodeKey) {
            self.observed.push(element);
        }
        fn unobserve(&mut self, element: ElementId, _: NodeKey) {
            self.observed.retain(|&e| e != element);
        }
        fn disconnect_visibility(&mut self) {
            self.observed.clear();
        }
    }

    impl InsertionSource for FakePlatform {
        fn connect_insertions(&mut self, _: &[Selector]) -> Result<(), Unsupported> {
            if self.no_insertions {
                Err(Unsupported::INSERTIONS)
            } else {
                Ok(())
            }
        }
        fn disconnect_insertions(&mut self) {}
    }

    impl Materializer for FakePlatform {
        fn materialize(&mut self, ticket: LoadTicket, _: &ResourceRef) {
            self.started.push(ticket);
        }
    }

    impl Presenter for FakePlatform {
        fn apply(&mut self, _: &ElementStore, changes: &StateChanges) {
            self.presented.push(changes.clone());
        }
    }

    impl Platform for FakePlatform {
        fn now(&self) -> HostTime {
            HostTime::from_millis(self.now)
        }
        fn prefers_reduced_motion(&self) -> bool {
            self.reduced_motion
        }
        fn root_is_static(&self) -> bool {
            self.static_root
        }
        fn scan(&mut self, _: &[Selector]) -> Vec<Candidate> {
            self.nodes.clone()
        }
        fn request_wakeup(&mut self, at: Option<HostTime>) {
            self.wakeup = at;
        }
        fn emit(&mut self, signals: &[Signal]) {
            self.emitted.extend_from_slice(signals);
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new(vec![
            Selector::reveal("[data-reveal]"),
            Selector::lazy("[data-src]"),
        ])
    }

    fn platform(nodes: Vec<Candidate>) -> FakePlatform {
        FakePlatform {
            nodes,
            ..FakePlatform::default()
        }
    }

    fn seen(element: ElementId) -> IntersectionSample {
        IntersectionSample {
            element,
            ratio: 1.0,
            intersecting: true,
        }
    }

    fn revealed(orch: &Orchestrator<FakePlatform>) -> usize {
        orch.store()
            .ids()
            .filter(|&id| orch.store().flags(id).revealed)
            .count()
    }

    #[test]
    fn invalid_config_fails_before_touching_the_platform() {
        let err = Orchestrator::new(
            config().with_threshold(2.0),
            platform(vec![Candidate::reveal(NodeKey(1), 0)]),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ThresholdOutOfRange(2.0));
    }

    #[test]
    fn lifecycle_transitions_are_checked() {
        let mut orch = Orchestrator::new(config(), platform(vec![])).unwrap();
        assert_eq!(
            orch.refresh(),
            Err(LifecycleError::InvalidTransition {
                from: Phase::Uninitialized,
                operation: Operation::Refresh
            })
        );
        assert!(orch.destroy().is_err(), "destroy before initialize");
        orch.initialize().unwrap();
        assert_eq!(orch.phase(), Phase::Active);
        assert!(orch.initialize().is_err(), "initialize twice");
        orch.destroy().unwrap();
        assert_eq!(orch.phase(), Phase::Destroyed);
        assert!(orch.destroy().is_err(), "destroy twice");
        assert!(orch.refresh().is_err(), "refresh after destroy");
    }

    #[test]
    fn deferred_mode_waits_for_visibility() {
        let nodes = vec![
            Candidate::reveal(NodeKey(1), 0),
            Candidate::lazy(NodeKey(2), 1, "a.png"),
        ];
        let mut orch = Orchestrator::new(config(), platform(nodes)).unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.mode(), Mode::Deferred);
        assert_eq!(orch.platform().observed.len(), 2, "both observed");
        assert_eq!(revealed(&orch), 0, "nothing revealed yet");

        let ids: Vec<ElementId> = orch.store().ids().collect();
        orch.handle_intersections(&[seen(ids[0]), seen(ids[1])]);
        assert_eq!(revealed(&orch), 1);
        assert_eq!(orch.platform().started.len(), 1, "lazy element loading");
        assert!(orch.platform().observed.is_empty(), "observation released");
        assert!(
            orch.platform()
                .emitted
                .contains(&Signal::EnteredView(ids[1])),
            "entered-view emitted"
        );
    }

    #[test]
    fn unsupported_visibility_degrades_to_eager() {
        let nodes = vec![
            Candidate::reveal(NodeKey(1), 0),
            Candidate::reveal(NodeKey(2), 0),
            Candidate::lazy(NodeKey(3), 1, "a.png"),
        ];
        let mut orch = Orchestrator::new(
            config(),
            FakePlatform {
                no_visibility: true,
                ..platform(nodes)
            },
        )
        .unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.mode(), Mode::Eager);
        assert_eq!(revealed(&orch), 2, "reveal targets shown at once");
        assert_eq!(orch.platform().started.len(), 1, "load started at once");
        assert!(orch.is_sequence_complete(), "run complete");
    }

    #[test]
    fn static_root_skips_visibility() {
        let mut orch = Orchestrator::new(
            config(),
            FakePlatform {
                static_root: true,
                ..platform(vec![Candidate::reveal(NodeKey(1), 0)])
            },
        )
        .unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.mode(), Mode::Eager);
        assert!(orch.platform().observed.is_empty(), "nothing observed");
        assert_eq!(revealed(&orch), 1);
    }

    #[test]
    fn reduced_motion_reveals_but_still_defers_loads() {
        let nodes = vec![
            Candidate::reveal(NodeKey(1), 0),
            Candidate::lazy(NodeKey(2), 1, "a.png"),
        ];
        let mut orch = Orchestrator::new(
            config(),
            FakePlatform {
                reduced_motion: true,
                ..platform(nodes)
            },
        )
        .unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.mode(), Mode::EagerReveal);
        assert_eq!(revealed(&orch), 1);
        assert!(orch.platform().started.is_empty(), "load waits for visibility");
        assert_eq!(orch.platform().observed.len(), 1, "lazy element observed");
    }

    #[test]
    fn ignored_reduced_motion_preference() {
        let mut orch = Orchestrator::new(
            config().with_reduced_motion(false),
            FakePlatform {
                reduced_motion: true,
                ..platform(vec![Candidate::reveal(NodeKey(1), 0)])
            },
        )
        .unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.mode(), Mode::Deferred);
        orch.set_reduced_motion(true);
        assert_eq!(orch.mode(), Mode::Deferred, "live change ignored too");
    }

    #[test]
    fn live_reduced_motion_flushes_pending_reveals() {
        let nodes = (1..=3).map(|k| Candidate::reveal(NodeKey(k), 0)).collect();
        let mut orch = Orchestrator::new(config(), platform(nodes)).unwrap();
        orch.initialize().unwrap();
        let ids: Vec<ElementId> = orch.store().ids().collect();
        orch.handle_intersections(&[seen(ids[0]), seen(ids[1]), seen(ids[2])]);
        assert_eq!(revealed(&orch), 1, "ordinals 1 and 2 wait");
        assert!(orch.platform().wakeup.is_some(), "wakeup armed");

        orch.set_reduced_motion(true);
        assert_eq!(orch.mode(), Mode::EagerReveal);
        assert_eq!(revealed(&orch), 3, "pending reveals completed");
        assert_eq!(orch.platform().wakeup, None, "wakeup cancelled");
    }

    #[test]
    fn timers_drive_stagger_through_wakeups() {
        let nodes = (1..=3).map(|k| Candidate::reveal(NodeKey(k), 0)).collect();
        let mut orch = Orchestrator::new(config(), platform(nodes)).unwrap();
        orch.initialize().unwrap();
        let ids: Vec<ElementId> = orch.store().ids().collect();
        orch.handle_intersections(&[seen(ids[0]), seen(ids[1]), seen(ids[2])]);
        assert_eq!(orch.platform().wakeup, Some(HostTime::from_millis(100)));

        orch.platform_mut().now = 100;
        orch.poll_timers();
        assert_eq!(revealed(&orch), 2);
        assert_eq!(orch.platform().wakeup, Some(HostTime::from_millis(200)));

        orch.platform_mut().now = 200;
        orch.poll_timers();
        assert_eq!(revealed(&orch), 3);
        assert_eq!(orch.platform().wakeup, None);
        assert_eq!(
            orch.platform().emitted.last(),
            Some(&Signal::SequenceComplete)
        );
    }

    #[test]
    fn retries_and_teardown_safety() {
        let nodes = vec![Candidate::lazy(NodeKey(1), 1, "a.png")];
        let mut orch = Orchestrator::new(config(), platform(nodes)).unwrap();
        orch.initialize().unwrap();
        let id = orch.store().lookup(NodeKey(1)).unwrap();
        orch.handle_intersections(&[seen(id)]);

        let first = orch.platform().started[0];
        orch.complete_load(first, Err(LoadFailure::Network));
        assert_eq!(orch.platform().wakeup, Some(HostTime::from_millis(1_000)));

        orch.destroy().unwrap();
        assert_eq!(orch.platform().wakeup, None, "wakeup cancelled");
        orch.platform_mut().now = 5_000;
        orch.poll_timers();
        orch.complete_load(first, Ok(()));
        assert_eq!(orch.platform().started.len(), 1, "no retry after destroy");
        assert!(orch.store().is_empty(), "state dropped");
    }

    #[test]
    fn insertions_register_without_refresh() {
        let mut orch = Orchestrator::new(config(), platform(vec![])).unwrap();
        orch.initialize().unwrap();
        let added = orch.handle_insertions(vec![
            Candidate::reveal(NodeKey(5), 0),
            Candidate::reveal(NodeKey(5), 0),
        ]);
        assert_eq!(added, 1);
        assert_eq!(orch.pending_visibility(), 1, "registered with visibility");
    }

    #[test]
    fn missing_insertion_source_keeps_refresh_working() {
        let mut orch = Orchestrator::new(
            config(),
            FakePlatform {
                no_insertions: true,
                ..platform(vec![])
            },
        )
        .unwrap();
        orch.initialize().unwrap();
        assert_eq!(orch.handle_insertions(vec![Candidate::reveal(NodeKey(5), 0)]), 0);
        orch.platform_mut().nodes = vec![Candidate::reveal(NodeKey(5), 0)];
        assert_eq!(orch.refresh(), Ok(1));
        assert_eq!(orch.refresh(), Ok(0), "already tracked");
    }

    #[test]
    fn invalid_reference_registers_without_loading() {
        let nodes = vec![Candidate::lazy(NodeKey(1), 1, "   ")];
        let mut orch = Orchestrator::new(config(), platform(nodes)).unwrap();
        orch.initialize().unwrap();
        let id = orch.store().lookup(NodeKey(1)).unwrap();
        assert!(orch.store().resource(id).is_none(), "reference rejected");
        assert!(orch.platform().observed.is_empty(), "nothing to wait for");
    }

    #[test]
    fn reset_element_retries_after_exhaustion() {
        let config = config().with_retries(0, Duration::from_millis(10), Duration::from_millis(10));
        let nodes = vec![Candidate::lazy(NodeKey(1), 1, "a.png")];
        let mut orch = Orchestrator::new(config, platform(nodes)).unwrap();
        orch.initialize().unwrap();
        let id = orch.store().lookup(NodeKey(1)).unwrap();
        orch.handle_intersections(&[seen(id)]);
        orch.complete_load(orch.platform().started[0], Err(LoadFailure::Decode));
        assert_eq!(orch.store().load_state(id), LoadState::Errored);
        assert!(
            orch.platform().emitted.contains(&Signal::LoadError {
                element: id,
                attempts: 1
            }),
            "load-error emitted"
        );

        assert_eq!(orch.reset_element(NodeKey(1)), Ok(true));
        assert_eq!(orch.store().load_state(id), LoadState::Idle);
        assert_eq!(orch.pending_visibility(), 1, "observed again");
        orch.handle_intersections(&[seen(id)]);
        assert_eq!(orch.platform().started.len(), 2, "fresh attempt");
        assert_eq!(orch.reset_element(NodeKey(9)), Ok(false), "unknown key");
    }
}
