// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the orchestrator.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! orchestrator calls as it works. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Ready-made sinks (pretty printer, binary recorder, Chrome trace export)
//! live in the `unveil_debug` crate.

use alloc::boxed::Box;

use crate::backend::Capability;
use crate::element::{ElementId, NodeKey};
use crate::loader::{LoadTicket, ResourceError};
use crate::orchestrator::{Mode, Phase};
use crate::signal::Signal;
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted on every lifecycle transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifecycleEvent {
    /// Phase before the transition.
    pub from: Phase,
    /// Phase after the transition.
    pub to: Phase,
    /// When the transition happened.
    pub at: HostTime,
}

/// Emitted once per initialization with the effective operating mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeEvent {
    /// Effective mode.
    pub mode: Mode,
    /// Whether reduced motion was in effect.
    pub reduced_motion: bool,
    /// Whether the root carried the static marker (or static was forced).
    pub static_root: bool,
    /// When the mode was chosen.
    pub at: HostTime,
}

/// Emitted when a platform capability is unavailable and the orchestrator
/// falls back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegradedEvent {
    /// The missing capability.
    pub capability: Capability,
    /// When the fallback was taken.
    pub at: HostTime,
}

/// Emitted for each newly registered element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegisteredEvent {
    /// Allocated handle.
    pub element: ElementId,
    /// Platform identity.
    pub key: NodeKey,
    /// Snapshotted stagger position.
    pub ordinal: u32,
    /// Whether the element takes part in the reveal sequence.
    pub reveal: bool,
    /// Whether a valid deferred resource is attached.
    pub has_resource: bool,
    /// Registration time.
    pub at: HostTime,
}

/// Emitted when a candidate's resource reference is rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidReferenceEvent {
    /// Platform identity of the node.
    pub key: NodeKey,
    /// Why the reference was rejected.
    pub error: ResourceError,
    /// When it was rejected.
    pub at: HostTime,
}

/// Emitted when a reveal is deferred by its stagger delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevealScheduledEvent {
    /// Element awaiting reveal.
    pub element: ElementId,
    /// When the reveal is due.
    pub due: HostTime,
    /// When it was scheduled.
    pub at: HostTime,
}

/// Emitted when a connector activates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorEvent {
    /// Element owning the connector.
    pub element: ElementId,
    /// Activation time.
    pub at: HostTime,
}

/// Emitted when a materialization attempt starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadAttemptEvent {
    /// Ticket handed to the platform.
    pub ticket: LoadTicket,
    /// Start time.
    pub at: HostTime,
}

/// Emitted when a failed attempt schedules a retry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryScheduledEvent {
    /// Element being retried.
    pub element: ElementId,
    /// Number of the attempt that failed.
    pub failed_attempt: u32,
    /// Backoff wait before the next attempt.
    pub delay: Duration,
    /// When the failure was processed.
    pub at: HostTime,
}

/// Emitted when an attempt exceeds the configured timeout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadTimeoutEvent {
    /// Ticket of the timed-out attempt.
    pub ticket: LoadTicket,
    /// When the timeout fired.
    pub at: HostTime,
}

/// Emitted when a completion arrives for an attempt that is no longer
/// current (timed out, superseded, or after teardown of the element state).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaleCompletionEvent {
    /// The stale ticket.
    pub ticket: LoadTicket,
    /// Arrival time.
    pub at: HostTime,
}

/// Emitted alongside every [`Signal`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalEvent {
    /// The emitted signal.
    pub signal: Signal,
    /// Emission time.
    pub at: HostTime,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the orchestrator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called on every lifecycle transition.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called once the effective mode is known.
    fn on_mode(&mut self, e: &ModeEvent) {
        _ = e;
    }

    /// Called when a capability is missing.
    fn on_degraded(&mut self, e: &DegradedEvent) {
        _ = e;
    }

    /// Called for each new registration.
    fn on_registered(&mut self, e: &RegisteredEvent) {
        _ = e;
    }

    /// Called when a resource reference is rejected.
    fn on_invalid_reference(&mut self, e: &InvalidReferenceEvent) {
        _ = e;
    }

    /// Called when a reveal is deferred by its stagger delay.
    fn on_reveal_scheduled(&mut self, e: &RevealScheduledEvent) {
        _ = e;
    }

    /// Called when a connector activates.
    fn on_connector(&mut self, e: &ConnectorEvent) {
        _ = e;
    }

    /// Called when a materialization attempt starts.
    fn on_load_attempt(&mut self, e: &LoadAttemptEvent) {
        _ = e;
    }

    /// Called when a retry is scheduled.
    fn on_retry_scheduled(&mut self, e: &RetryScheduledEvent) {
        _ = e;
    }

    /// Called when an attempt times out.
    fn on_load_timeout(&mut self, e: &LoadTimeoutEvent) {
        _ = e;
    }

    /// Called when a stale completion is dropped.
    fn on_stale_completion(&mut self, e: &StaleCompletionEvent) {
        _ = e;
    }

    /// Called for every emitted signal.
    fn on_signal(&mut self, e: &SignalEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// the sink passed to [`new`](Self::new) is dropped immediately.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

macro_rules! dispatch {
    ($(#[$doc:meta] $name:ident => $method:ident($ty:ty);)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self, e: &$ty) {
                #[cfg(feature = "trace")]
                if let Some(s) = &mut self.sink {
                    s.$method(e);
                }
                #[cfg(not(feature = "trace"))]
                {
                    _ = e;
                }
            }
        )*
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Takes the sink back out, leaving the tracer disabled.
    #[must_use]
    pub fn take_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    dispatch! {
        /// Emits a [`LifecycleEvent`].
        lifecycle => on_lifecycle(LifecycleEvent);
        /// Emits a [`ModeEvent`].
        mode => on_mode(ModeEvent);
        /// Emits a [`DegradedEvent`].
        degraded => on_degraded(DegradedEvent);
        /// Emits a [`RegisteredEvent`].
        registered => on_registered(RegisteredEvent);
        /// Emits an [`InvalidReferenceEvent`].
        invalid_reference => on_invalid_reference(InvalidReferenceEvent);
        /// Emits a [`RevealScheduledEvent`].
        reveal_scheduled => on_reveal_scheduled(RevealScheduledEvent);
        /// Emits a [`ConnectorEvent`].
        connector => on_connector(ConnectorEvent);
        /// Emits a [`LoadAttemptEvent`].
        load_attempt => on_load_attempt(LoadAttemptEvent);
        /// Emits a [`RetryScheduledEvent`].
        retry_scheduled => on_retry_scheduled(RetryScheduledEvent);
        /// Emits a [`LoadTimeoutEvent`].
        load_timeout => on_load_timeout(LoadTimeoutEvent);
        /// Emits a [`StaleCompletionEvent`].
        stale_completion => on_stale_completion(StaleCompletionEvent);
        /// Emits a [`SignalEvent`].
        signal => on_signal(SignalEvent);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
