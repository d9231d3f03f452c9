// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred-resource loading with bounded exponential backoff.
//!
//! Each element carrying a [`ResourceRef`] runs an independent attempt
//! sequence:
//!
//! ```text
//! Idle ──load──▶ Loading ──ok──▶ Loaded
//!                  │  ▲
//!           fail/  │  │ backoff elapsed
//!          timeout ▼  │
//!              waiting retry
//!                  │
//!                  └── attempts > max_retries ──▶ Errored (terminal)
//! ```
//!
//! Attempts are numbered from 1. After attempt `n` fails the loader waits
//! [`backoff_delay(n)`](backoff_delay) before attempt `n + 1`, so at most
//! `1 + max_retries` attempts are made.
//!
//! Every attempt is identified by a [`LoadTicket`]. A completion is only
//! accepted for the ticket currently in flight; anything else (a late reply
//! after a timeout, a reply for an element that was reset or torn down) is
//! dropped as stale.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::context::Cx;
use crate::element::{ElementId, LoadState};
use crate::signal::Signal;
use crate::time::Duration;
use crate::timer::TimerTask;
use crate::trace::{LoadAttemptEvent, LoadTimeoutEvent, RetryScheduledEvent, StaleCompletionEvent};

// ---------------------------------------------------------------------------
// Resource references
// ---------------------------------------------------------------------------

/// Why a raw resource reference was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceError {
    /// The reference is empty or only whitespace.
    Empty,
    /// The reference contains a control character.
    InvalidCharacter(char),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "resource reference is empty"),
            Self::InvalidCharacter(c) => {
                write!(f, "resource reference contains invalid character {c:?}")
            }
        }
    }
}

impl core::error::Error for ResourceError {}

/// A validated deferred-resource reference (a URL for the web backend).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef(String);

impl ResourceRef {
    /// Validates `raw`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] for blank references or references with
    /// control characters.
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResourceError::Empty);
        }
        if let Some(c) = trimmed.chars().find(|c| c.is_control()) {
            return Err(ResourceError::InvalidCharacter(c));
        }
        Ok(Self(String::from(trimmed)))
    }

    /// The reference text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceRef({:?})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// Identity of one materialization attempt.
///
/// `sequence` changes whenever the element's load state is reset, so tickets
/// from before a reset can never complete the new sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket {
    /// Element being loaded.
    pub element: ElementId,
    /// Load sequence of the element.
    pub sequence: u32,
    /// Attempt number within the sequence, starting at 1.
    pub attempt: u32,
}

/// Why an attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadFailure {
    /// The resource could not be fetched.
    Network,
    /// The resource was fetched but could not be decoded.
    Decode,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "resource could not be fetched"),
            Self::Decode => write!(f, "resource could not be decoded"),
        }
    }
}

impl core::error::Error for LoadFailure {}

/// Fetches and decodes deferred resources.
///
/// Implementations start work in [`materialize`](Self::materialize) and
/// report the outcome later through
/// [`Orchestrator::complete_load`](crate::orchestrator::Orchestrator::complete_load)
/// with the same ticket.
pub trait Materializer {
    /// Starts the attempt described by `ticket`.
    fn materialize(&mut self, ticket: LoadTicket, reference: &ResourceRef);

    /// Abandons an attempt whose outcome is no longer wanted.
    fn cancel(&mut self, ticket: LoadTicket) {
        _ = ticket;
    }
}

/// Wait after `completed_attempts` failed attempts:
/// `min(base × 2^(completed_attempts − 1), ceiling)`.
///
/// Zero completed attempts is treated as one.
#[must_use]
pub fn backoff_delay(completed_attempts: u32, base: Duration, ceiling: Duration) -> Duration {
    let exponent = completed_attempts.max(1) - 1;
    let factor = 2_u64.saturating_pow(exponent);
    base.saturating_mul(factor).min(ceiling)
}

/// Retry bound, backoff window, and optional attempt timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub backoff_base: Duration,
    /// Upper bound for any single wait.
    pub backoff_ceiling: Duration,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Total attempts allowed per sequence.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after `completed_attempts` failures.
    #[must_use]
    pub fn delay_after(&self, completed_attempts: u32) -> Duration {
        backoff_delay(completed_attempts, self.backoff_base, self.backoff_ceiling)
    }
}

#[derive(Clone, Copy, Debug)]
struct Current {
    ticket: LoadTicket,
    in_flight: bool,
}

/// Per-element retry state and attempt tracking.
#[derive(Debug)]
pub struct ResourceLoader {
    policy: RetryPolicy,
    current: BTreeMap<ElementId, Current>,
    sequences: BTreeMap<ElementId, u32>,
}

impl ResourceLoader {
    /// Creates a loader with no active sequences.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            current: BTreeMap::new(),
            sequences: BTreeMap::new(),
        }
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Number of elements currently loading (in flight or waiting to retry).
    #[must_use]
    pub fn active(&self) -> usize {
        self.current.len()
    }

    /// Whether an attempt for `element` is in flight right now.
    #[must_use]
    pub fn is_in_flight(&self, element: ElementId) -> bool {
        self.current.get(&element).is_some_and(|c| c.in_flight)
    }

    /// Starts loading `element`.
    ///
    /// No-op (returning `false`) if the element has no resource or is not
    /// idle: loading, loaded and errored elements are left alone.
    pub(crate) fn load(
        &mut self,
        cx: &mut Cx<'_>,
        element: ElementId,
        materializer: &mut dyn Materializer,
    ) -> bool {
        if cx.store.resource(element).is_none() || cx.store.load_state(element) != LoadState::Idle
        {
            return false;
        }
        cx.store.set_load_state(element, LoadState::Loading);
        cx.changes.loading.push(element);
        let ticket = LoadTicket {
            element,
            sequence: self.sequences.get(&element).copied().unwrap_or(0),
            attempt: 1,
        };
        self.start(cx, ticket, materializer);
        true
    }

    /// Accepts the outcome of an attempt.
    pub(crate) fn complete(
        &mut self,
        cx: &mut Cx<'_>,
        ticket: LoadTicket,
        outcome: Result<(), LoadFailure>,
    ) {
        if !self.is_current(ticket, true) {
            cx.tracer.stale_completion(&StaleCompletionEvent { ticket, at: cx.now });
            return;
        }
        if self.policy.timeout.is_some() {
            cx.timers.retain(|t| *t != TimerTask::Timeout(ticket));
        }
        match outcome {
            Ok(()) => {
                self.current.remove(&ticket.element);
                cx.store.set_load_state(ticket.element, LoadState::Loaded);
                cx.changes.loaded.push(ticket.element);
                cx.signal(Signal::LoadSuccess(ticket.element));
            }
            Err(_) => self.fail(cx, ticket),
        }
    }

    /// Backoff for `ticket` elapsed; starts the attempt.
    pub(crate) fn retry_due(
        &mut self,
        cx: &mut Cx<'_>,
        ticket: LoadTicket,
        materializer: &mut dyn Materializer,
    ) {
        if self.is_current(ticket, false) {
            self.start(cx, ticket, materializer);
        }
    }

    /// The attempt for `ticket` ran out of time; counts as a failure.
    pub(crate) fn timeout_due(
        &mut self,
        cx: &mut Cx<'_>,
        ticket: LoadTicket,
        materializer: &mut dyn Materializer,
    ) {
        if !self.is_current(ticket, true) {
            return;
        }
        cx.tracer.load_timeout(&LoadTimeoutEvent { ticket, at: cx.now });
        materializer.cancel(ticket);
        self.fail(cx, ticket);
    }

    /// Returns an errored element to idle so it can be loaded again.
    ///
    /// Returns `false` unless the element is errored.
    pub(crate) fn reset(&mut self, cx: &mut Cx<'_>, element: ElementId) -> bool {
        if cx.store.load_state(element) != LoadState::Errored {
            return false;
        }
        let sequence = self.sequences.entry(element).or_insert(0);
        *sequence = sequence.wrapping_add(1);
        cx.store.set_load_state(element, LoadState::Idle);
        cx.changes.reset.push(element);
        true
    }

    /// Abandons every sequence. Attempts still in flight are cancelled.
    pub(crate) fn clear(&mut self, materializer: &mut dyn Materializer) {
        let in_flight: Vec<LoadTicket> = self
            .current
            .values()
            .filter(|c| c.in_flight)
            .map(|c| c.ticket)
            .collect();
        for ticket in in_flight {
            materializer.cancel(ticket);
        }
        self.current.clear();
        self.sequences.clear();
    }

    fn is_current(&self, ticket: LoadTicket, in_flight: bool) -> bool {
        self.current
            .get(&ticket.element)
            .is_some_and(|c| c.ticket == ticket && c.in_flight == in_flight)
    }

    fn start(&mut self, cx: &mut Cx<'_>, ticket: LoadTicket, materializer: &mut dyn Materializer) {
        self.current.insert(
            ticket.element,
            Current {
                ticket,
                in_flight: true,
            },
        );
        cx.tracer.load_attempt(&LoadAttemptEvent { ticket, at: cx.now });
        if let Some(timeout) = self.policy.timeout {
            cx.timers.schedule(cx.now + timeout, TimerTask::Timeout(ticket));
        }
        if let Some(reference) = cx.store.resource(ticket.element) {
            materializer.materialize(ticket, reference);
        }
    }

    fn fail(&mut self, cx: &mut Cx<'_>, ticket: LoadTicket) {
        if ticket.attempt >= self.policy.max_attempts() {
            self.current.remove(&ticket.element);
            cx.store.set_load_state(ticket.element, LoadState::Errored);
            cx.changes.errored.push(ticket.element);
            cx.signal(Signal::LoadError {
                element: ticket.element,
                attempts: ticket.attempt,
            });
            return;
        }
        let delay = self.policy.delay_after(ticket.attempt);
        let next = LoadTicket {
            attempt: ticket.attempt + 1,
            ..ticket
        };
        self.current.insert(
            ticket.element,
            Current {
                ticket: next,
                in_flight: false,
            },
        );
        cx.timers.schedule(cx.now + delay, TimerTask::Retry(next));
        cx.tracer.retry_scheduled(&RetryScheduledEvent {
            element: ticket.element,
            failed_attempt: ticket.attempt,
            delay,
            at: cx.now,
        });
    }
}
