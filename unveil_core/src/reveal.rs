// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staged reveal sequencing.
//!
//! Reveal targets are revealed with a delay proportional to their ordinal:
//!
//! ```text
//! delay(i) = i × stagger_interval
//! ```
//!
//! The ordinal is snapshotted when the element registers, so the delay
//! does not depend on when (or in which order) elements actually enter the
//! viewport. A paired connector activates `connector_delay` after its
//! element is revealed.
//!
//! In *immediate* mode (reduced motion, static root, or no visibility
//! support) delays are bypassed. Switching to immediate mode while reveals
//! are still pending completes them on the spot.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::context::Cx;
use crate::element::ElementId;
use crate::signal::Signal;
use crate::time::Duration;
use crate::timer::TimerTask;
use crate::trace::{ConnectorEvent, RevealScheduledEvent};

/// Per-run reveal state.
#[derive(Debug)]
pub struct RevealScheduler {
    stagger: Duration,
    connector_delay: Duration,
    immediate: bool,
    scheduled: BTreeSet<ElementId>,
    connectors: BTreeSet<ElementId>,
    complete: bool,
}

impl RevealScheduler {
    /// Creates a scheduler. `immediate` bypasses every delay.
    #[must_use]
    pub fn new(stagger: Duration, connector_delay: Duration, immediate: bool) -> Self {
        Self {
            stagger,
            connector_delay,
            immediate,
            scheduled: BTreeSet::new(),
            connectors: BTreeSet::new(),
            complete: false,
        }
    }

    /// Whether delays are currently bypassed.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Whether every registered reveal target has been revealed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of reveals waiting for their stagger delay.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.scheduled.len()
    }

    /// Stagger delay for ordinal position `index`.
    #[must_use]
    pub fn delay_for(&self, index: u32) -> Duration {
        if self.immediate {
            Duration::ZERO
        } else {
            self.stagger.saturating_mul(u64::from(index))
        }
    }

    /// Plans delays for an ordered sequence: the element at position `i`
    /// gets `i × stagger_interval`.
    #[must_use]
    pub fn schedule_reveal(&self, sequence: &[ElementId]) -> Vec<(ElementId, Duration)> {
        (0_u32..)
            .zip(sequence)
            .map(|(index, &id)| (id, self.delay_for(index)))
            .collect()
    }

    /// Triggers the reveal of an element that entered the viewport.
    ///
    /// No-op for elements that are not reveal targets, already revealed, or
    /// already waiting for their delay.
    pub(crate) fn on_element_entered(&mut self, cx: &mut Cx<'_>, element: ElementId) {
        if !cx.store.is_reveal_target(element)
            || cx.store.flags(element).revealed
            || self.scheduled.contains(&element)
        {
            return;
        }
        let delay = self.delay_for(cx.store.ordinal(element));
        if delay.is_zero() {
            self.reveal_now(cx, element);
            return;
        }
        let due = cx.now + delay;
        self.scheduled.insert(element);
        cx.timers.schedule(due, TimerTask::Reveal(element));
        cx.tracer.reveal_scheduled(&RevealScheduledEvent {
            element,
            due,
            at: cx.now,
        });
    }

    /// A stagger delay elapsed.
    pub(crate) fn fire(&mut self, cx: &mut Cx<'_>, element: ElementId) {
        if self.scheduled.remove(&element) {
            self.reveal_now(cx, element);
        }
    }

    /// A connector sub-delay elapsed.
    pub(crate) fn fire_connector(&mut self, cx: &mut Cx<'_>, element: ElementId) {
        if self.connectors.remove(&element) {
            activate_connector(cx, element);
        }
    }

    /// Reveals every registered target at once, in stagger order.
    pub(crate) fn reveal_all(&mut self, cx: &mut Cx<'_>) {
        let pending = !self.scheduled.is_empty();
        self.scheduled.clear();
        if pending {
            cx.timers.retain(|t| !matches!(t, TimerTask::Reveal(_)));
        }
        for element in cx.store.reveal_sequence() {
            self.reveal_now(cx, element);
        }
    }

    /// Reacts to a change of the reduced-motion preference.
    ///
    /// Turning delays off completes every pending reveal and connector
    /// immediately. Turning them back on only affects reveals triggered
    /// afterwards.
    pub(crate) fn set_immediate(&mut self, cx: &mut Cx<'_>, immediate: bool) {
        if self.immediate == immediate {
            return;
        }
        self.immediate = immediate;
        if !immediate {
            return;
        }
        self.reveal_all(cx);
        if !self.connectors.is_empty() {
            cx.timers.retain(|t| !matches!(t, TimerTask::Connector(_)));
            for element in core::mem::take(&mut self.connectors) {
                activate_connector(cx, element);
            }
        }
    }

    /// Notes a newly registered reveal target; the run is open again until
    /// it is revealed.
    pub(crate) fn note_target(&mut self) {
        self.complete = false;
    }

    /// Drops all pending work. The caller clears the timer queue.
    pub(crate) fn clear(&mut self) {
        self.scheduled.clear();
        self.connectors.clear();
    }

    fn reveal_now(&mut self, cx: &mut Cx<'_>, element: ElementId) {
        if !cx.store.set_revealed(element) {
            return;
        }
        cx.changes.revealed.push(element);
        cx.signal(Signal::RevealComplete(element));

        if cx.store.has_connector(element) {
            if self.immediate || self.connector_delay.is_zero() {
                activate_connector(cx, element);
            } else {
                self.connectors.insert(element);
                cx.timers
                    .schedule(cx.now + self.connector_delay, TimerTask::Connector(element));
            }
        }

        let total = cx.store.reveal_target_count();
        if !self.complete && total > 0 && cx.store.revealed_count() == total {
            self.complete = true;
            cx.signal(Signal::SequenceComplete);
        }
    }
}

fn activate_connector(cx: &mut Cx<'_>, element: ElementId) {
    if cx.store.set_connector_active(element) {
        cx.changes.connectors.push(element);
        cx.tracer.connector(&ConnectorEvent {
            element,
            at: cx.now,
        });
    }
}
