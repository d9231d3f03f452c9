// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline queue for stagger delays, connector sub-delays, backoff waits,
//! and load timeouts.
//!
//! The core owns no real timers. Work that must happen later is pushed here
//! with an absolute [`HostTime`]; the orchestrator asks the platform for a
//! single wakeup at [`next_deadline`](TimerQueue::next_deadline) and drains
//! due tasks with [`pop_due`](TimerQueue::pop_due) when it fires. Clearing
//! the queue is therefore enough to cancel every pending wait.
//!
//! Tasks with the same deadline pop in insertion order.

use alloc::collections::BinaryHeap;
use core::cmp::{Ordering, Reverse};

use crate::element::ElementId;
use crate::loader::LoadTicket;
use crate::time::HostTime;

/// Deferred work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Stagger delay elapsed; reveal the element.
    Reveal(ElementId),
    /// Connector sub-delay elapsed; activate the element's connector.
    Connector(ElementId),
    /// Backoff elapsed; start the attempt described by the ticket.
    Retry(LoadTicket),
    /// The attempt described by the ticket ran out of time.
    Timeout(LoadTicket),
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    at: HostTime,
    seq: u64,
    task: TimerTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// Min-ordered queue of [`TimerTask`]s keyed by deadline.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run at `at`.
    pub fn schedule(&mut self, at: HostTime, task: TimerTask) {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(Entry { at, seq, task }));
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.heap.peek().map(|Reverse(e)| e.at)
    }

    /// Removes and returns the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: HostTime) -> Option<(HostTime, TimerTask)> {
        if self.next_deadline()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(e)| (e.at, e.task))
    }

    /// Keeps only the tasks for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&TimerTask) -> bool) {
        self.heap.retain(|Reverse(e)| keep(&e.task));
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Cancels every pending task.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
