// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared mutable state threaded through one orchestrator operation.

use alloc::vec::Vec;

use crate::element::{ElementStore, StateChanges};
use crate::signal::Signal;
use crate::time::HostTime;
use crate::timer::TimerQueue;
use crate::trace::{SignalEvent, Tracer};

/// State shared by the reveal scheduler and the resource loader.
///
/// Kept apart from the components so an operation can borrow it alongside
/// the platform and a component at the same time.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) store: ElementStore,
    pub(crate) timers: TimerQueue,
    pub(crate) changes: StateChanges,
    pub(crate) signals: Vec<Signal>,
    pub(crate) tracer: Tracer,
}

impl Shared {
    pub(crate) fn cx(&mut self, now: HostTime) -> Cx<'_> {
        Cx {
            now,
            store: &mut self.store,
            timers: &mut self.timers,
            changes: &mut self.changes,
            signals: &mut self.signals,
            tracer: &mut self.tracer,
        }
    }
}

/// Borrowed view of [`Shared`] stamped with the operation's time.
pub(crate) struct Cx<'a> {
    pub(crate) now: HostTime,
    pub(crate) store: &'a mut ElementStore,
    pub(crate) timers: &'a mut TimerQueue,
    pub(crate) changes: &'a mut StateChanges,
    pub(crate) signals: &'a mut Vec<Signal>,
    pub(crate) tracer: &'a mut Tracer,
}

impl Cx<'_> {
    pub(crate) fn signal(&mut self, signal: Signal) {
        self.tracer.signal(&SignalEvent {
            signal,
            at: self.now,
        });
        self.signals.push(signal);
    }
}
