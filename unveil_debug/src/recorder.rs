// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed by a one-byte
//! tag. [`decode`] reads them back as an iterator of [`RecordedEvent`];
//! iteration stops at the first unknown tag or truncated record.

use unveil_core::backend::Capability;
use unveil_core::element::{ElementId, NodeKey};
use unveil_core::loader::{LoadTicket, ResourceError};
use unveil_core::orchestrator::{Mode, Phase};
use unveil_core::signal::Signal;
use unveil_core::time::{Duration, HostTime};
use unveil_core::trace::{
    ConnectorEvent, DegradedEvent, InvalidReferenceEvent, LifecycleEvent, LoadAttemptEvent,
    LoadTimeoutEvent, ModeEvent, RegisteredEvent, RetryScheduledEvent, RevealScheduledEvent,
    SignalEvent, StaleCompletionEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LIFECYCLE: u8 = 1;
const TAG_MODE: u8 = 2;
const TAG_DEGRADED: u8 = 3;
const TAG_REGISTERED: u8 = 4;
const TAG_INVALID_REFERENCE: u8 = 5;
const TAG_REVEAL_SCHEDULED: u8 = 6;
const TAG_CONNECTOR: u8 = 7;
const TAG_LOAD_ATTEMPT: u8 = 8;
const TAG_RETRY_SCHEDULED: u8 = 9;
const TAG_LOAD_TIMEOUT: u8 = 10;
const TAG_STALE_COMPLETION: u8 = 11;
const TAG_SIGNAL: u8 = 12;

const SIGNAL_ENTERED_VIEW: u8 = 0;
const SIGNAL_REVEAL_COMPLETE: u8 = 1;
const SIGNAL_SEQUENCE_COMPLETE: u8 = 2;
const SIGNAL_LOAD_SUCCESS: u8 = 3;
const SIGNAL_LOAD_ERROR: u8 = 4;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.ticks());
    }

    fn write_element(&mut self, e: ElementId) {
        self.write_u32(e.index());
    }

    fn write_ticket(&mut self, t: LoadTicket) {
        self.write_element(t.element);
        self.write_u32(t.sequence);
        self.write_u32(t.attempt);
    }

    fn write_phase(&mut self, p: Phase) {
        self.write_u8(match p {
            Phase::Uninitialized => 0,
            Phase::Initializing => 1,
            Phase::Active => 2,
            Phase::Destroyed => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_phase(e.from);
        self.write_phase(e.to);
        self.write_time(e.at);
    }

    fn on_mode(&mut self, e: &ModeEvent) {
        self.write_u8(TAG_MODE);
        self.write_u8(match e.mode {
            Mode::Deferred => 0,
            Mode::EagerReveal => 1,
            Mode::Eager => 2,
        });
        self.write_bool(e.reduced_motion);
        self.write_bool(e.static_root);
        self.write_time(e.at);
    }

    fn on_degraded(&mut self, e: &DegradedEvent) {
        self.write_u8(TAG_DEGRADED);
        self.write_u8(match e.capability {
            Capability::Visibility => 0,
            Capability::Insertions => 1,
        });
        self.write_time(e.at);
    }

    fn on_registered(&mut self, e: &RegisteredEvent) {
        self.write_u8(TAG_REGISTERED);
        self.write_element(e.element);
        self.write_u64(e.key.0);
        self.write_u32(e.ordinal);
        self.write_bool(e.reveal);
        self.write_bool(e.has_resource);
        self.write_time(e.at);
    }

    fn on_invalid_reference(&mut self, e: &InvalidReferenceEvent) {
        self.write_u8(TAG_INVALID_REFERENCE);
        self.write_u64(e.key.0);
        match e.error {
            ResourceError::Empty => {
                self.write_u8(0);
                self.write_u32(0);
            }
            ResourceError::InvalidCharacter(c) => {
                self.write_u8(1);
                self.write_u32(u32::from(c));
            }
        }
        self.write_time(e.at);
    }

    fn on_reveal_scheduled(&mut self, e: &RevealScheduledEvent) {
        self.write_u8(TAG_REVEAL_SCHEDULED);
        self.write_element(e.element);
        self.write_time(e.due);
        self.write_time(e.at);
    }

    fn on_connector(&mut self, e: &ConnectorEvent) {
        self.write_u8(TAG_CONNECTOR);
        self.write_element(e.element);
        self.write_time(e.at);
    }

    fn on_load_attempt(&mut self, e: &LoadAttemptEvent) {
        self.write_u8(TAG_LOAD_ATTEMPT);
        self.write_ticket(e.ticket);
        self.write_time(e.at);
    }

    fn on_retry_scheduled(&mut self, e: &RetryScheduledEvent) {
        self.write_u8(TAG_RETRY_SCHEDULED);
        self.write_element(e.element);
        self.write_u32(e.failed_attempt);
        self.write_u64(e.delay.ticks());
        self.write_time(e.at);
    }

    fn on_load_timeout(&mut self, e: &LoadTimeoutEvent) {
        self.write_u8(TAG_LOAD_TIMEOUT);
        self.write_ticket(e.ticket);
        self.write_time(e.at);
    }

    fn on_stale_completion(&mut self, e: &StaleCompletionEvent) {
        self.write_u8(TAG_STALE_COMPLETION);
        self.write_ticket(e.ticket);
        self.write_time(e.at);
    }

    fn on_signal(&mut self, e: &SignalEvent) {
        self.write_u8(TAG_SIGNAL);
        let (kind, element, attempts) = match e.signal {
            Signal::EnteredView(id) => (SIGNAL_ENTERED_VIEW, id.index(), 0),
            Signal::RevealComplete(id) => (SIGNAL_REVEAL_COMPLETE, id.index(), 0),
            Signal::SequenceComplete => (SIGNAL_SEQUENCE_COMPLETE, 0, 0),
            Signal::LoadSuccess(id) => (SIGNAL_LOAD_SUCCESS, id.index(), 0),
            Signal::LoadError { element, attempts } => {
                (SIGNAL_LOAD_ERROR, element.index(), attempts)
            }
        };
        self.write_u8(kind);
        self.write_u32(element);
        self.write_u32(attempts);
        self.write_time(e.at);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// A [`ModeEvent`].
    Mode(ModeEvent),
    /// A [`DegradedEvent`].
    Degraded(DegradedEvent),
    /// A [`RegisteredEvent`].
    Registered(RegisteredEvent),
    /// An [`InvalidReferenceEvent`].
    InvalidReference(InvalidReferenceEvent),
    /// A [`RevealScheduledEvent`].
    RevealScheduled(RevealScheduledEvent),
    /// A [`ConnectorEvent`].
    Connector(ConnectorEvent),
    /// A [`LoadAttemptEvent`].
    LoadAttempt(LoadAttemptEvent),
    /// A [`RetryScheduledEvent`].
    RetryScheduled(RetryScheduledEvent),
    /// A [`LoadTimeoutEvent`].
    LoadTimeout(LoadTimeoutEvent),
    /// A [`StaleCompletionEvent`].
    StaleCompletion(StaleCompletionEvent),
    /// A [`SignalEvent`].
    Signal(SignalEvent),
}

impl RecordedEvent {
    /// Time the event was recorded at.
    #[must_use]
    pub fn at(&self) -> HostTime {
        match self {
            Self::Lifecycle(e) => e.at,
            Self::Mode(e) => e.at,
            Self::Degraded(e) => e.at,
            Self::Registered(e) => e.at,
            Self::InvalidReference(e) => e.at,
            Self::RevealScheduled(e) => e.at,
            Self::Connector(e) => e.at,
            Self::LoadAttempt(e) => e.at,
            Self::RetryScheduled(e) => e.at,
            Self::LoadTimeout(e) => e.at,
            Self::StaleCompletion(e) => e.at,
            Self::Signal(e) => e.at,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_element(&mut self) -> Option<ElementId> {
        self.read_u32().map(ElementId::from_index)
    }

    fn read_ticket(&mut self) -> Option<LoadTicket> {
        Some(LoadTicket {
            element: self.read_element()?,
            sequence: self.read_u32()?,
            attempt: self.read_u32()?,
        })
    }

    fn read_phase(&mut self) -> Option<Phase> {
        Some(match self.read_u8()? {
            0 => Phase::Uninitialized,
            1 => Phase::Initializing,
            2 => Phase::Active,
            _ => Phase::Destroyed,
        })
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LifecycleEvent {
            from: self.read_phase()?,
            to: self.read_phase()?,
            at: self.read_time()?,
        }))
    }

    fn decode_mode(&mut self) -> Option<RecordedEvent> {
        let mode = match self.read_u8()? {
            0 => Mode::Deferred,
            1 => Mode::EagerReveal,
            _ => Mode::Eager,
        };
        Some(RecordedEvent::Mode(ModeEvent {
            mode,
            reduced_motion: self.read_bool()?,
            static_root: self.read_bool()?,
            at: self.read_time()?,
        }))
    }

    fn decode_degraded(&mut self) -> Option<RecordedEvent> {
        let capability = match self.read_u8()? {
            0 => Capability::Visibility,
            _ => Capability::Insertions,
        };
        Some(RecordedEvent::Degraded(DegradedEvent {
            capability,
            at: self.read_time()?,
        }))
    }

    fn decode_registered(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Registered(RegisteredEvent {
            element: self.read_element()?,
            key: NodeKey(self.read_u64()?),
            ordinal: self.read_u32()?,
            reveal: self.read_bool()?,
            has_resource: self.read_bool()?,
            at: self.read_time()?,
        }))
    }

    fn decode_invalid_reference(&mut self) -> Option<RecordedEvent> {
        let key = NodeKey(self.read_u64()?);
        let kind = self.read_u8()?;
        let raw = self.read_u32()?;
        let error = match kind {
            0 => ResourceError::Empty,
            _ => ResourceError::InvalidCharacter(char::from_u32(raw)?),
        };
        Some(RecordedEvent::InvalidReference(InvalidReferenceEvent {
            key,
            error,
            at: self.read_time()?,
        }))
    }

    fn decode_reveal_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RevealScheduled(RevealScheduledEvent {
            element: self.read_element()?,
            due: self.read_time()?,
            at: self.read_time()?,
        }))
    }

    fn decode_connector(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Connector(ConnectorEvent {
            element: self.read_element()?,
            at: self.read_time()?,
        }))
    }

    fn decode_load_attempt(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoadAttempt(LoadAttemptEvent {
            ticket: self.read_ticket()?,
            at: self.read_time()?,
        }))
    }

    fn decode_retry_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RetryScheduled(RetryScheduledEvent {
            element: self.read_element()?,
            failed_attempt: self.read_u32()?,
            delay: Duration(self.read_u64()?),
            at: self.read_time()?,
        }))
    }

    fn decode_load_timeout(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoadTimeout(LoadTimeoutEvent {
            ticket: self.read_ticket()?,
            at: self.read_time()?,
        }))
    }

    fn decode_stale_completion(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StaleCompletion(StaleCompletionEvent {
            ticket: self.read_ticket()?,
            at: self.read_time()?,
        }))
    }

    fn decode_signal(&mut self) -> Option<RecordedEvent> {
        let kind = self.read_u8()?;
        let element = ElementId::from_index(self.read_u32()?);
        let attempts = self.read_u32()?;
        let signal = match kind {
            SIGNAL_ENTERED_VIEW => Signal::EnteredView(element),
            SIGNAL_REVEAL_COMPLETE => Signal::RevealComplete(element),
            SIGNAL_SEQUENCE_COMPLETE => Signal::SequenceComplete,
            SIGNAL_LOAD_SUCCESS => Signal::LoadSuccess(element),
            SIGNAL_LOAD_ERROR => Signal::LoadError { element, attempts },
            _ => return None,
        };
        Some(RecordedEvent::Signal(SignalEvent {
            signal,
            at: self.read_time()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_MODE => self.decode_mode(),
            TAG_DEGRADED => self.decode_degraded(),
            TAG_REGISTERED => self.decode_registered(),
            TAG_INVALID_REFERENCE => self.decode_invalid_reference(),
            TAG_REVEAL_SCHEDULED => self.decode_reveal_scheduled(),
            TAG_CONNECTOR => self.decode_connector(),
            TAG_LOAD_ATTEMPT => self.decode_load_attempt(),
            TAG_RETRY_SCHEDULED => self.decode_retry_scheduled(),
            TAG_LOAD_TIMEOUT => self.decode_load_timeout(),
            TAG_STALE_COMPLETION => self.decode_stale_completion(),
            TAG_SIGNAL => self.decode_signal(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
