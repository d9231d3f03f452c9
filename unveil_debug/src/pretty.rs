// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds.

use std::io::Write;

use unveil_core::backend::Capability;
use unveil_core::time::{Duration, HostTime};
use unveil_core::trace::{
    ConnectorEvent, DegradedEvent, InvalidReferenceEvent, LifecycleEvent, LoadAttemptEvent,
    LoadTimeoutEvent, ModeEvent, RegisteredEvent, RetryScheduledEvent, RevealScheduledEvent,
    SignalEvent, StaleCompletionEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.ticks() as f64 / 1000.0
}

fn span_ms(d: Duration) -> f64 {
    d.ticks() as f64 / 1000.0
}

fn capability_name(capability: Capability) -> &'static str {
    match capability {
        Capability::Visibility => "visibility",
        Capability::Insertions => "insertions",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[lifecycle] {:?} -> {:?} at {:.3}ms",
            e.from,
            e.to,
            ms(e.at),
        );
    }

    fn on_mode(&mut self, e: &ModeEvent) {
        let _ = writeln!(
            self.writer,
            "[mode] {:?} reduced_motion={} static={} at {:.3}ms",
            e.mode,
            e.reduced_motion,
            e.static_root,
            ms(e.at),
        );
    }

    fn on_degraded(&mut self, e: &DegradedEvent) {
        let _ = writeln!(
            self.writer,
            "[degraded] {} unsupported at {:.3}ms",
            capability_name(e.capability),
            ms(e.at),
        );
    }

    fn on_registered(&mut self, e: &RegisteredEvent) {
        let _ = writeln!(
            self.writer,
            "[register] element={} key={} ordinal={} reveal={} resource={}",
            e.element.index(),
            e.key.0,
            e.ordinal,
            e.reveal,
            e.has_resource,
        );
    }

    fn on_invalid_reference(&mut self, e: &InvalidReferenceEvent) {
        let _ = writeln!(
            self.writer,
            "[invalid-ref] key={} {} at {:.3}ms",
            e.key.0,
            e.error,
            ms(e.at),
        );
    }

    fn on_reveal_scheduled(&mut self, e: &RevealScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[reveal:scheduled] element={} due={:.3}ms",
            e.element.index(),
            ms(e.due),
        );
    }

    fn on_connector(&mut self, e: &ConnectorEvent) {
        let _ = writeln!(
            self.writer,
            "[connector] element={} at {:.3}ms",
            e.element.index(),
            ms(e.at),
        );
    }

    fn on_load_attempt(&mut self, e: &LoadAttemptEvent) {
        let _ = writeln!(
            self.writer,
            "[load] element={} seq={} attempt={} at {:.3}ms",
            e.ticket.element.index(),
            e.ticket.sequence,
            e.ticket.attempt,
            ms(e.at),
        );
    }

    fn on_retry_scheduled(&mut self, e: &RetryScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[load:retry] element={} failed_attempt={} wait={:.3}ms",
            e.element.index(),
            e.failed_attempt,
            span_ms(e.delay),
        );
    }

    fn on_load_timeout(&mut self, e: &LoadTimeoutEvent) {
        let _ = writeln!(
            self.writer,
            "[load:timeout] element={} attempt={} at {:.3}ms",
            e.ticket.element.index(),
            e.ticket.attempt,
            ms(e.at),
        );
    }

    fn on_stale_completion(&mut self, e: &StaleCompletionEvent) {
        let _ = writeln!(
            self.writer,
            "[load:stale] element={} seq={} attempt={}",
            e.ticket.element.index(),
            e.ticket.sequence,
            e.ticket.attempt,
        );
    }

    fn on_signal(&mut self, e: &SignalEvent) {
        match e.signal.element() {
            Some(element) => {
                let _ = writeln!(
                    self.writer,
                    "[signal] {} element={} at {:.3}ms",
                    e.signal.name(),
                    element.index(),
                    ms(e.at),
                );
            }
            None => {
                let _ = writeln!(
                    self.writer,
                    "[signal] {} at {:.3}ms",
                    e.signal.name(),
                    ms(e.at),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unveil_core::element::ElementId;
    use unveil_core::loader::LoadTicket;
    use unveil_core::signal::Signal;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn pretty_print_retry() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_retry_scheduled(&RetryScheduledEvent {
            element: ElementId::from_index(3),
            failed_attempt: 2,
            delay: Duration::from_millis(2_000),
            at: HostTime::from_millis(1_500),
        });
        let output = output(sink);
        assert!(output.contains("[load:retry]"), "got: {output}");
        assert!(output.contains("element=3"), "got: {output}");
        assert!(output.contains("wait=2000.000ms"), "got: {output}");
    }

    #[test]
    fn pretty_print_signals() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_signal(&SignalEvent {
            signal: Signal::SequenceComplete,
            at: HostTime::from_millis(300),
        });
        sink.on_load_attempt(&LoadAttemptEvent {
            ticket: LoadTicket {
                element: ElementId::from_index(1),
                sequence: 0,
                attempt: 1,
            },
            at: HostTime(0),
        });
        let output = output(sink);
        assert!(
            output.contains("[signal] sequence-complete at 300.000ms"),
            "got: {output}"
        );
        assert!(output.contains("attempt=1"), "got: {output}");
    }
}
