// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Element-scoped events land on one track per element (`tid` is the element
//! index plus one); orchestrator-wide events use track 0.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use unveil_core::element::ElementId;
use unveil_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Stagger waits and retry backoffs become duration (`"X"`) events so the
/// cascade is visible as bars; everything else is an instant event.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let event = match recorded {
            RecordedEvent::Lifecycle(e) => instant(
                "Lifecycle",
                "Orchestrator",
                e.at,
                0,
                json!({
                    "from": format!("{:?}", e.from),
                    "to": format!("{:?}", e.to),
                }),
            ),
            RecordedEvent::Mode(e) => instant(
                "Mode",
                "Orchestrator",
                e.at,
                0,
                json!({
                    "mode": format!("{:?}", e.mode),
                    "reduced_motion": e.reduced_motion,
                    "static": e.static_root,
                }),
            ),
            RecordedEvent::Degraded(e) => instant(
                "Degraded",
                "Orchestrator",
                e.at,
                0,
                json!({ "capability": format!("{:?}", e.capability) }),
            ),
            RecordedEvent::Registered(e) => instant(
                "Registered",
                "Element",
                e.at,
                track(e.element),
                json!({
                    "key": e.key.0,
                    "ordinal": e.ordinal,
                    "reveal": e.reveal,
                    "has_resource": e.has_resource,
                }),
            ),
            RecordedEvent::InvalidReference(e) => instant(
                "InvalidReference",
                "Element",
                e.at,
                0,
                json!({
                    "key": e.key.0,
                    "error": e.error.to_string(),
                }),
            ),
            RecordedEvent::RevealScheduled(e) => json!({
                "ph": "X",
                "name": "StaggerWait",
                "cat": "Reveal",
                "ts": us(e.at),
                "dur": us(e.due) - us(e.at),
                "pid": 0,
                "tid": track(e.element),
            }),
            RecordedEvent::Connector(e) => instant(
                "Connector",
                "Reveal",
                e.at,
                track(e.element),
                Value::Null,
            ),
            RecordedEvent::LoadAttempt(e) => instant(
                "LoadAttempt",
                "Load",
                e.at,
                track(e.ticket.element),
                json!({
                    "sequence": e.ticket.sequence,
                    "attempt": e.ticket.attempt,
                }),
            ),
            RecordedEvent::RetryScheduled(e) => json!({
                "ph": "X",
                "name": "Backoff",
                "cat": "Load",
                "ts": us(e.at),
                "dur": e.delay.ticks() as f64,
                "pid": 0,
                "tid": track(e.element),
                "args": { "failed_attempt": e.failed_attempt },
            }),
            RecordedEvent::LoadTimeout(e) => instant(
                "LoadTimeout",
                "Load",
                e.at,
                track(e.ticket.element),
                json!({ "attempt": e.ticket.attempt }),
            ),
            RecordedEvent::StaleCompletion(e) => instant(
                "StaleCompletion",
                "Load",
                e.at,
                track(e.ticket.element),
                json!({
                    "sequence": e.ticket.sequence,
                    "attempt": e.ticket.attempt,
                }),
            ),
            RecordedEvent::Signal(e) => instant(
                e.signal.name(),
                "Signal",
                e.at,
                e.signal.element().map_or(0, track),
                Value::Null,
            ),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, at: HostTime, tid: u64, args: Value) -> Value {
    let mut event = json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": us(at),
        "pid": 0,
        "tid": tid,
        "s": if tid == 0 { "p" } else { "t" },
    });
    if !args.is_null() {
        event["args"] = args;
    }
    event
}

fn track(element: ElementId) -> u64 {
    u64::from(element.index()) + 1
}

fn us(t: HostTime) -> f64 {
    t.ticks() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use unveil_core::orchestrator::Phase;
    use unveil_core::signal::Signal;
    use unveil_core::trace::{LifecycleEvent, RevealScheduledEvent, SignalEvent, TraceSink};

    #[test]
    fn export_produces_valid_json() {
        let element = ElementId::from_index(2);
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            from: Phase::Initializing,
            to: Phase::Active,
            at: HostTime::from_millis(1),
        });
        rec.on_reveal_scheduled(&RevealScheduledEvent {
            element,
            due: HostTime::from_millis(301),
            at: HostTime::from_millis(1),
        });
        rec.on_signal(&SignalEvent {
            signal: Signal::RevealComplete(element),
            at: HostTime::from_millis(301),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Lifecycle");
        assert_eq!(parsed[0]["args"]["to"], "Active");

        assert_eq!(parsed[1]["ph"], "X");
        assert_eq!(parsed[1]["dur"], 300_000.0);
        assert_eq!(parsed[1]["tid"], 3);

        assert_eq!(parsed[2]["name"], "reveal-complete");
        assert_eq!(parsed[2]["tid"], 3);
        assert!(parsed[2].get("args").is_none(), "signal carries no args");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
