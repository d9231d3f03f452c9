// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios on the simulated platform.

extern crate std;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;
use unveil_core::config::{OrchestratorConfig, Selector};
use unveil_core::element::{Fallback, LoadState, NodeKey};
use unveil_core::loader::LoadFailure;
use unveil_core::orchestrator::{Mode, Orchestrator, Phase};
use unveil_core::signal::Signal;
use unveil_core::time::{Duration, HostTime};
use unveil_debug::pretty::PrettyPrintSink;

use crate::document::{SimDocument, SimNode};
use crate::platform::{Presentation, SimPlatform};
use crate::sim::Simulation;

const FOLD: f64 = 2_000.0;

fn config() -> OrchestratorConfig {
    OrchestratorConfig::new(vec![
        Selector::reveal(".card"),
        Selector::lazy(".img"),
        Selector::both(".hero"),
    ])
}

/// A 50px-tall box whose top edge is at `y`.
fn at(y: f64) -> Rect {
    Rect::new(0.0, y, 200.0, y + 50.0)
}

fn card(key: u64, y: f64) -> SimNode {
    SimNode::new(key, ".card", at(y))
}

fn img(key: u64, y: f64) -> SimNode {
    SimNode::new(key, ".img", at(y)).with_resource(alloc::format!("img-{key}.png"))
}

fn hero(key: u64, y: f64) -> SimNode {
    SimNode::new(key, ".hero", at(y)).with_resource(alloc::format!("hero-{key}.jpg"))
}

fn document(nodes: Vec<SimNode>) -> SimDocument {
    let mut doc = SimDocument::new(800.0, 600.0);
    for node in nodes {
        doc.push(node);
    }
    doc
}

fn start(config: OrchestratorConfig, platform: SimPlatform) -> Simulation {
    let mut sim = Simulation::new(config, platform).unwrap();
    sim.initialize().unwrap();
    sim
}

fn presented(sim: &Simulation, key: u64, what: Presentation) -> Vec<HostTime> {
    sim.platform()
        .presented()
        .iter()
        .filter(|p| p.key == NodeKey(key) && p.what == what)
        .map(|p| p.at)
        .collect()
}

fn count_signals(sim: &Simulation, name: &str) -> usize {
    sim.platform()
        .signals()
        .iter()
        .filter(|(_, s)| s.name() == name)
        .count()
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

// ---------------------------------------------------------------------------
// Reveal
// ---------------------------------------------------------------------------

#[test]
fn reveal_happens_at_most_once() {
    let nodes = vec![card(1, 100.0), card(2, 200.0), card(3, 300.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));

    for _ in 0..3 {
        sim.scroll_to(FOLD);
        sim.advance(ms(50));
        sim.scroll_to(0.0);
        sim.advance(ms(50));
    }
    sim.advance(ms(1_000));

    for key in 1..=3 {
        assert_eq!(
            presented(&sim, key, Presentation::Revealed).len(),
            1,
            "card {key} revealed exactly once"
        );
    }
    assert_eq!(count_signals(&sim, "reveal-complete"), 3);
    assert_eq!(count_signals(&sim, "entered-view"), 3);
    assert_eq!(count_signals(&sim, "sequence-complete"), 1);
    assert!(sim.orchestrator().is_sequence_complete(), "all targets revealed");
}

#[test]
fn batch_reveals_follow_stagger_order() {
    let nodes = vec![
        card(1, 100.0),
        card(2, 160.0),
        card(3, 220.0),
        card(4, 280.0),
    ];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    sim.advance(ms(1_000));

    let times: Vec<HostTime> = (1..=4)
        .map(|key| presented(&sim, key, Presentation::Revealed)[0])
        .collect();
    assert_eq!(
        times,
        [
            HostTime::from_millis(0),
            HostTime::from_millis(100),
            HostTime::from_millis(200),
            HostTime::from_millis(300),
        ]
    );
}

#[test]
fn each_selector_group_staggers_on_its_own() {
    let nodes = vec![card(1, 100.0), hero(2, 160.0), card(3, 220.0), hero(4, 280.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    sim.advance(ms(1_000));

    let times: Vec<HostTime> = (1..=4)
        .map(|key| presented(&sim, key, Presentation::Revealed)[0])
        .collect();
    assert_eq!(
        times,
        [
            HostTime::from_millis(0),
            HostTime::from_millis(0),
            HostTime::from_millis(100),
            HostTime::from_millis(100),
        ],
        "cards and heroes count their positions separately"
    );
}

#[test]
fn last_timer_cancels_the_platform_wakeup() {
    let nodes = vec![card(1, 100.0), card(2, 160.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    assert_eq!(sim.platform().wakeup(), Some(HostTime::from_millis(100)));

    let orchestrator = sim.orchestrator_mut();
    orchestrator.platform_mut().set_now(HostTime::from_millis(100));
    orchestrator.poll_timers();
    assert_eq!(orchestrator.next_deadline(), None, "queue drained");
    assert_eq!(
        sim.platform().wakeup(),
        None,
        "spent wakeup is cancelled, not left armed"
    );
    assert_eq!(presented(&sim, 2, Presentation::Revealed).len(), 1);
}

#[test]
fn declared_ordinal_overrides_document_order() {
    let nodes = vec![
        card(1, 100.0).with_ordinal(2),
        card(2, 160.0).with_ordinal(0),
    ];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    sim.advance(ms(1_000));

    assert_eq!(
        presented(&sim, 2, Presentation::Revealed),
        [HostTime::from_millis(0)]
    );
    assert_eq!(
        presented(&sim, 1, Presentation::Revealed),
        [HostTime::from_millis(200)]
    );
}

#[test]
fn stagger_is_relative_to_entry() {
    let nodes = vec![card(1, 100.0), card(2, FOLD + 100.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    sim.advance(ms(1_000));
    assert!(
        presented(&sim, 2, Presentation::Revealed).is_empty(),
        "below the fold"
    );

    sim.scroll_to(FOLD);
    sim.advance(ms(1_000));
    assert_eq!(
        presented(&sim, 2, Presentation::Revealed),
        [HostTime::from_millis(1_100)],
        "ordinal 1 waits one interval after entering"
    );
}

#[test]
fn connector_follows_its_reveal() {
    let nodes = vec![card(1, 100.0).with_connector(), card(2, 200.0).with_connector()];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    sim.advance(ms(1_000));

    assert_eq!(
        presented(&sim, 1, Presentation::Connector),
        [HostTime::from_millis(150)]
    );
    assert_eq!(
        presented(&sim, 2, Presentation::Connector),
        [HostTime::from_millis(250)]
    );
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn backoff_grows_and_stops_after_max_retries() {
    let config = config().with_retries(3, ms(1_000), ms(3_000));
    let mut sim = start(config, SimPlatform::new(document(vec![img(1, 100.0)])));

    let mut waits = Vec::new();
    loop {
        let Some(ticket) = sim.platform().in_flight().next() else {
            break;
        };
        let failed_at = sim.now();
        sim.resolve(ticket, Err(LoadFailure::Network));
        sim.advance(ms(60_000));
        if let Some(next) = sim.platform().started().last()
            && next.ticket != ticket
        {
            waits.push(next.at - failed_at);
        }
    }

    assert_eq!(waits, [ms(1_000), ms(2_000), ms(3_000)], "capped at ceiling");
    let attempts: Vec<u32> = sim
        .platform()
        .started()
        .iter()
        .map(|s| s.ticket.attempt)
        .collect();
    assert_eq!(attempts, [1, 2, 3, 4], "max_retries + 1 attempts in total");

    let element = sim.element(1).unwrap();
    let store = sim.orchestrator().store();
    assert_eq!(store.load_state(element), LoadState::Errored);
    assert_eq!(store.fallback(element), Some(Fallback::TERMINAL));
    assert_eq!(presented(&sim, 1, Presentation::Errored).len(), 1);
    assert!(
        sim.platform().signals().iter().any(|(_, s)| *s
            == Signal::LoadError {
                element,
                attempts: 4
            }),
        "final attempt count reported"
    );
}

#[test]
fn load_is_started_once() {
    let mut sim = start(config(), SimPlatform::new(document(vec![hero(1, 100.0)])));
    assert_eq!(sim.platform().started().len(), 1, "visible hero starts loading");

    sim.scroll_to(FOLD);
    sim.scroll_to(0.0);
    assert_eq!(sim.refresh(), Ok(0));
    assert_eq!(sim.reset_element(1), Ok(false), "not errored");
    assert_eq!(sim.platform().started().len(), 1, "still one attempt");

    assert_eq!(sim.resolve_in_flight(Ok(())), 1);
    let element = sim.element(1).unwrap();
    assert_eq!(sim.orchestrator().store().load_state(element), LoadState::Loaded);
    assert!(
        !sim.orchestrator().store().flags(element).placeholder,
        "placeholder cleared"
    );
    assert_eq!(count_signals(&sim, "load-success"), 1);

    sim.scroll_to(FOLD);
    sim.scroll_to(0.0);
    assert_eq!(sim.platform().started().len(), 1, "loaded stays loaded");
}

#[test]
fn load_waits_for_visibility() {
    let nodes = vec![img(1, 100.0), img(2, FOLD + 100.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    let below = sim.element(2).unwrap();
    assert_eq!(sim.platform().started().len(), 1);
    assert_eq!(
        sim.orchestrator().store().load_state(below),
        LoadState::Idle
    );
    assert!(sim.orchestrator().store().flags(below).placeholder, "placeholder applied");

    sim.scroll_to(FOLD);
    assert_eq!(sim.platform().started().len(), 2);
    assert_eq!(sim.platform().started()[1].ticket.element, below);
}

#[test]
fn timed_out_attempt_is_retried_and_its_late_completion_ignored() {
    let config = config()
        .with_load_timeout(Some(ms(500)))
        .with_retries(1, ms(1_000), ms(8_000));
    let mut sim = start(config, SimPlatform::new(document(vec![img(1, 100.0)])));
    let first = sim.platform().started()[0].ticket;

    sim.advance(ms(500));
    assert_eq!(sim.platform().cancelled(), [first], "timed-out attempt abandoned");

    sim.resolve(first, Ok(()));
    let element = sim.element(1).unwrap();
    assert_eq!(
        sim.orchestrator().store().load_state(element),
        LoadState::Loading,
        "late success of the timed-out attempt is stale"
    );

    sim.advance(ms(1_000));
    let second = sim.platform().started()[1];
    assert_eq!(second.at, HostTime::from_millis(1_500));
    assert_eq!(second.ticket.attempt, 2);

    sim.resolve(second.ticket, Ok(()));
    assert_eq!(sim.orchestrator().store().load_state(element), LoadState::Loaded);
}

#[test]
fn reset_element_starts_a_new_sequence() {
    let config = config().with_retries(0, ms(1_000), ms(8_000));
    let mut sim = start(config, SimPlatform::new(document(vec![img(1, 100.0)])));
    sim.resolve_in_flight(Err(LoadFailure::Decode));
    let element = sim.element(1).unwrap();
    assert_eq!(sim.orchestrator().store().load_state(element), LoadState::Errored);
    assert_eq!(sim.platform().started().len(), 1, "no retries configured");

    assert_eq!(sim.reset_element(1), Ok(true));
    assert_eq!(presented(&sim, 1, Presentation::Reset).len(), 1);
    assert_eq!(sim.orchestrator().store().fallback(element), None);

    let again = sim.platform().started()[1].ticket;
    assert_eq!(again.attempt, 1);
    assert_eq!(again.sequence, 1, "new load sequence");
    sim.resolve(again, Ok(()));
    assert_eq!(sim.orchestrator().store().load_state(element), LoadState::Loaded);
}

// ---------------------------------------------------------------------------
// Overrides and degradation
// ---------------------------------------------------------------------------

#[test]
fn reduced_motion_reveals_everything_before_any_timer() {
    let nodes = vec![
        card(1, 100.0),
        card(2, 200.0),
        card(3, 300.0),
        card(4, FOLD + 100.0),
        hero(5, FOLD + 300.0),
    ];
    let platform = SimPlatform::new(document(nodes)).with_reduced_motion(true);
    let sim = start(config(), platform);

    assert_eq!(sim.orchestrator().mode(), Mode::EagerReveal);
    for key in 1..=5 {
        assert_eq!(
            presented(&sim, key, Presentation::Revealed),
            [HostTime(0)],
            "element {key} revealed at initialization"
        );
    }
    assert_eq!(count_signals(&sim, "sequence-complete"), 1);
    assert_eq!(sim.platform().wakeup(), None, "no reveal timers armed");
    assert!(
        sim.platform().started().is_empty(),
        "hero below the fold still waits to load"
    );

    let mut sim = sim;
    sim.scroll_to(FOLD);
    assert_eq!(sim.platform().started().len(), 1, "loads on visibility");
}

#[test]
fn reduced_motion_can_be_ignored() {
    let platform = SimPlatform::new(document(vec![card(1, 100.0), card(2, 200.0)]))
        .with_reduced_motion(true);
    let sim = start(config().with_reduced_motion(false), platform);
    assert_eq!(sim.orchestrator().mode(), Mode::Deferred);
    assert!(presented(&sim, 2, Presentation::Revealed).is_empty(), "staggered");
}

#[test]
fn switching_to_reduced_motion_completes_pending_reveals() {
    let nodes = vec![
        card(1, 100.0).with_connector(),
        card(2, 200.0),
        card(3, 300.0),
    ];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    assert!(sim.platform().wakeup().is_some(), "stagger pending");

    sim.advance(ms(10));
    sim.set_reduced_motion(true);
    assert_eq!(sim.orchestrator().mode(), Mode::EagerReveal);
    for key in 2..=3 {
        assert_eq!(
            presented(&sim, key, Presentation::Revealed),
            [HostTime::from_millis(10)]
        );
    }
    assert_eq!(
        presented(&sim, 1, Presentation::Connector),
        [HostTime::from_millis(10)],
        "pending connector flushed"
    );
    assert_eq!(sim.platform().wakeup(), None);
}

#[test]
fn static_root_reveals_and_loads_everything() {
    let nodes = vec![card(1, FOLD), img(2, FOLD * 2.0), hero(3, FOLD * 3.0)];
    let platform = SimPlatform::new(document(nodes)).with_static_root();
    let sim = start(config(), platform);

    assert_eq!(sim.orchestrator().mode(), Mode::Eager);
    assert_eq!(sim.platform().observed_len(), 0, "nothing observed");
    assert_eq!(presented(&sim, 1, Presentation::Revealed), [HostTime(0)]);
    assert_eq!(presented(&sim, 3, Presentation::Revealed), [HostTime(0)]);
    assert_eq!(sim.platform().started().len(), 2, "both resources requested");
}

#[test]
fn missing_visibility_primitive_degrades_to_eager() {
    let nodes = vec![card(1, FOLD), card(2, FOLD + 100.0), img(3, FOLD * 2.0)];
    let platform = SimPlatform::new(document(nodes)).without_visibility();
    let mut sim = start(config(), platform);

    assert_eq!(sim.orchestrator().mode(), Mode::Eager);
    assert_eq!(sim.orchestrator().phase(), Phase::Active);
    assert_eq!(presented(&sim, 2, Presentation::Revealed), [HostTime(0)]);
    assert_eq!(sim.platform().started().len(), 1);

    assert_eq!(sim.insert(img(4, FOLD * 3.0)), 1);
    assert_eq!(sim.platform().started().len(), 2, "inserted content loads at once");
}

// ---------------------------------------------------------------------------
// Dynamic content
// ---------------------------------------------------------------------------

#[test]
fn inserted_content_is_watched_without_refresh() {
    let mut sim = start(config(), SimPlatform::new(document(vec![card(1, 100.0)])));

    assert_eq!(sim.insert(card(2, FOLD + 100.0)), 1);
    let inserted = sim.element(2).unwrap();
    assert!(sim.platform().is_observing(inserted), "registered for visibility");
    assert_eq!(sim.insert(SimNode::new(3, ".footer", at(0.0))), 0);
    assert_eq!(sim.insert(card(1, 100.0)), 0, "already tracked");

    sim.scroll_to(FOLD);
    sim.advance(ms(500));
    assert_eq!(presented(&sim, 2, Presentation::Revealed).len(), 1);

    assert_eq!(sim.insert(img(4, FOLD + 200.0)), 1);
    assert_eq!(sim.platform().started().len(), 1, "visible insert loads");
}

#[test]
fn without_insertion_source_refresh_picks_up_content() {
    let platform = SimPlatform::new(document(vec![card(1, 100.0)])).without_insertions();
    let mut sim = start(config(), platform);

    assert_eq!(sim.insert(card(2, 200.0)), 0, "nobody reports the insertion");
    assert_eq!(sim.element(2), None);
    assert_eq!(sim.refresh(), Ok(1));
    sim.advance(ms(500));
    assert_eq!(presented(&sim, 2, Presentation::Revealed).len(), 1);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn destroy_makes_pending_work_inert() {
    let nodes = vec![img(1, 100.0), img(2, 200.0), card(3, 300.0), card(4, 400.0)];
    let mut sim = start(config(), SimPlatform::new(document(nodes)));
    let failing = sim.platform().started()[0].ticket;
    let in_flight = sim.platform().started()[1].ticket;
    sim.resolve(failing, Err(LoadFailure::Network));
    assert!(sim.platform().wakeup().is_some(), "retry and stagger pending");

    sim.destroy().unwrap();
    assert_eq!(sim.orchestrator().phase(), Phase::Destroyed);
    assert_eq!(sim.platform().wakeup(), None, "wakeup cancelled");
    assert_eq!(sim.platform().cancelled(), [in_flight]);
    assert_eq!(sim.platform().observed_len(), 0);
    assert!(sim.platform().insertion_selection().is_none(), "observer gone");

    let presented_before = sim.platform().presented().len();
    let signals_before = sim.platform().signals().len();
    let started_before = sim.platform().started().len();

    sim.advance(ms(10_000));
    sim.orchestrator_mut().poll_timers();
    sim.resolve(in_flight, Ok(()));
    sim.scroll_to(FOLD);
    assert_eq!(sim.insert(card(5, 100.0)), 0);

    assert_eq!(sim.platform().presented().len(), presented_before);
    assert_eq!(sim.platform().signals().len(), signals_before);
    assert_eq!(sim.platform().started().len(), started_before);
    assert!(sim.orchestrator().store().is_empty(), "registrations dropped");
    assert!(sim.refresh().is_err(), "no refresh after destroy");
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn trace_sink_sees_retry_story() {
    let buf = SharedBuf::default();
    let platform = SimPlatform::new(document(vec![img(1, 100.0)]));
    let orchestrator = Orchestrator::new(config(), platform)
        .unwrap()
        .with_trace_sink(Box::new(PrettyPrintSink::new(Box::new(buf.clone()))));
    let mut sim = Simulation::from_orchestrator(orchestrator);
    sim.initialize().unwrap();
    sim.resolve_in_flight(Err(LoadFailure::Network));
    sim.advance(ms(1_000));
    sim.resolve_in_flight(Ok(()));

    let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
    assert!(text.contains("[mode] Deferred"), "got: {text}");
    assert!(text.contains("[load:retry] element=0 failed_attempt=1 wait=1000.000ms"), "got: {text}");
    assert!(text.contains("[signal] load-success element=0"), "got: {text}");
}
