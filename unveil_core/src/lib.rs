// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport-triggered staged reveal and deferred resource loading.
//!
//! `unveil_core` watches a set of document elements for entry into the
//! viewport, reveals them in a staggered sequence, and materializes their
//! deferred resources with bounded retry and a deterministic fallback. It is
//! `no_std` compatible (with `alloc`) and never touches a platform directly:
//! everything platform-specific goes through the [`Platform`] contract.
//!
//! # Architecture
//!
//! The crate is organized around a single [`Orchestrator`] that owns its
//! platform and turns platform notifications into state changes:
//!
//! ```text
//!   Platform (scan, intersections, insertions, load outcomes, wakeups)
//!       │
//!       ▼
//!   Orchestrator ──► VisibilityWatcher ──► RevealScheduler
//!       │                                  ResourceLoader
//!       │                                        │
//!       │                 TimerQueue ◄───────────┘
//!       ▼
//!   StateChanges ──► Presenter::apply()      Signals ──► Platform::emit()
//! ```
//!
//! **[`element`]** — Element registry with stable handles, per-element
//! state flags, and the per-operation [`StateChanges`](element::StateChanges)
//! batch handed to presenters.
//!
//! **[`visibility`]** — One-shot viewport entry detection over a platform
//! intersection primitive. **[`geometry`]** computes intersection samples
//! from rectangles for platforms that only expose layout boxes.
//!
//! **[`reveal`]** — Staged reveal with ordinal-based stagger, connector
//! cascade, and reduced-motion completion.
//!
//! **[`loader`]** — Deferred resource loading with exponential backoff,
//! optional per-attempt timeout, and terminal fallback.
//!
//! **[`content`]** — Admission of dynamically inserted elements.
//!
//! **[`timer`]** — Deadline queue; the core asks the platform for one wakeup
//! at the earliest deadline instead of owning real timers.
//!
//! **[`orchestrator`]** — Lifecycle façade composing the above.
//!
//! **[`backend`]** — The [`Platform`] and [`Presenter`](backend::Presenter)
//! traits that platform crates implement.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//!
//! [`Platform`]: backend::Platform
//! [`Orchestrator`]: orchestrator::Orchestrator

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod config;
pub mod content;
pub mod element;
pub mod geometry;
pub mod loader;
pub mod orchestrator;
pub mod reveal;
pub mod signal;
pub mod time;
pub mod timer;
pub mod trace;
pub mod visibility;

mod context;
