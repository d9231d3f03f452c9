// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays element storage.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::candidate::Candidate;
use super::id::{ElementId, NodeKey};
use crate::loader::ResourceRef;

/// Per-element presentation flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementFlags {
    /// A deferred resource is pending; the placeholder presentation applies.
    pub placeholder: bool,
    /// The element has been revealed. Never cleared while the orchestrator
    /// is alive.
    pub revealed: bool,
    /// The element's paired connector has been activated.
    pub connector_active: bool,
}

/// Deferred-resource state of an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing requested yet (or no resource at all).
    #[default]
    Idle,
    /// An attempt is in flight or a retry is waiting for its backoff.
    Loading,
    /// The resource materialized.
    Loaded,
    /// Retries were exhausted. Terminal until explicit re-registration.
    Errored,
}

/// The terminal presentation applied when retries are exhausted.
///
/// The marker is the same regardless of which attempt failed, so callers and
/// tests can assert on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fallback {
    /// Marker the presenter applies (a class name for the web backend).
    pub marker: &'static str,
}

impl Fallback {
    /// The fallback applied to every errored element.
    pub const TERMINAL: Self = Self {
        marker: "unveil-fallback",
    };
}

/// Storage for all registered elements.
///
/// Elements are addressed by [`ElementId`] handles allocated in registration
/// order. Slots are never recycled while the store is alive;
/// [`clear`](Self::clear) drops everything at teardown.
#[derive(Debug, Default)]
pub struct ElementStore {
    // -- Identity --
    keys: Vec<NodeKey>,
    by_key: BTreeMap<NodeKey, ElementId>,

    // -- Registration snapshot --
    groups: Vec<u32>,
    ordinals: Vec<u32>,
    resources: Vec<Option<ResourceRef>>,
    reveal_target: Vec<bool>,
    connector: Vec<bool>,

    // -- State --
    flags: Vec<ElementFlags>,
    load_state: Vec<LoadState>,
    fallback: Vec<Option<Fallback>>,

    // -- Counters --
    next_ordinal: BTreeMap<u32, u32>,
    reveal_targets: u32,
    revealed: u32,
}

impl ElementStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a candidate, returning `None` if its key is already tracked.
    ///
    /// `resource` is the already-validated reference; the candidate's raw
    /// string is ignored here.
    pub(crate) fn insert(
        &mut self,
        candidate: &Candidate,
        resource: Option<ResourceRef>,
    ) -> Option<ElementId> {
        if self.by_key.contains_key(&candidate.key) {
            return None;
        }
        let id = ElementId(u32::try_from(self.keys.len()).ok()?);

        let position = self.next_ordinal.entry(candidate.group).or_insert(0);
        let ordinal = candidate.ordinal.unwrap_or(*position);
        *position = position.saturating_add(1);

        let has_resource = resource.is_some();
        self.keys.push(candidate.key);
        self.by_key.insert(candidate.key, id);
        self.groups.push(candidate.group);
        self.ordinals.push(ordinal);
        self.resources.push(resource);
        self.reveal_target.push(candidate.reveal);
        self.connector.push(candidate.connector);
        self.flags.push(ElementFlags {
            placeholder: has_resource,
            ..ElementFlags::default()
        });
        self.load_state.push(LoadState::Idle);
        self.fallback.push(None);
        if candidate.reveal {
            self.reveal_targets += 1;
        }
        Some(id)
    }

    /// Drops every registration and all attached state.
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    // -- Queries --

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over all registered handles in registration order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "insert refuses registrations beyond u32::MAX slots"
    )]
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.keys.len()).map(|idx| ElementId(idx as u32))
    }

    /// Finds the handle registered for `key`.
    #[must_use]
    pub fn lookup(&self, key: NodeKey) -> Option<ElementId> {
        self.by_key.get(&key).copied()
    }

    /// Returns `true` if `id` belongs to this store.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        (id.0 as usize) < self.keys.len()
    }

    /// Platform key of `id`.
    #[must_use]
    pub fn key(&self, id: ElementId) -> NodeKey {
        self.keys[id.0 as usize]
    }

    /// Selector group of `id`.
    #[must_use]
    pub fn group(&self, id: ElementId) -> u32 {
        self.groups[id.0 as usize]
    }

    /// Stagger position of `id`, as snapshotted at registration.
    #[must_use]
    pub fn ordinal(&self, id: ElementId) -> u32 {
        self.ordinals[id.0 as usize]
    }

    /// Validated deferred-resource reference of `id`.
    #[must_use]
    pub fn resource(&self, id: ElementId) -> Option<&ResourceRef> {
        self.resources[id.0 as usize].as_ref()
    }

    /// Whether `id` takes part in the reveal sequence.
    #[must_use]
    pub fn is_reveal_target(&self, id: ElementId) -> bool {
        self.reveal_target[id.0 as usize]
    }

    /// Whether `id` has a paired connector.
    #[must_use]
    pub fn has_connector(&self, id: ElementId) -> bool {
        self.connector[id.0 as usize]
    }

    /// Presentation flags of `id`.
    #[must_use]
    pub fn flags(&self, id: ElementId) -> ElementFlags {
        self.flags[id.0 as usize]
    }

    /// Load state of `id`.
    #[must_use]
    pub fn load_state(&self, id: ElementId) -> LoadState {
        self.load_state[id.0 as usize]
    }

    /// Terminal fallback applied to `id`, if it errored.
    #[must_use]
    pub fn fallback(&self, id: ElementId) -> Option<Fallback> {
        self.fallback[id.0 as usize]
    }

    /// Number of registered reveal targets.
    #[must_use]
    pub fn reveal_target_count(&self) -> u32 {
        self.reveal_targets
    }

    /// Number of reveal targets already revealed.
    #[must_use]
    pub fn revealed_count(&self) -> u32 {
        self.revealed
    }

    /// Reveal targets in stagger order: by group, then ordinal, then
    /// registration order.
    #[must_use]
    pub fn reveal_sequence(&self) -> Vec<ElementId> {
        let mut seq: Vec<ElementId> = self.ids().filter(|&id| self.is_reveal_target(id)).collect();
        seq.sort_by_key(|&id| (self.group(id), self.ordinal(id), id));
        seq
    }

    // -- Transitions --

    /// Sets `revealed`. Returns `false` if it was already set.
    pub(crate) fn set_revealed(&mut self, id: ElementId) -> bool {
        let flags = &mut self.flags[id.0 as usize];
        if flags.revealed {
            return false;
        }
        flags.revealed = true;
        if self.reveal_target[id.0 as usize] {
            self.revealed += 1;
        }
        true
    }

    /// Activates the connector. Returns `false` if it was already active or
    /// the element has none.
    pub(crate) fn set_connector_active(&mut self, id: ElementId) -> bool {
        let idx = id.0 as usize;
        if !self.connector[idx] || self.flags[idx].connector_active {
            return false;
        }
        self.flags[idx].connector_active = true;
        true
    }

    pub(crate) fn set_load_state(&mut self, id: ElementId, state: LoadState) {
        let idx = id.0 as usize;
        self.load_state[idx] = state;
        match state {
            LoadState::Loaded => {
                self.flags[idx].placeholder = false;
                self.fallback[idx] = None;
            }
            LoadState::Errored => self.fallback[idx] = Some(Fallback::TERMINAL),
            LoadState::Idle => {
                self.fallback[idx] = None;
                self.flags[idx].placeholder = self.resources[idx].is_some();
            }
            LoadState::Loading => {}
        }
    }
}
