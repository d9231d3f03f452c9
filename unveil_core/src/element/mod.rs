// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element registry.
//!
//! Elements are *discovered*, never created: the platform reports each
//! matching node as a [`Candidate`] carrying a platform-assigned [`NodeKey`].
//! Registration allocates an [`ElementId`] in the [`ElementStore`] and
//! attaches the orchestrator's bookkeeping to it:
//!
//! - **Ordinal** — stagger position, snapshotted at registration (explicit
//!   ordinal if the candidate carried one, otherwise the next position in its
//!   selector group).
//! - **Resource** — the validated deferred-resource reference, if any.
//! - **Flags** — [`ElementFlags`]: `placeholder`, `revealed`, and
//!   `connector_active`. `revealed` is monotonic.
//! - **Load state** — [`LoadState`]. Being an enum, at most one of
//!   loading/loaded/errored holds at a time.
//!
//! Every operation collects what it changed into a [`StateChanges`] batch,
//! which the orchestrator hands to the platform's
//! [`Presenter`](crate::backend::Presenter).

mod candidate;
mod changes;
mod id;
mod store;

pub use candidate::Candidate;
pub use changes::StateChanges;
pub use id::{ElementId, NodeKey};
pub use store::{ElementFlags, ElementStore, Fallback, LoadState};
