// Copyright 2026 the Unveil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Intersection geometry for rectangle-only platforms.
//!
//! Browsers compute intersection ratios natively. Platforms that only expose
//! layout boxes (and the simulated harness) use [`intersection_ratio`] to
//! produce the same numbers:
//!
//! ```text
//! root  = viewport grown by margin (per edge, negative shrinks)
//! ratio = area(bounds ∩ root) / area(bounds)
//! ```
//!
//! A zero-area target (an empty element, a collapsed image) has no meaningful
//! ratio; it reports `1.0` when it touches the root and `0.0` otherwise,
//! matching the browser primitive.

use kurbo::Rect;

use crate::config::Margin;

/// Result of testing one element against the trigger region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Visible fraction of the element's area, `0.0..=1.0`.
    pub ratio: f64,
    /// Whether the element touches the trigger region at all.
    pub intersecting: bool,
}

/// Applies `margin` to `viewport`.
///
/// A margin large and negative enough to invert the rectangle collapses it to
/// zero size at its center instead.
#[must_use]
pub fn trigger_region(viewport: Rect, margin: Margin) -> Rect {
    let x0 = viewport.x0 - margin.left;
    let y0 = viewport.y0 - margin.top;
    let x1 = viewport.x1 + margin.right;
    let y1 = viewport.y1 + margin.bottom;
    let (x0, x1) = if x1 < x0 {
        let mid = (x0 + x1) / 2.0;
        (mid, mid)
    } else {
        (x0, x1)
    };
    let (y0, y1) = if y1 < y0 {
        let mid = (y0 + y1) / 2.0;
        (mid, mid)
    } else {
        (y0, y1)
    };
    Rect::new(x0, y0, x1, y1)
}

/// Tests `bounds` against `viewport` adjusted by `margin`.
#[must_use]
pub fn intersection_ratio(bounds: Rect, viewport: Rect, margin: Margin) -> Intersection {
    let root = trigger_region(viewport, margin);
    let bounds = bounds.abs();

    if bounds.area() <= 0.0 {
        let touching = edge_inclusive_overlap(bounds, root);
        return Intersection {
            ratio: if touching { 1.0 } else { 0.0 },
            intersecting: touching,
        };
    }

    if !edge_inclusive_overlap(bounds, root) {
        return Intersection {
            ratio: 0.0,
            intersecting: false,
        };
    }
    let overlap = bounds.intersect(root);
    Intersection {
        ratio: (overlap.area() / bounds.area()).clamp(0.0, 1.0),
        intersecting: true,
    }
}

/// Edge-touching counts as overlap, so degenerate rectangles can intersect.
fn edge_inclusive_overlap(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}
