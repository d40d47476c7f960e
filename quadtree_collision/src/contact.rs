// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlap test and per-pair contact geometry.

use alloc::boxed::Box;
use kurbo::{Rect, Vec2};
use quadtree_index::ItemId;

use crate::rect_to_aabb;
use crate::types::ContactInfo;

/// Callback invoked once per resolved pair with both ids and both contact
/// records (the first record belongs to the first id). Stored by the detector,
/// hence `'static`.
pub type ContactHook = Box<dyn FnMut(ItemId, ItemId, &ContactInfo, &ContactInfo)>;

/// Whether two rectangles overlap on both axes. Touching edges count.
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    rect_to_aabb(*a).overlaps(&rect_to_aabb(*b))
}

/// Penetration of `a` into `b` along one axis.
#[derive(Copy, Clone, Debug)]
struct AxisDepth {
    dist: f64,
    abs: f64,
    sign: f64,
}

impl AxisDepth {
    fn new(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> Self {
        let dist = if a_min < b_min {
            a_max - b_min
        } else {
            -(b_max - a_min)
        };
        let sign = if dist > 0.0 {
            1.0
        } else if dist < 0.0 {
            -1.0
        } else {
            0.0
        };
        let abs = dist * sign;
        // Deeper than half of either extent: this axis cannot separate the pair.
        let dist = if abs > (a_max - a_min) / 2.0 || abs > (b_max - b_min) / 2.0 {
            0.0
        } else {
            dist
        };
        Self { dist, abs, sign }
    }
}

/// Contact records for an overlapping pair: the first as seen from `a`, the
/// second (mirrored) as seen from `b`.
///
/// Only the axis with the shallower penetration keeps its normal component;
/// on a tie the y axis wins.
pub fn resolve(a_id: ItemId, a: &Rect, b_id: ItemId, b: &Rect) -> (ContactInfo, ContactInfo) {
    let x = AxisDepth::new(a.x0, a.x1, b.x0, b.x1);
    let y = AxisDepth::new(a.y0, a.y1, b.y0, b.y1);

    let nx = if x.dist != 0.0 && x.abs < y.abs {
        x.sign
    } else {
        0.0
    };
    let ny = if y.dist != 0.0 && x.abs >= y.abs {
        y.sign
    } else {
        0.0
    };

    let for_a = ContactInfo {
        pair: b_id,
        dist_x: x.dist,
        dist_y: y.dist,
        abs_dist_x: x.abs,
        abs_dist_y: y.abs,
        face: Vec2::new(nx, ny),
    };
    let for_b = ContactInfo {
        pair: a_id,
        dist_x: negate(x.dist),
        dist_y: negate(y.dist),
        abs_dist_x: x.abs,
        abs_dist_y: y.abs,
        face: Vec2::new(negate(nx), negate(ny)),
    };
    (for_a, for_b)
}

// Keeps zero as +0.0 so mirrored records compare and print cleanly.
fn negate(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { -v }
}
