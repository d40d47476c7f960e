// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadtree Collision: a Kurbo-native broad phase for axis-aligned rectangles.
//!
//! Once per simulation tick it answers two questions:
//!
//! - Which tracked rectangles overlap each other? [`Detector::detect`] records
//!   per-pair [`ContactInfo`] (penetration depths and a contact face normal) and
//!   groups transitively overlapping items into [`Groups`].
//! - Which tracked rectangles overlap a probe? [`Detector::detect_at`].
//!
//! Items are stored in a [`quadtree_index::LinearQuadTree`]: every item lives in
//! the smallest quadtree cell that contains it, so a pass only compares items
//! sharing a cell or lying on each other's root path.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Rect, Vec2};
//! use quadtree_collision::{Detector, DetectorConfig, Item};
//!
//! // 800×800 field, finest cells of 200×200.
//! let mut det = Detector::new(DetectorConfig::new(800.0, 800.0, 2)).unwrap();
//! let a = det.insert(Item::new(100.0, 100.0, 30.0, 30.0)).unwrap();
//! let b = det.insert(Item::new(120.0, 100.0, 30.0, 30.0)).unwrap();
//!
//! det.detect();
//! let hit = det.contacts(a)[0];
//! assert_eq!(hit.pair, b);
//! assert_eq!(hit.dist_x, 10.0);
//! assert_eq!(hit.face, Vec2::new(1.0, 0.0));
//! assert_eq!(det.contacts(b)[0].face, Vec2::new(-1.0, 0.0));
//! assert_eq!(det.group_of(a), det.group_of(b));
//!
//! // Move `b` away before the next tick.
//! det.update(b, Item::new(600.0, 600.0, 30.0, 30.0)).unwrap();
//! det.detect();
//! assert!(det.contacts(a).is_empty());
//!
//! // Probe with a small rectangle, e.g. a click.
//! assert_eq!(det.detect_at(Rect::new(110.0, 110.0, 111.0, 111.0)), [a]);
//! ```
//!
//! ## Contacts
//!
//! For a pair `(a, b)` the signed penetration on each axis is measured from the
//! item that leads on that axis. An axis whose penetration exceeds half of
//! either extent is treated as non-separating and its signed distance is zeroed.
//! Only the axis with the shallower penetration keeps a normal component, with
//! ties going to y. `b` receives the mirrored record.
//!
//! Pairs where both items are [`ItemFlags::PINNED`], or that were excluded with
//! [`Detector::set_ignored`], are never tested.
//!
//! ## Lifecycle
//!
//! - [`Detector::insert`] → [`ItemId`], stable and never reused.
//! - [`Detector::update`] re-addresses an item; staying in the same cell is free.
//! - [`Detector::remove`] takes an item out of the tree but keeps its id and state;
//!   a later `update` re-inserts it.
//! - [`Detector::forget`] drops the item for good.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod contact;
mod detector;
pub mod error;
pub mod group;
mod scan;
pub mod types;

pub use contact::ContactHook;
pub use detector::Detector;
pub use error::Error;
pub use group::{GroupId, Groups};
pub use quadtree_index::ItemId;
pub use types::{CollisionState, ContactInfo, DetectorConfig, Item, ItemFlags};

use quadtree_index::Aabb2D;

pub(crate) fn rect_to_aabb(r: kurbo::Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::Rect;

    fn field() -> Vec<Item> {
        [
            (100.0, 100.0, 40.0, 40.0),
            (400.0, 600.0, 40.0, 40.0),
            (200.0, 760.0, 400.0, 40.0),
            (300.0, 0.0, 350.0, 350.0),
            (10.0, 300.0, 250.0, 80.0),
            (120.0, 120.0, 200.0, 200.0),
            (630.0, 330.0, 60.0, 60.0),
            (-20.0, 500.0, 60.0, 60.0),
        ]
        .into_iter()
        .map(|(x, y, w, h)| Item::new(x, y, w, h))
        .collect()
    }

    #[test]
    fn contacts_are_mirrored() {
        let (mut det, ids) = Detector::with_items(DetectorConfig::new(800.0, 800.0, 3), field())
            .unwrap();
        det.detect();
        let mut total = 0;
        for &a in &ids {
            for c in det.contacts(a) {
                total += 1;
                let back = det
                    .contacts(c.pair)
                    .iter()
                    .find(|m| m.pair == a)
                    .expect("mirror record must exist");
                assert_eq!(back.abs_dist_x, c.abs_dist_x);
                assert_eq!(back.abs_dist_y, c.abs_dist_y);
                assert_eq!(back.dist_x, if c.dist_x == 0.0 { 0.0 } else { -c.dist_x });
                assert_eq!(back.dist_y, if c.dist_y == 0.0 { 0.0 } else { -c.dist_y });
                assert_eq!(back.face.x, if c.face.x == 0.0 { 0.0 } else { -c.face.x });
                assert_eq!(back.face.y, if c.face.y == 0.0 { 0.0 } else { -c.face.y });
            }
        }
        assert!(total > 0, "the sample field has overlaps");
    }

    #[test]
    fn unit_probe_agrees_with_detect_predicate() {
        let (det, ids) = Detector::with_items(DetectorConfig::new(800.0, 800.0, 3), field())
            .unwrap();
        for &owner in &ids {
            let b = det.item(owner).unwrap().bounds;
            for (fx, fy) in [(0.1, 0.1), (0.5, 0.5), (0.9, 0.2)] {
                let x = b.x0 + (b.x1 - b.x0 - 1.0) * fx;
                let y = b.y0 + (b.y1 - b.y0 - 1.0) * fy;
                let probe = Rect::new(x, y, x + 1.0, y + 1.0);
                let mut got = det.detect_at(probe);
                got.sort();
                let expected: Vec<ItemId> = ids
                    .iter()
                    .copied()
                    .filter(|&id| contact::overlaps(&probe, &det.item(id).unwrap().bounds))
                    .collect();
                assert!(got.contains(&owner));
                assert_eq!(got, expected, "probe {probe:?}");
            }
        }
    }

    #[test]
    fn groups_match_connected_components() {
        let (mut det, ids) = Detector::with_items(DetectorConfig::new(800.0, 800.0, 2), field())
            .unwrap();
        det.detect();
        for &a in &ids {
            for c in det.contacts(a) {
                assert_eq!(det.group_of(a), det.group_of(c.pair));
            }
            assert_eq!(det.group_of(a).is_some(), !det.contacts(a).is_empty());
        }
        let members: usize = det.groups().iter().map(|(_, m)| m.len()).sum();
        let grouped = ids.iter().filter(|&&id| det.group_of(id).is_some()).count();
        assert_eq!(members, grouped, "each grouped item is listed once");
    }

    #[test]
    fn resident_items_survive_many_moves() {
        let mut det = Detector::new(DetectorConfig::new(800.0, 800.0, 3)).unwrap();
        let a = det.insert(Item::new(100.0, 100.0, 30.0, 30.0)).unwrap();
        let b = det.insert(Item::new(500.0, 500.0, 30.0, 30.0)).unwrap();
        for step in 0..80_u32 {
            let t = f64::from(step) * 5.0;
            det.update(a, Item::new(100.0 + t, 100.0 + t, 30.0, 30.0)).unwrap();
            det.detect();
            let touching = contact::overlaps(
                &det.item(a).unwrap().bounds,
                &det.item(b).unwrap().bounds,
            );
            assert_eq!(det.contacts(a).len(), usize::from(touching), "step {step}");
        }
        assert_eq!(det.tree().len(), 2);
    }
}
