// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: items, flags, per-item collision state and contact records.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use kurbo::{Point, Rect, Vec2};
use quadtree_index::{ItemId, Residency};

bitflags::bitflags! {
    /// Item flags controlling pair tests.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u8 {
        /// Static item. Pairs where both items are pinned are never tested.
        const PINNED = 0b0000_0001;
    }
}

/// Geometry of a tracked item: an axis-aligned rectangle plus flags.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Item {
    /// Bounds, `x0/y0` being the position and `x1/y1` position plus size.
    pub bounds: Rect,
    /// Pair-test flags.
    pub flags: ItemFlags,
}

impl Item {
    /// An item at `(x, y)` with the given size.
    ///
    /// The size is not normalized; negative sizes are rejected on insertion.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_rect(Rect::new(x, y, x + width, y + height))
    }

    /// An item covering `bounds`.
    pub const fn from_rect(bounds: Rect) -> Self {
        Self {
            bounds,
            flags: ItemFlags::empty(),
        }
    }

    /// Mark the item as static.
    #[must_use]
    pub fn pinned(mut self) -> Self {
        self.flags |= ItemFlags::PINNED;
        self
    }

    /// Whether the item is static.
    pub fn is_pinned(&self) -> bool {
        self.flags.contains(ItemFlags::PINNED)
    }

    /// Top-left corner.
    pub fn position(&self) -> Point {
        self.bounds.origin()
    }

    /// Extent along x.
    pub fn width(&self) -> f64 {
        self.bounds.x1 - self.bounds.x0
    }

    /// Extent along y.
    pub fn height(&self) -> f64 {
        self.bounds.y1 - self.bounds.y0
    }

    /// A copy moved to `(x, y)`, keeping its size and flags.
    #[must_use]
    pub fn with_position(self, x: f64, y: f64) -> Self {
        Self {
            bounds: Rect::new(x, y, x + self.width(), y + self.height()),
            flags: self.flags,
        }
    }
}

/// Overlap between one item and its pair, as seen from the item.
///
/// `dist_x`/`dist_y` are signed penetration depths, zeroed on an axis where the
/// overlap is deeper than half of either extent (that axis cannot separate the
/// pair). `abs_dist_x`/`abs_dist_y` keep the magnitudes from before zeroing.
/// `face` is the normal of the contact face: one component is zero, the other
/// is `±1`, or both are zero when no axis separates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactInfo {
    /// The other item.
    pub pair: ItemId,
    /// Signed penetration along x.
    pub dist_x: f64,
    /// Signed penetration along y.
    pub dist_y: f64,
    /// Penetration magnitude along x.
    pub abs_dist_x: f64,
    /// Penetration magnitude along y.
    pub abs_dist_y: f64,
    /// Contact face normal.
    pub face: Vec2,
}

/// Engine-owned state attached to each tracked item.
#[derive(Debug, Default)]
pub struct CollisionState {
    pub(crate) residency: Residency,
    pub(crate) contacts: Vec<ContactInfo>,
    pub(crate) ignored: BTreeSet<ItemId>,
}

impl CollisionState {
    /// Bucket placement and stable id.
    pub const fn residency(&self) -> &Residency {
        &self.residency
    }

    /// Contacts found by the most recent detection pass.
    pub fn contacts(&self) -> &[ContactInfo] {
        &self.contacts
    }

    /// Items this one is never paired with.
    pub fn ignored(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ignored.iter().copied()
    }

    /// Whether pairs with `other` are skipped.
    pub fn ignores(&self, other: ItemId) -> bool {
        self.ignored.contains(&other)
    }
}

/// Construction parameters of a [`Detector`](crate::Detector).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Width of the field covered by the tree.
    pub field_width: f64,
    /// Height of the field covered by the tree.
    pub field_height: f64,
    /// Levels below the root. The finest cell is `field / 2^depth` per axis.
    pub depth: u32,
}

impl DetectorConfig {
    /// A config for a `width × height` field subdivided `depth` times.
    pub const fn new(field_width: f64, field_height: f64, depth: u32) -> Self {
        Self {
            field_width,
            field_height,
            depth,
        }
    }
}
