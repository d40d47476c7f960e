// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Morton (Z-order) addressing of AABBs into a linear quadtree.
//!
//! The field is divided into `2^depth × 2^depth` cells at the finest level. Each
//! corner of an AABB is mapped to its cell, and the cell coordinates are
//! bit-interleaved into a 32-bit Morton code. Two corners that share an ancestor
//! cell `k` levels above the finest one agree on every bit above the lowest `2k`,
//! so the highest differing bit pair of `lo ^ hi` tells how far up the tree the
//! smallest enclosing cell lives.
//!
//! Codes are 32 bits wide, which caps the grid at 16 bits per axis. Trees are
//! further capped at [`MAX_DEPTH`] to keep bucket storage bounded.

use crate::error::Error;
use crate::types::Aabb2D;

/// Deepest tree accepted by [`QuadCodec::new`].
///
/// `(4^11 - 1) / 3 ≈ 1.4M` buckets. The Morton codes themselves would stay exact
/// up to depth 16.
pub const MAX_DEPTH: u32 = 10;

/// Location of a node in the quadtree: a level (0 = root) and the Morton
/// number of the cell within that level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// Level in the tree; 0 is the root, `depth` the finest level.
    pub level: u32,
    /// Morton number of the cell within its level, in `0..4^level`.
    pub area: u32,
}

impl Address {
    /// The root node, which also catches everything outside the field.
    pub const ROOT: Self = Self::new(0, 0);

    /// Create an address from its parts.
    pub const fn new(level: u32, area: u32) -> Self {
        Self { level, area }
    }

    /// Index of this node's bucket in the flat bucket array.
    pub const fn bucket_index(self) -> usize {
        level_offset(self.level) + self.area as usize
    }

    /// The enclosing node one level up, or `None` for the root.
    pub const fn parent(self) -> Option<Self> {
        if self.level == 0 {
            None
        } else {
            Some(Self::new(self.level - 1, self.area >> 2))
        }
    }

    /// The `j`-th child (`j` in `0..4`, Z order).
    pub const fn child(self, j: u32) -> Self {
        debug_assert!(j < 4, "a quadtree node has four children");
        Self::new(self.level + 1, (self.area << 2) | j)
    }

    /// The four children in Z order.
    pub fn children(self) -> impl Iterator<Item = Self> {
        (0..4).map(move |j| self.child(j))
    }
}

/// Number of buckets on all levels above `level`, i.e. the bucket index of the
/// first node on `level`: `(4^level - 1) / 3`.
pub const fn level_offset(level: u32) -> usize {
    ((1_usize << (2 * level)) - 1) / 3
}

/// Total bucket count of a tree of the given depth: `(4^(depth+1) - 1) / 3`.
pub const fn bucket_count(depth: u32) -> usize {
    level_offset(depth + 1)
}

/// Spread the low 16 bits of `v` so that bit `i` lands on bit `2i`.
pub const fn spread_bits(v: u32) -> u32 {
    let mut n = v & 0x0000_FFFF;
    n = (n | (n << 8)) & 0x00FF_00FF;
    n = (n | (n << 4)) & 0x0F0F_0F0F;
    n = (n | (n << 2)) & 0x3333_3333;
    (n | (n << 1)) & 0x5555_5555
}

/// Interleave grid coordinates into a Morton code; `x` takes the even bits.
pub const fn morton_code(x: u32, y: u32) -> u32 {
    spread_bits(x) | (spread_bits(y) << 1)
}

/// Maps AABBs in a `field_width × field_height` field to quadtree addresses.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadCodec {
    field: Aabb2D<f64>,
    depth: u32,
    cell_w: f64,
    cell_h: f64,
}

impl QuadCodec {
    /// Create a codec for the field `[0, width] × [0, height]` subdivided `depth` times.
    pub fn new(width: f64, height: f64, depth: u32) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthTooLarge {
                depth,
                max: MAX_DEPTH,
            });
        }
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidField { width, height });
        }
        let cells = f64::from(1_u32 << depth);
        Ok(Self {
            field: Aabb2D::new(0.0, 0.0, width, height),
            depth,
            cell_w: width / cells,
            cell_h: height / cells,
        })
    }

    /// Depth of the finest level.
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// The field bounds, `[0, width] × [0, height]`.
    pub const fn field(&self) -> Aabb2D<f64> {
        self.field
    }

    /// Size `(w, h)` of one cell at the finest level.
    pub const fn cell_size(&self) -> (f64, f64) {
        (self.cell_w, self.cell_h)
    }

    /// Number of finest-level cells along each axis.
    pub const fn cells_per_axis(&self) -> u32 {
        1 << self.depth
    }

    /// Whether the AABB lies fully inside the field (edges inclusive).
    pub fn in_field(&self, aabb: &Aabb2D<f64>) -> bool {
        self.field.contains(aabb)
    }

    /// Smallest node whose cell contains both corners of `aabb`.
    ///
    /// Corners that fall outside the grid clamp the result to [`Address::ROOT`].
    /// This never fails.
    pub fn address(&self, aabb: &Aabb2D<f64>) -> Address {
        let (Some((x0, y0)), Some((x1, y1))) = (
            self.cell_of(aabb.min_x, aabb.min_y),
            self.cell_of(aabb.max_x, aabb.max_y),
        ) else {
            return Address::ROOT;
        };
        let lo = morton_code(x0, y0);
        let hi = morton_code(x1, y1);
        let delta = match lo ^ hi {
            0 => 0,
            diff => (31 - diff.leading_zeros()) / 2 + 1,
        };
        if delta > self.depth {
            return Address::ROOT;
        }
        Address::new(self.depth - delta, hi >> (2 * delta))
    }

    /// Address with the field policy applied: anything not fully inside the
    /// field goes to the root, whatever [`address`](Self::address) says.
    pub fn placement(&self, aabb: &Aabb2D<f64>) -> Address {
        if self.in_field(aabb) {
            self.address(aabb)
        } else {
            Address::ROOT
        }
    }

    fn cell_of(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let cells = self.cells_per_axis();
        let to_cell = |v: f64| {
            if v.is_nan() {
                return None;
            }
            u32::try_from(floor_to_i64(v))
                .ok()
                .filter(|&c| c < cells)
        };
        Some((to_cell(x / self.cell_w)?, to_cell(y / self.cell_h)?))
    }
}

#[inline]
fn floor_to_i64(v: f64) -> i64 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Saturating float-to-int cast; out-of-range cells are rejected by the caller."
    )]
    let i = v as i64;
    if (i as f64) > v { i - 1 } else { i }
}
