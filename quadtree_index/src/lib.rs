// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadtree Index: a linear (flattened) quadtree for 2D AABBs.
//!
//! - Address any AABB to the smallest quadtree node containing it with a
//!   Morton (Z-order) code, in O(1).
//! - Store every node's items in one flat bucket array, indexed by a closed
//!   form of `(level, area)` instead of pointer links.
//! - Insert, move and remove items in O(log n) with an intrusive linked list per bucket.
//!
//! It does not depend on any geometry crate. Higher layers (like a collision
//! detector) own the items and hand their AABBs and [`Residency`] to the tree.
//!
//! # Example
//!
//! ```rust
//! use quadtree_index::{Aabb2D, Address, LinearQuadTree, Residency};
//!
//! // 800×800 field, two levels below the root: finest cells are 200×200.
//! let mut tree = LinearQuadTree::new(800.0, 800.0, 2).unwrap();
//! assert_eq!(tree.codec().cell_size(), (200.0, 200.0));
//!
//! let mut item = Residency::new();
//! tree.update(&mut item, &Aabb2D::from_xywh(100.0, 100.0, 30.0, 30.0));
//! assert_eq!(item.bucket(), Some(Address::new(2, 0).bucket_index()));
//!
//! // Straddling the centre of the field puts an item in the root.
//! let mut wide = Residency::new();
//! tree.update(&mut wide, &Aabb2D::from_xywh(390.0, 390.0, 20.0, 20.0));
//! assert_eq!(wide.bucket(), Some(0));
//! assert_eq!(tree.len(), 2);
//! ```
//!
//! ## Addressing
//!
//! A tree of depth `L` has `(4^(L+1) - 1) / 3` buckets. Items that do not fit
//! fully inside the field are kept in the root bucket, so every item always has
//! a home. Depth is capped at [`MAX_DEPTH`].
//!
//! ### Float semantics
//!
//! Coordinates are expected to be finite. NaN corners address to the root.

#![no_std]

extern crate alloc;

pub mod codec;
pub mod error;
pub mod tree;
pub mod types;

pub use codec::{Address, MAX_DEPTH, QuadCodec, bucket_count, level_offset, morton_code};
pub use error::Error;
pub use tree::{Bucket, Chain, LinearQuadTree, Link, Placement, Residency};
pub use types::{Aabb2D, ItemId};
