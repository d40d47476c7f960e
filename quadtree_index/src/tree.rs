// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat bucket storage for every node of the quadtree, with an intrusive
//! doubly linked list of items per bucket.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::codec::{Address, QuadCodec, bucket_count};
use crate::error::Error;
use crate::types::{Aabb2D, ItemId};

/// Neighbours of an item inside its bucket list.
///
/// `prev` points at the next older entry, `next` at the next newer one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    /// Older neighbour.
    pub prev: Option<ItemId>,
    /// Newer neighbour.
    pub next: Option<ItemId>,
}

/// Items addressed to one `(level, area)` node.
///
/// Entries are keyed by [`ItemId`] and chained from the most recent insertion
/// (the head) back to the oldest, so insertion and removal are O(log n) map
/// operations plus O(1) relinking.
#[derive(Clone, Debug, Default)]
pub struct Bucket {
    links: BTreeMap<ItemId, Link>,
    head: Option<ItemId>,
}

impl Bucket {
    /// Number of items in the bucket.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if the bucket holds no items.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Most recently inserted item.
    pub const fn head(&self) -> Option<ItemId> {
        self.head
    }

    /// Whether `id` lives in this bucket.
    pub fn contains(&self, id: ItemId) -> bool {
        self.links.contains_key(&id)
    }

    /// List neighbours of `id`, if present.
    pub fn link(&self, id: ItemId) -> Option<Link> {
        self.links.get(&id).copied()
    }

    /// All items, in ascending id order.
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.links.keys().copied()
    }

    /// Walk the list from the head towards older entries.
    pub fn newest_first(&self) -> Chain<'_> {
        Chain {
            bucket: self,
            cursor: self.head,
            towards_newer: false,
        }
    }

    /// Walk the entries inserted after `id`, oldest first.
    pub fn newer_than(&self, id: ItemId) -> Chain<'_> {
        Chain {
            bucket: self,
            cursor: self.links.get(&id).and_then(|l| l.next),
            towards_newer: true,
        }
    }

    fn push_head(&mut self, id: ItemId) {
        let prev = self.head;
        if let Some(old) = prev.and_then(|h| self.links.get_mut(&h)) {
            old.next = Some(id);
        }
        self.links.insert(id, Link { prev, next: None });
        self.head = Some(id);
    }

    fn unlink(&mut self, id: ItemId) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        if let Some(older) = link.prev.and_then(|p| self.links.get_mut(&p)) {
            older.next = link.next;
        }
        if let Some(newer) = link.next.and_then(|n| self.links.get_mut(&n)) {
            newer.prev = link.prev;
        }
        if self.head == Some(id) {
            self.head = link.prev;
        }
        true
    }
}

/// Iterator over a bucket's linked list. See [`Bucket::newest_first`] and
/// [`Bucket::newer_than`].
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    bucket: &'a Bucket,
    cursor: Option<ItemId>,
    towards_newer: bool,
}

impl Iterator for Chain<'_> {
    type Item = ItemId;

    fn next(&mut self) -> Option<ItemId> {
        let id = self.cursor?;
        let link = self.bucket.links.get(&id)?;
        self.cursor = if self.towards_newer {
            link.next
        } else {
            link.prev
        };
        Some(id)
    }
}

/// Where an item currently lives in a [`LinearQuadTree`].
///
/// Owned by the caller alongside the item and handed back to the tree on every
/// update. The id is issued on first insertion and survives removal; the bucket
/// is `None` whenever the item is not resident.
///
/// A residency is bound to the tree that issued its id and cannot be copied, so
/// there is exactly one handle per item. The tree rejects handles it did not
/// issue or whose bucket no longer holds the item.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Residency {
    id: Option<ItemId>,
    bucket: Option<usize>,
    tree: Option<u32>,
}

impl Residency {
    /// A residency for an item that has never been inserted.
    pub const fn new() -> Self {
        Self {
            id: None,
            bucket: None,
            tree: None,
        }
    }

    /// The id issued on first insertion.
    pub const fn id(&self) -> Option<ItemId> {
        self.id
    }

    /// Index of the bucket currently holding the item.
    pub const fn bucket(&self) -> Option<usize> {
        self.bucket
    }

    /// Whether the item is currently stored in a bucket.
    pub const fn is_resident(&self) -> bool {
        self.bucket.is_some()
    }
}

/// Outcome of [`LinearQuadTree::update`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Already resident in the target bucket.
    Unchanged {
        /// The bucket the item stays in.
        bucket: usize,
    },
    /// The item was not resident before.
    Inserted {
        /// Bucket the item was added to.
        bucket: usize,
    },
    /// The item moved between buckets.
    Moved {
        /// Previous bucket.
        from: usize,
        /// New bucket.
        to: usize,
    },
    /// The computed bucket is outside storage; nothing was changed.
    Skipped {
        /// The out-of-range bucket index.
        bucket: usize,
    },
    /// The residency was issued by another tree, or its bucket does not hold
    /// the item; nothing was changed.
    Rejected,
}

impl Placement {
    /// Whether the item now lives in the target bucket.
    pub const fn is_placed(self) -> bool {
        !matches!(self, Self::Skipped { .. } | Self::Rejected)
    }
}

static NEXT_TREE: AtomicU32 = AtomicU32::new(1);

/// A quadtree stored as one flat array of buckets across all levels.
///
/// The bucket for `(level, area)` sits at `(4^level - 1) / 3 + area`. Every item
/// lives in exactly one bucket: the smallest node whose cell contains it, or
/// the root when it leaves the field.
pub struct LinearQuadTree {
    codec: QuadCodec,
    buckets: Vec<Bucket>,
    len: usize,
    next_id: u32,
    token: u32,
}

impl LinearQuadTree {
    /// Create an empty tree over `[0, width] × [0, height]` with `depth` levels below the root.
    pub fn new(width: f64, height: f64, depth: u32) -> Result<Self, Error> {
        QuadCodec::new(width, height, depth).map(Self::with_codec)
    }

    /// Create an empty tree addressed by an existing codec.
    pub fn with_codec(codec: QuadCodec) -> Self {
        let mut buckets = Vec::new();
        buckets.resize_with(bucket_count(codec.depth()), Bucket::default);
        log::debug!(
            "linear quadtree: depth {}, {} buckets, finest cell {:?}",
            codec.depth(),
            buckets.len(),
            codec.cell_size()
        );
        Self {
            codec,
            buckets,
            len: 0,
            next_id: 0,
            token: NEXT_TREE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The codec used to address items.
    pub const fn codec(&self) -> &QuadCodec {
        &self.codec
    }

    /// Depth of the finest level.
    pub const fn depth(&self) -> u32 {
        self.codec.depth()
    }

    /// Number of resident items across all buckets.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if no item is resident.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket by flat index.
    pub fn bucket(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    /// Bucket by address. `None` if the address is deeper than the tree.
    pub fn bucket_at(&self, address: Address) -> Option<&Bucket> {
        if address.level > self.depth() {
            return None;
        }
        self.buckets.get(address.bucket_index())
    }

    /// Place an item with bounds `aabb`, inserting it or moving it as needed.
    ///
    /// An id is issued on the item's first insertion and kept from then on.
    pub fn update(&mut self, residency: &mut Residency, aabb: &Aabb2D<f64>) -> Placement {
        if !self.is_valid(residency) {
            log::warn!("rejected update of item {:?}: stale or foreign residency", residency.id);
            return Placement::Rejected;
        }
        let target = self.codec.placement(aabb).bucket_index();
        if residency.bucket == Some(target) {
            return Placement::Unchanged { bucket: target };
        }
        if target >= self.buckets.len() {
            log::warn!("bucket {target} is outside tree storage, update skipped");
            return Placement::Skipped { bucket: target };
        }

        let from = self.splice_out(residency);
        let id = match residency.id {
            Some(id) => id,
            None => {
                let id = self.issue_id();
                residency.id = Some(id);
                residency.tree = Some(self.token);
                id
            }
        };
        self.buckets[target].push_head(id);
        self.len += 1;
        residency.bucket = Some(target);

        match from {
            Some(from) => {
                log::trace!("item {id} moved from bucket {from} to {target}");
                Placement::Moved { from, to: target }
            }
            None => {
                log::trace!("item {id} inserted into bucket {target}");
                Placement::Inserted { bucket: target }
            }
        }
    }

    /// Take an item out of its bucket. The id is kept so a later
    /// [`update`](Self::update) re-inserts it under the same identity.
    ///
    /// Returns `false` if the item was not resident, or if the residency is not
    /// one this tree can act on (see [`Placement::Rejected`]).
    pub fn remove(&mut self, residency: &mut Residency) -> bool {
        if !self.is_valid(residency) {
            log::warn!("rejected removal of item {:?}: stale or foreign residency", residency.id);
            return false;
        }
        self.splice_out(residency).is_some()
    }

    /// Issued by this tree, and resident exactly where it claims to be.
    fn is_valid(&self, residency: &Residency) -> bool {
        let Some(id) = residency.id else {
            return residency.tree.is_none() && residency.bucket.is_none();
        };
        if residency.tree != Some(self.token) {
            return false;
        }
        match residency.bucket {
            Some(index) => self.buckets.get(index).is_some_and(|b| b.contains(id)),
            None => true,
        }
    }

    fn splice_out(&mut self, residency: &mut Residency) -> Option<usize> {
        let (Some(id), Some(from)) = (residency.id, residency.bucket.take()) else {
            return None;
        };
        let bucket = self.buckets.get_mut(from)?;
        if !bucket.unlink(id) {
            return None;
        }
        self.len -= 1;
        Some(from)
    }

    fn issue_id(&mut self) -> ItemId {
        // Ids are 32-bit; wrap-around after 2^32 insertions is unspecified.
        let id = ItemId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

impl Debug for LinearQuadTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupied = self.buckets.iter().filter(|b| !b.is_empty()).count();
        f.debug_struct("LinearQuadTree")
            .field("depth", &self.depth())
            .field("buckets", &self.buckets.len())
            .field("occupied", &occupied)
            .field("len", &self.len)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
