// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The detector: item table, tree synchronization and per-tick queries.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use kurbo::Rect;
use quadtree_index::{ItemId, LinearQuadTree, QuadCodec};

use crate::contact::ContactHook;
use crate::error::Error;
use crate::group::{GroupId, Groups};
use crate::rect_to_aabb;
use crate::scan::{self, PairScan, Reporter};
use crate::types::{CollisionState, ContactInfo, DetectorConfig, Item};

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) item: Item,
    pub(crate) state: CollisionState,
}

/// Broad phase over a linear quadtree.
///
/// The detector owns a side table from [`ItemId`] to the item's geometry and
/// [`CollisionState`]. Callers keep the ids handed out by
/// [`insert`](Self::insert) and push new geometry with [`update`](Self::update)
/// before each [`detect`](Self::detect).
pub struct Detector {
    pub(crate) tree: LinearQuadTree,
    pub(crate) slots: BTreeMap<ItemId, Slot>,
    groups: Groups,
    hook: Option<ContactHook>,
}

impl core::fmt::Debug for Detector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Detector")
            .field("tree", &self.tree)
            .field("items", &self.slots.len())
            .field("groups", &self.groups.len())
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// Create an empty detector.
    pub fn new(config: DetectorConfig) -> Result<Self, Error> {
        let codec = QuadCodec::new(config.field_width, config.field_height, config.depth)?;
        Ok(Self {
            tree: LinearQuadTree::with_codec(codec),
            slots: BTreeMap::new(),
            groups: Groups::default(),
            hook: None,
        })
    }

    /// Create a detector and insert `items`, returning their ids in order.
    pub fn with_items(
        config: DetectorConfig,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<(Self, Vec<ItemId>), Error> {
        let mut det = Self::new(config)?;
        let ids = items
            .into_iter()
            .map(|item| det.insert(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((det, ids))
    }

    /// The configuration the detector was built with.
    pub fn config(&self) -> DetectorConfig {
        let codec = self.tree.codec();
        let field = codec.field();
        DetectorConfig::new(field.max_x, field.max_y, codec.depth())
    }

    /// Start tracking an item. The returned id stays valid until [`forget`](Self::forget).
    pub fn insert(&mut self, item: Item) -> Result<ItemId, Error> {
        self.insert_or_update(None, item)
    }

    /// Replace a tracked item's geometry and re-address it. A removed item is
    /// re-inserted under its old id.
    pub fn update(&mut self, id: ItemId, item: Item) -> Result<(), Error> {
        self.insert_or_update(Some(id), item).map(|_| ())
    }

    /// Insert a new item (`id == None`) or update an existing one.
    ///
    /// Moving within the same bucket leaves the tree untouched.
    pub fn insert_or_update(&mut self, id: Option<ItemId>, item: Item) -> Result<ItemId, Error> {
        validate(&item)?;
        let aabb = rect_to_aabb(item.bounds);
        match id {
            Some(id) => {
                let slot = self.slots.get_mut(&id).ok_or(Error::UnknownItem(id))?;
                let placement = self.tree.update(&mut slot.state.residency, &aabb);
                if placement.is_placed() {
                    slot.item = item;
                } else {
                    log::warn!("item {id} not moved ({placement:?}); keeping its previous geometry");
                }
                Ok(id)
            }
            None => {
                let mut state = CollisionState::default();
                self.tree.update(&mut state.residency, &aabb);
                let id = state.residency.id().ok_or(Error::Unaddressable)?;
                self.slots.insert(id, Slot { item, state });
                Ok(id)
            }
        }
    }

    /// Take an item out of the tree. Its id and state are kept, so
    /// [`update`](Self::update) brings it back. Returns `false` if it was not resident.
    pub fn remove(&mut self, id: ItemId) -> Result<bool, Error> {
        let slot = self.slots.get_mut(&id).ok_or(Error::UnknownItem(id))?;
        Ok(self.tree.remove(&mut slot.state.residency))
    }

    /// Stop tracking an item entirely and return its last geometry. The id is
    /// retired; it is never issued again by this detector.
    pub fn forget(&mut self, id: ItemId) -> Result<Item, Error> {
        let mut slot = self.slots.remove(&id).ok_or(Error::UnknownItem(id))?;
        self.tree.remove(&mut slot.state.residency);
        for other in self.slots.values_mut() {
            other.state.ignored.remove(&id);
        }
        Ok(slot.item)
    }

    /// Exclude (or re-include) the pair `a`/`b` from detection.
    pub fn set_ignored(&mut self, a: ItemId, b: ItemId, ignore: bool) -> Result<(), Error> {
        for (this, other) in [(a, b), (b, a)] {
            if !self.slots.contains_key(&other) {
                return Err(Error::UnknownItem(other));
            }
            let slot = self.slots.get_mut(&this).ok_or(Error::UnknownItem(this))?;
            if ignore {
                slot.state.ignored.insert(other);
            } else {
                slot.state.ignored.remove(&other);
            }
        }
        Ok(())
    }

    /// Install a callback invoked for every overlapping pair during [`detect`](Self::detect).
    ///
    /// The detector stores the callback, so it must be `'static`: it cannot
    /// borrow locals. Share results through owned state instead, e.g.
    /// `Rc<RefCell<_>>`, or read [`contacts`](Self::contacts) after the pass.
    pub fn set_contact_hook(
        &mut self,
        hook: impl FnMut(ItemId, ItemId, &ContactInfo, &ContactInfo) + 'static,
    ) {
        self.hook = Some(Box::new(hook));
    }

    /// Remove the contact callback.
    pub fn clear_contact_hook(&mut self) {
        self.hook = None;
    }

    /// Find every overlapping pair of tracked items.
    ///
    /// Clears all contacts and groups first; afterwards [`contacts`](Self::contacts)
    /// and [`groups`](Self::groups) describe this pass only.
    pub fn detect(&mut self) {
        for slot in self.slots.values_mut() {
            slot.state.contacts.clear();
        }
        self.groups.clear();

        let mut scan = PairScan::new(
            &self.tree,
            Reporter {
                slots: &mut self.slots,
                groups: &mut self.groups,
                hook: self.hook.as_mut(),
                tested: 0,
                found: 0,
            },
        );
        scan.run();
        log::trace!(
            "detect: {} items, {} pairs tested, {} overlapping",
            self.tree.len(),
            scan.reporter.tested,
            scan.reporter.found
        );
    }

    /// Items whose bounds overlap `query` (touching counts). Does not change any state.
    pub fn detect_at(&self, query: Rect) -> Vec<ItemId> {
        scan::probe(&self.tree, &self.slots, query)
    }

    /// Groups found by the last [`detect`](Self::detect).
    pub const fn groups(&self) -> &Groups {
        &self.groups
    }

    /// Group of an item in the last pass.
    pub fn group_of(&self, id: ItemId) -> Option<GroupId> {
        self.groups.group_of(id)
    }

    /// Contacts of an item from the last pass; empty for unknown ids.
    pub fn contacts(&self, id: ItemId) -> &[ContactInfo] {
        self.slots
            .get(&id)
            .map(|s| s.state.contacts())
            .unwrap_or_default()
    }

    /// Collision state of an item.
    pub fn state(&self, id: ItemId) -> Option<&CollisionState> {
        self.slots.get(&id).map(|s| &s.state)
    }

    /// Current geometry of an item.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.slots.get(&id).map(|s| &s.item)
    }

    /// Ids of all tracked items (resident or removed), ascending.
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.slots.keys().copied()
    }

    /// Number of tracked items, including removed ones not yet forgotten.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The underlying tree.
    pub const fn tree(&self) -> &LinearQuadTree {
        &self.tree
    }
}

fn validate(item: &Item) -> Result<(), Error> {
    let r = item.bounds;
    if r.is_finite() && r.x1 >= r.x0 && r.y1 >= r.y0 {
        Ok(())
    } else {
        Err(Error::InvalidBounds)
    }
}
