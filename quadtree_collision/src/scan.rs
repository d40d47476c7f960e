// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversals: the all-pairs pass and the rectangle probe.
//!
//! An item stored in a bucket fits entirely inside that node's cell, and every
//! ancestor's items may reach anywhere below it. Testing each bucket's items
//! against each other and against everything on the root-to-here path therefore
//! finds every overlapping pair exactly once, without sibling cross-checks.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use kurbo::Rect;
use quadtree_index::{Address, ItemId, LinearQuadTree};

use crate::contact::{self, ContactHook};
use crate::detector::Slot;
use crate::group::Groups;
use crate::types::Item;

#[derive(Copy, Clone, Debug)]
struct Candidate {
    id: ItemId,
    item: Item,
}

/// Sink for pairs found by [`PairScan`]: resolves contacts and feeds groups.
pub(crate) struct Reporter<'a> {
    pub(crate) slots: &'a mut BTreeMap<ItemId, Slot>,
    pub(crate) groups: &'a mut Groups,
    pub(crate) hook: Option<&'a mut ContactHook>,
    pub(crate) tested: usize,
    pub(crate) found: usize,
}

impl Reporter<'_> {
    fn candidate(&self, id: ItemId) -> Option<Candidate> {
        self.slots.get(&id).map(|s| Candidate { id, item: s.item })
    }

    fn skips(&self, a: &Candidate, b: &Candidate) -> bool {
        if a.item.is_pinned() && b.item.is_pinned() {
            return true;
        }
        self.slots
            .get(&a.id)
            .is_some_and(|s| s.state.ignores(b.id))
            || self.slots.get(&b.id).is_some_and(|s| s.state.ignores(a.id))
    }

    fn test(&mut self, a: &Candidate, b: &Candidate) {
        if self.skips(a, b) {
            return;
        }
        self.tested += 1;
        if !contact::overlaps(&a.item.bounds, &b.item.bounds) {
            return;
        }
        let (for_a, for_b) = contact::resolve(a.id, &a.item.bounds, b.id, &b.item.bounds);
        if let Some(slot) = self.slots.get_mut(&a.id) {
            slot.state.contacts.push(for_a);
        }
        if let Some(slot) = self.slots.get_mut(&b.id) {
            slot.state.contacts.push(for_b);
        }
        if let Some(hook) = self.hook.as_mut() {
            hook(a.id, b.id, &for_a, &for_b);
        }
        self.groups.report(a.id, b.id);
        self.found += 1;
    }
}

/// Depth-first pass over the whole tree carrying the items of every bucket on
/// the current root-to-node path.
pub(crate) struct PairScan<'a> {
    tree: &'a LinearQuadTree,
    ancestors: Vec<Candidate>,
    pub(crate) reporter: Reporter<'a>,
}

impl<'a> PairScan<'a> {
    pub(crate) fn new(tree: &'a LinearQuadTree, reporter: Reporter<'a>) -> Self {
        Self {
            tree,
            ancestors: Vec::new(),
            reporter,
        }
    }

    /// Run the pass from the root. The ancestor stack is empty again afterwards.
    pub(crate) fn run(&mut self) {
        self.visit(Address::ROOT);
        debug_assert!(self.ancestors.is_empty(), "ancestor stack leaked items");
    }

    fn visit(&mut self, address: Address) {
        let tree = self.tree;
        let Some(bucket) = tree.bucket_at(address) else {
            return;
        };
        let before = self.ancestors.len();

        for id in bucket.ids() {
            let Some(a) = self.reporter.candidate(id) else {
                continue;
            };
            for other in bucket.newer_than(id) {
                if let Some(b) = self.reporter.candidate(other) {
                    self.reporter.test(&a, &b);
                }
            }
            for b in &self.ancestors {
                self.reporter.test(&a, b);
            }
        }

        if address.level < tree.depth() {
            for id in bucket.ids() {
                if let Some(c) = self.reporter.candidate(id) {
                    self.ancestors.push(c);
                }
            }
            for child in address.children() {
                let len = self.ancestors.len();
                self.visit(child);
                debug_assert_eq!(self.ancestors.len(), len, "child visit must restore the stack");
            }
            self.ancestors.truncate(before);
        }
    }

    #[cfg(test)]
    pub(crate) fn ancestors_len(&self) -> usize {
        self.ancestors.len()
    }
}

/// Items overlapping `query`: the ancestors of the query's node, then the node
/// and all its descendants.
pub(crate) fn probe(
    tree: &LinearQuadTree,
    slots: &BTreeMap<ItemId, Slot>,
    query: Rect,
) -> Vec<ItemId> {
    let address = tree.codec().placement(&crate::rect_to_aabb(query));
    let mut hits = Vec::new();

    let mut up = address.parent();
    while let Some(a) = up {
        collect(tree, slots, a, query, &mut hits);
        up = a.parent();
    }
    collect_subtree(tree, slots, address, query, &mut hits);
    hits
}

fn collect(
    tree: &LinearQuadTree,
    slots: &BTreeMap<ItemId, Slot>,
    address: Address,
    query: Rect,
    hits: &mut Vec<ItemId>,
) {
    let Some(bucket) = tree.bucket_at(address) else {
        return;
    };
    for id in bucket.newest_first() {
        if slots
            .get(&id)
            .is_some_and(|s| contact::overlaps(&query, &s.item.bounds))
        {
            hits.push(id);
        }
    }
}

fn collect_subtree(
    tree: &LinearQuadTree,
    slots: &BTreeMap<ItemId, Slot>,
    address: Address,
    query: Rect,
    hits: &mut Vec<ItemId>,
) {
    collect(tree, slots, address, query, hits);
    if address.level < tree.depth() {
        for child in address.children() {
            collect_subtree(tree, slots, child, query, hits);
        }
    }
}
