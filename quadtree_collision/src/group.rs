// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connected components of overlapping items within one detection pass.
//!
//! Groups are merged by reassigning every member of the higher-numbered group
//! to the lower one, so a merge costs O(size of the absorbed group). There is no
//! path compression; the table is rebuilt from scratch on every pass.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use quadtree_index::ItemId;

/// Identifier of a group. Only meaningful until the next detection pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(u32);

impl GroupId {
    /// Raw numeric value. The first group of a pass is `1`.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Group table: group id → ordered members, plus the reverse lookup.
#[derive(Clone, Debug, Default)]
pub struct Groups {
    members: BTreeMap<GroupId, Vec<ItemId>>,
    group_of: BTreeMap<ItemId, GroupId>,
    last: u32,
}

impl Groups {
    /// Drop every group and restart numbering.
    pub fn clear(&mut self) {
        self.members.clear();
        self.group_of.clear();
        self.last = 0;
    }

    /// Record that `a` and `b` overlap.
    pub fn report(&mut self, a: ItemId, b: ItemId) {
        let ga = self.group_of.get(&a).copied();
        let gb = self.group_of.get(&b).copied();
        match (ga, gb) {
            (None, None) => {
                self.last += 1;
                let g = GroupId(self.last);
                self.group_of.insert(a, g);
                self.group_of.insert(b, g);
                self.members.insert(g, vec![a, b]);
            }
            (Some(g), None) => self.join(g, b),
            (None, Some(g)) => self.join(g, a),
            (Some(ga), Some(gb)) if ga == gb => {}
            (Some(ga), Some(gb)) => {
                let (keep, absorb) = if ga < gb { (ga, gb) } else { (gb, ga) };
                let moved = self.members.remove(&absorb).unwrap_or_default();
                for &m in &moved {
                    self.group_of.insert(m, keep);
                }
                self.members.entry(keep).or_default().extend(moved);
            }
        }
    }

    fn join(&mut self, g: GroupId, item: ItemId) {
        self.group_of.insert(item, g);
        self.members.entry(g).or_default().push(item);
    }

    /// Members of a group, in the order they joined.
    pub fn get(&self, id: GroupId) -> Option<&[ItemId]> {
        self.members.get(&id).map(Vec::as_slice)
    }

    /// The group an item belongs to, if it overlapped anything.
    pub fn group_of(&self, item: ItemId) -> Option<GroupId> {
        self.group_of.get(&item).copied()
    }

    /// All groups in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &[ItemId])> + '_ {
        self.members.iter().map(|(g, m)| (*g, m.as_slice()))
    }

    /// Number of live groups.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if no overlap was reported since the last clear.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<ItemId> {
        (0..n).map(ItemId::from_raw).collect()
    }

    #[test]
    fn pair_then_join() {
        let i = ids(3);
        let mut g = Groups::default();
        g.report(i[0], i[1]);
        let first = g.group_of(i[0]).unwrap();
        assert_eq!(first.get(), 1);
        g.report(i[2], i[1]);
        assert_eq!(g.group_of(i[2]), Some(first));
        assert_eq!(g.get(first).unwrap(), &[i[0], i[1], i[2]]);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn merge_keeps_lower_id() {
        let i = ids(4);
        let mut g = Groups::default();
        g.report(i[0], i[1]);
        g.report(i[2], i[3]);
        assert_eq!(g.len(), 2);
        // Report in high-then-low order; the lower id must still win.
        g.report(i[3], i[0]);
        assert_eq!(g.len(), 1);
        let (only, members) = g.iter().next().unwrap();
        assert_eq!(only.get(), 1);
        assert_eq!(members, &[i[0], i[1], i[2], i[3]]);
        assert!(i.iter().all(|&m| g.group_of(m) == Some(only)));
        assert!(g.get(GroupId(2)).is_none(), "absorbed group is deleted");
    }

    #[test]
    fn repeated_pair_is_a_no_op() {
        let i = ids(2);
        let mut g = Groups::default();
        g.report(i[0], i[1]);
        g.report(i[1], i[0]);
        assert_eq!(g.get(GroupId(1)).unwrap().len(), 2);
    }

    #[test]
    fn clear_restarts_numbering() {
        let i = ids(4);
        let mut g = Groups::default();
        g.report(i[0], i[1]);
        g.report(i[2], i[3]);
        g.clear();
        assert!(g.is_empty());
        assert_eq!(g.group_of(i[0]), None);
        g.report(i[2], i[3]);
        assert_eq!(g.group_of(i[2]).map(GroupId::get), Some(1));
    }
}
