// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Feed sets: slots sharing a rail and a naming scheme.
//!
//! A `FeedSet` keeps its slots in insertion order (which decides tie-breaks,
//! e.g. when two slots are equally close to the workspace centroid) and a
//! derived name-sorted order, which stands in for physical adjacency. Slots
//! named `8mmLeft_01 .. 8mmLeft_14` sit next to each other on the machine in
//! that order, so "neighbours" and "compaction" are defined on the sorted
//! names.
//!
//! All slots of a set are assumed to share their physical dimensions. Queries
//! that need a per-slot capacity sample the first available slot.

use crate::{
    index::{PartIndex, SlotIndex},
    package::PackageDescription,
    slot::Slot,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Slots returned by a neighbour search, in the order they were collected.
pub type Neighbours = SmallVec<[SlotIndex; 8]>;

/// An assignment carried from one slot to another by [`FeedSet::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMove {
    pub from: SlotIndex,
    pub to: SlotIndex,
}

/// Per-package occupancy of the bound slots of a set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageOccupancy {
    /// Distinct packages, in the order they were first seen (name order).
    packages: Vec<Arc<PackageDescription>>,
    counts: FxHashMap<String, usize>,
}

impl PackageOccupancy {
    #[inline]
    pub fn packages(&self) -> &[Arc<PackageDescription>] {
        &self.packages
    }

    /// Number of bound slots holding the named package.
    #[inline]
    pub fn count(&self, package_name: &str) -> usize {
        self.counts.get(package_name).copied().unwrap_or(0)
    }

    /// Number of distinct packages held.
    #[inline]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    #[inline]
    pub fn max_count(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0)
    }

    fn record(&mut self, package: &Arc<PackageDescription>) {
        match self.counts.get_mut(package.name()) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(package.name().to_owned(), 1);
                self.packages.push(Arc::clone(package));
            }
        }
    }
}

/// A named group of feed slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSet {
    name: String,
    slots: Vec<Slot>,
    by_name: FxHashMap<String, SlotIndex>,
    ordered: Vec<SlotIndex>,
}

impl FeedSet {
    /// Creates an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            by_name: FxHashMap::default(),
            ordered: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a slot. Returns `None` if a slot of the same name is already present.
    pub fn push(&mut self, slot: Slot) -> Option<SlotIndex> {
        if self.by_name.contains_key(slot.name()) {
            tracing::warn!(set = %self.name, slot = %slot.name(), "duplicate slot name ignored");
            return None;
        }

        let index = SlotIndex::new(self.slots.len());
        self.by_name.insert(slot.name().to_owned(), index);
        self.slots.push(slot);
        self.rebuild_order();
        Some(index)
    }

    /// Removes a slot from the set for the rest of the run.
    ///
    /// Used for slots that have no feed description: without one they can be
    /// neither sized nor allocated. Indices of later slots shift down by one.
    pub fn remove(&mut self, slot_name: &str) -> Option<Slot> {
        let index = self.by_name.remove(slot_name)?;
        let slot = self.slots.remove(index.get());
        tracing::debug!(set = %self.name, slot = %slot_name, "removing slot");

        self.by_name = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name().to_owned(), SlotIndex::new(i)))
            .collect();
        self.rebuild_order();
        Some(slot)
    }

    fn rebuild_order(&mut self) {
        let slots = &self.slots;
        self.ordered = (0..slots.len()).map(SlotIndex::new).collect();
        self.ordered
            .sort_by(|a, b| slots[a.get()].name().cmp(slots[b.get()].name()));
    }

    #[inline]
    pub fn find_by_name(&self, slot_name: &str) -> Option<SlotIndex> {
        self.by_name.get(slot_name).copied()
    }

    /// Returns the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn slot(&self, index: SlotIndex) -> &Slot {
        &self.slots[index.get()]
    }

    /// Returns the slot at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn slot_mut(&mut self, index: SlotIndex) -> &mut Slot {
        &mut self.slots[index.get()]
    }

    /// Slots in insertion order.
    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slots in insertion order, mutably.
    #[inline]
    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Slot indices in name order.
    #[inline]
    pub fn ordered_indices(&self) -> &[SlotIndex] {
        &self.ordered
    }

    /// Slots in name order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.ordered.iter().map(move |i| &self.slots[i.get()])
    }

    pub fn num_available(&self) -> usize {
        self.slots.iter().filter(|s| s.available()).count()
    }

    /// Number of slots that are not available (bound or protected).
    pub fn num_reserved(&self) -> usize {
        self.slots.len() - self.num_available()
    }

    /// Counts which packages the bound slots of this set hold.
    pub fn packages_inserted(&self) -> PackageOccupancy {
        let mut occupancy = PackageOccupancy::default();
        for slot in self.iter_ordered() {
            if slot.available() {
                continue;
            }
            if let Some(package) = slot.associated_package() {
                occupancy.record(package);
            }
        }
        occupancy
    }

    /// Returns `true` if the set already leans towards holding `package`.
    ///
    /// An empty set has no preference. A set whose slots cannot carry the
    /// package never prefers it. Otherwise the set prefers the package when it
    /// is the only package held, or when no other package occupies more slots.
    pub fn prefers_package(&self, package: &PackageDescription) -> bool {
        let occupancy = self.packages_inserted();
        if occupancy.is_empty() {
            return false;
        }

        match self.slots.iter().find(|s| s.available()) {
            Some(sample) if sample.can_carry(package) => {}
            _ => return false,
        }

        let target = occupancy.count(package.name());
        if target == 0 {
            return false;
        }

        if occupancy.len() == 1 {
            return true;
        }

        target >= occupancy.max_count()
    }

    /// Finds the available slot closest to the workspace centroid.
    ///
    /// Ties go to the slot inserted first.
    pub fn find_nearest_available(&self, restrict_to_enabled: bool) -> Option<SlotIndex> {
        let mut nearest: Option<(SlotIndex, f64)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.available() || (restrict_to_enabled && !slot.is_enabled()) {
                continue;
            }
            let distance = slot.distance_from_centroid();
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((SlotIndex::new(i), distance)),
            }
        }
        nearest.map(|(index, _)| index)
    }

    /// Returns how many slots `quantity` units of `package` would use in this
    /// set, or `0` if the available slots cannot hold them all.
    pub fn num_feeds_for(&self, quantity: u32, package: &PackageDescription) -> usize {
        let mut remaining = quantity;
        let mut num_feeds = 0;
        for slot in &self.slots {
            if !slot.available() || slot.feed_description().is_none() {
                continue;
            }
            let can_hold = slot.holds_up_to(package);
            if can_hold == 0 {
                continue;
            }
            num_feeds += 1;
            if can_hold >= remaining {
                return num_feeds;
            }
            remaining -= can_hold;
        }
        0
    }

    /// Total units of `package` the available slots of this set can hold.
    pub fn holds_up_to(&self, package: &PackageDescription) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.available() && s.can_carry(package))
            .map(|s| s.holds_up_to(package))
            .fold(0u32, |acc, n| acc.saturating_add(n))
    }

    /// Units of `package` a single slot of this set holds.
    pub fn space_per_feed_for(&self, package: &PackageDescription) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.available() && s.feed_description().is_some())
            .map(|s| s.holds_up_to(package))
            .find(|&n| n > 0)
            .unwrap_or(0)
    }

    /// Collects up to `num_needed` available slots around `seed`.
    ///
    /// In name order, the start position is pulled back from the seed until a
    /// window of `num_needed` slots fits before the end of the set. Available
    /// slots are then collected forward from the start, and if that runs
    /// short, backward from just before the start.
    ///
    /// The result never exceeds `num_needed`, contains the seed when the seed
    /// is available, and is exactly `num_needed` long whenever the set has
    /// that many available slots.
    pub fn neighbours(&self, seed: SlotIndex, num_needed: usize) -> Neighbours {
        let mut found = Neighbours::new();
        if num_needed == 0 {
            return found;
        }

        let Some(seed_pos) = self.ordered.iter().position(|&i| i == seed) else {
            return found;
        };

        let len = self.ordered.len();
        let mut start = seed_pos;
        while start > 0 && start + num_needed > len {
            start -= 1;
        }

        for &index in &self.ordered[start..] {
            if found.len() == num_needed {
                break;
            }
            if self.slots[index.get()].available() {
                found.push(index);
            }
        }

        if found.len() < num_needed {
            for &index in self.ordered[..start].iter().rev() {
                if found.len() == num_needed {
                    break;
                }
                if self.slots[index.get()].available() {
                    found.push(index);
                }
            }
        }

        found
    }

    /// Binds `index` to a part.
    #[inline]
    pub fn assign(&mut self, index: SlotIndex, part: PartIndex, package: Arc<PackageDescription>) {
        self.slots[index.get()].set_part(part, package);
    }

    /// Frees every non-preset slot bound to `part`. Returns how many were freed.
    pub fn release_part(&mut self, part: PartIndex) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            if slot.associated_part() == Some(part) && !slot.is_preset() && !slot.leave_unmodified()
            {
                slot.clear();
                released += 1;
            }
        }
        released
    }

    /// Pulls bound slots towards the start of the set, closing the gaps.
    ///
    /// Protected and preset slots stay where they are; other assignments keep
    /// their relative order. Returns the moves made, in the order they happened,
    /// so that anything holding slot indices can follow them.
    pub fn compress(&mut self) -> Vec<SlotMove> {
        let mut moves = Vec::new();
        if self.num_reserved() == 0 {
            tracing::debug!(set = %self.name, "nothing to compress, set is empty");
            return moves;
        }
        if self.num_available() == 0 {
            tracing::debug!(set = %self.name, "nothing to compress, set is full");
            return moves;
        }

        let order = self.ordered.clone();
        for (pos, &target) in order.iter().enumerate() {
            if !self.slots[target.get()].available() {
                continue;
            }
            let next_in_use = order[pos + 1..]
                .iter()
                .copied()
                .find(|i| self.slots[i.get()].is_movable());
            if let Some(source) = next_in_use {
                let (from, to) = self.pair_mut(source, target);
                from.move_to(to);
                moves.push(SlotMove {
                    from: source,
                    to: target,
                });
            }
        }

        tracing::debug!(set = %self.name, moved = moves.len(), "feed set compressed");
        moves
    }

    /// Drops every assignment and flag a mapping run may have set: bindings,
    /// preset marks and protection. Returns the number of slots that changed.
    pub fn reset(&mut self) -> usize {
        let mut changed = 0;
        for slot in &mut self.slots {
            if slot.assignment().is_some() || slot.leave_unmodified() || slot.is_preset() {
                slot.reset();
                changed += 1;
            }
        }
        changed
    }

    fn pair_mut(&mut self, a: SlotIndex, b: SlotIndex) -> (&mut Slot, &mut Slot) {
        let (a, b) = (a.get(), b.get());
        assert_ne!(a, b, "called `FeedSet::pair_mut` with identical indices");
        if a < b {
            let (lo, hi) = self.slots.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }
}

impl std::fmt::Display for FeedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.len())
    }
}
