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

//! Grouping of host slots into feed sets.
//!
//! Slots are clustered by name: two slots belong together when their names
//! only differ towards the end, the way `8mmLeft_01` and `8mmLeft_14` do. The
//! clustering is a greedy single pass over the host inventory, so the result
//! is fully determined by the order in which the host lists its slots.

use crate::{
    feedset::{FeedSet, SlotMove},
    index::{FeedSetIndex, SlotIndex},
    package::PackageDescription,
    slot::{HostSlot, Location, Slot},
};

/// Default name distance under which two slots share a feed set.
pub const FEED_SET_NAME_MAX_DISTANCE: usize = 3;

/// Returns how far apart two slot names are.
///
/// The distance is the length of the longer name minus the position of the
/// first character where the names diverge. Identical names are `0` apart.
///
/// ```rust
/// use reelmap_model::grouping::name_distance;
///
/// assert_eq!(name_distance("8mmLeft_01", "8mmLeft_02"), 1);
/// assert_eq!(name_distance("8mmLeft_01", "8mmLeft_12"), 2);
/// assert_eq!(name_distance("8mmLeft_01", "8mmRight_01"), 8);
/// assert_eq!(name_distance("same", "same"), 0);
/// ```
pub fn name_distance(a: &str, b: &str) -> usize {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let max_len = len_a.max(len_b);
    match a.chars().zip(b.chars()).position(|(x, y)| x != y) {
        Some(diverge) => max_len - diverge,
        None => max_len - len_a.min(len_b),
    }
}

/// All feed sets of the machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemFeeds {
    sets: Vec<FeedSet>,
}

impl SystemFeeds {
    /// Groups the supported slots of a host inventory and computes each slot's
    /// distance from the workspace centroid.
    pub fn from_inventory(inventory: &[HostSlot], max_name_distance: usize) -> Self {
        let slots = inventory
            .iter()
            .filter(|host| host.kind.is_supported())
            .map(Slot::from_host);
        let mut feeds = Self::group(slots, max_name_distance);
        feeds.assign_centroid_distances();
        feeds
    }

    /// Groups already built slots by name, skipping unsupported kinds.
    pub fn group<I>(slots: I, max_name_distance: usize) -> Self
    where
        I: IntoIterator<Item = Slot>,
    {
        let mut sets: Vec<FeedSet> = Vec::new();
        for slot in slots {
            if !slot.kind().is_supported() {
                continue;
            }

            let home = sets.iter().position(|set| {
                set.slots()
                    .iter()
                    .any(|member| name_distance(member.name(), slot.name()) <= max_name_distance)
            });

            match home {
                Some(pos) => {
                    tracing::trace!(slot = %slot.name(), set = %sets[pos].name(), "joining feed set");
                    sets[pos].push(slot);
                }
                None => {
                    tracing::debug!(set = %slot.name(), "creating feed set");
                    let mut set = FeedSet::new(slot.name());
                    set.push(slot);
                    sets.push(set);
                }
            }
        }

        Self { sets }
    }

    /// Mean location of all located slots, or `None` if fewer than two have one.
    pub fn centroid(&self) -> Option<Location> {
        let (count, x, y) = self
            .sets
            .iter()
            .flat_map(|set| set.slots())
            .filter_map(|slot| slot.location())
            .fold((0usize, 0.0f64, 0.0f64), |(n, x, y), loc| {
                (n + 1, x + loc.x, y + loc.y)
            });

        if count < 2 {
            return None;
        }
        Some(Location::new(x / count as f64, y / count as f64))
    }

    /// Sets every located slot's distance from the workspace centroid.
    ///
    /// Without a centroid the slots keep their default distance.
    pub fn assign_centroid_distances(&mut self) {
        let Some(centroid) = self.centroid() else {
            tracing::debug!("fewer than two located slots, keeping default distances");
            return;
        };

        for slot in self.sets.iter_mut().flat_map(|set| set.slots_mut()) {
            if let Some(location) = slot.location() {
                slot.set_distance_from_centroid(centroid.distance_to(&location));
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total number of slots over all sets.
    pub fn num_slots(&self) -> usize {
        self.sets.iter().map(FeedSet::len).sum()
    }

    /// Returns the set at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn get(&self, index: FeedSetIndex) -> &FeedSet {
        &self.sets[index.get()]
    }

    /// Returns the set at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: FeedSetIndex) -> &mut FeedSet {
        &mut self.sets[index.get()]
    }

    /// Sets in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (FeedSetIndex, &FeedSet)> + '_ {
        self.sets
            .iter()
            .enumerate()
            .map(|(i, set)| (FeedSetIndex::new(i), set))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FeedSet> + '_ {
        self.sets.iter_mut()
    }

    /// Finds the set and position of the slot with the given name.
    pub fn find_slot(&self, slot_name: &str) -> Option<(FeedSetIndex, SlotIndex)> {
        self.iter()
            .find_map(|(i, set)| set.find_by_name(slot_name).map(|s| (i, s)))
    }

    /// Finds the set that holds the slot with the given name.
    pub fn find_feed_set_for(&self, slot_name: &str) -> Option<FeedSetIndex> {
        self.find_slot(slot_name).map(|(set, _)| set)
    }

    /// Finds the first set able to hold `quantity` units of `package` on its own.
    pub fn find_set_with_space_for(
        &self,
        quantity: u32,
        package: &PackageDescription,
    ) -> Option<FeedSetIndex> {
        self.iter()
            .find(|(_, set)| set.num_feeds_for(quantity, package) > 0)
            .map(|(i, _)| i)
    }

    /// Compacts every set. Returns the moves made, tagged with their set.
    pub fn compress(&mut self) -> Vec<(FeedSetIndex, SlotMove)> {
        let mut moves = Vec::new();
        for (i, set) in self.sets.iter_mut().enumerate() {
            let index = FeedSetIndex::new(i);
            moves.extend(set.compress().into_iter().map(|m| (index, m)));
        }
        moves
    }

    /// Clears the state of a previous mapping run from every set.
    pub fn reset(&mut self) -> usize {
        self.sets.iter_mut().map(FeedSet::reset).sum()
    }
}
