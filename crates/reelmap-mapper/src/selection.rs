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

//! Choosing where a part goes.
//!
//! Two questions are answered here, both without mutating anything:
//!
//! * **Set selection**: which single feed set should hold a part's whole batch?
//!   Every set that can hold it is scored by `(prefers, slots, distance, waste)`
//!   and the ranking is then adjusted by a couple of tie-breaking rules.
//! * **Split planning**: when no single set can, how should the batch be
//!   divided over several sets?

use reelmap_model::{grouping::SystemFeeds, index::FeedSetIndex, package::PackageDescription};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// How well a feed set suits a part's batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetScore {
    pub feed_set: FeedSetIndex,
    /// The set already leans towards the part's package.
    pub prefers: bool,
    /// Slots the batch would use.
    pub slots: usize,
    /// Distance of the set's nearest available slot from the workspace centroid.
    pub distance: f64,
    /// Batch quantity modulo the per-slot capacity.
    pub wasted: u32,
}

impl SetScore {
    fn rank(&self, other: &Self) -> Ordering {
        (!self.prefers)
            .cmp(&!other.prefers)
            .then(self.slots.cmp(&other.slots))
            .then(self.distance.total_cmp(&other.distance))
            .then(self.wasted.cmp(&other.wasted))
    }
}

/// Scores every set able to hold `quantity` units of `package` on its own,
/// best first. Equal scores keep the set creation order.
pub fn score_sets(
    feeds: &SystemFeeds,
    quantity: u32,
    package: &PackageDescription,
    restrict_to_enabled: bool,
) -> Vec<SetScore> {
    let mut scores: Vec<SetScore> = feeds
        .iter()
        .filter_map(|(index, set)| {
            let slots = set.num_feeds_for(quantity, package);
            if slots == 0 {
                return None;
            }
            let seed = set.find_nearest_available(restrict_to_enabled)?;
            let per_slot = set.space_per_feed_for(package);
            Some(SetScore {
                feed_set: index,
                prefers: set.prefers_package(package),
                slots,
                distance: set.slot(seed).distance_from_centroid(),
                wasted: if per_slot == 0 { 0 } else { quantity % per_slot },
            })
        })
        .collect();

    scores.sort_by(SetScore::rank);
    scores
}

/// Picks the set a batch should go to from a ranking produced by [`score_sets`].
///
/// With a single preferring set, a runner-up that needs as many slots but
/// wastes less wins. Without any preference, a completely empty set is taken
/// among those needing the fewest slots, so that partially filled sets stay
/// open for their own packages.
pub fn select_set(feeds: &SystemFeeds, scores: &[SetScore]) -> Option<FeedSetIndex> {
    let top = scores.first()?;

    let num_preferring = scores.iter().filter(|s| s.prefers).count();
    if num_preferring > 0 {
        if num_preferring == 1 {
            if let Some(second) = scores.get(1) {
                if second.slots == top.slots && second.wasted < top.wasted {
                    return Some(second.feed_set);
                }
            }
        }
        return Some(top.feed_set);
    }

    let min_slots = scores.iter().map(|s| s.slots).min().unwrap_or(top.slots);
    let empty = scores
        .iter()
        .filter(|s| s.slots == min_slots)
        .find(|s| feeds.get(s.feed_set).num_reserved() == 0);

    Some(empty.unwrap_or(top).feed_set)
}

/// A set taking part in a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCandidate {
    pub feed_set: FeedSetIndex,
    /// Slots needed to fill the set's whole capacity.
    pub slots_for_capacity: usize,
    /// Batch quantity minus the set's capacity (negative when the set could hold more).
    pub leftover: i64,
    pub capacity: u32,
    pub prefers: bool,
}

/// One step of a split: put `quantity` units into `feed_set`.
pub type SplitPlan = SmallVec<[(FeedSetIndex, u32); 4]>;

/// Divides `quantity` units of `package` over several sets.
///
/// Sets are consumed largest capacity first (smallest leftover), then fewest
/// slots, then preferring sets. Returns `None` if all sets together cannot
/// hold the batch.
pub fn plan_split(
    feeds: &SystemFeeds,
    quantity: u32,
    package: &PackageDescription,
) -> Option<SplitPlan> {
    let mut candidates: Vec<SplitCandidate> = feeds
        .iter()
        .filter_map(|(index, set)| {
            let capacity = set.holds_up_to(package);
            if capacity == 0 {
                return None;
            }
            Some(SplitCandidate {
                feed_set: index,
                slots_for_capacity: set.num_feeds_for(capacity, package),
                leftover: i64::from(quantity) - i64::from(capacity),
                capacity,
                prefers: set.prefers_package(package),
            })
        })
        .collect();

    let total: u64 = candidates.iter().map(|c| u64::from(c.capacity)).sum();
    if total < u64::from(quantity) {
        tracing::debug!(quantity, total, package = %package.name(), "not enough space over all sets");
        return None;
    }

    candidates.sort_by(|a, b| {
        a.leftover
            .cmp(&b.leftover)
            .then(a.slots_for_capacity.cmp(&b.slots_for_capacity))
            .then((!a.prefers).cmp(&!b.prefers))
    });

    let mut plan = SplitPlan::new();
    let mut remaining = quantity;
    for candidate in candidates {
        if remaining == 0 {
            break;
        }
        let take = candidate.capacity.min(remaining);
        plan.push((candidate.feed_set, take));
        remaining -= take;
    }

    Some(plan)
}
