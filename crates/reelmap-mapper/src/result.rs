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

//! What a mapping run produced: the slots reserved per part and set, the
//! parts left without slots, and the run statistics.

use crate::stats::MapperStatistics;
use reelmap_model::{
    feedset::{Neighbours, SlotMove},
    index::{FeedSetIndex, PartIndex},
};

/// Slots of one feed set bound to one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub part: PartIndex,
    pub part_id: String,
    pub feed_set: FeedSetIndex,
    /// Bound slots, in the order they were collected around the seed.
    pub slots: Neighbours,
    /// Units of the part this reservation was asked to hold.
    pub quantity: u32,
    /// Units the bound slots can actually hold.
    pub capacity: u32,
    /// `true` if the slots already held the part on the host.
    pub preset: bool,
}

impl std::fmt::Display for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({} slots, {}/{} units{})",
            self.part_id,
            self.feed_set,
            self.slots.len(),
            self.quantity,
            self.capacity,
            if self.preset { ", preset" } else { "" }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnplacedReason {
    /// No package description matches the part's package.
    NoPackage,
    /// The available slots cannot hold the batch quantity.
    NoSpace,
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::NoPackage => write!(f, "No Package Description"),
            UnplacedReason::NoSpace => write!(f, "No Space"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnplacedPart {
    pub part: PartIndex,
    pub part_id: String,
    pub reason: UnplacedReason,
}

impl std::fmt::Display for UnplacedPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.part_id, self.reason)
    }
}

/// Everything a mapping run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOutcome {
    pub reservations: Vec<Reservation>,
    pub unplaced: Vec<UnplacedPart>,
    pub statistics: MapperStatistics,
}

impl MappingOutcome {
    #[inline]
    pub fn new(
        reservations: Vec<Reservation>,
        unplaced: Vec<UnplacedPart>,
        statistics: MapperStatistics,
    ) -> Self {
        Self {
            reservations,
            unplaced,
            statistics,
        }
    }

    /// Number of parts that could not be placed.
    #[inline]
    pub fn num_unplaced(&self) -> usize {
        self.unplaced.len()
    }

    /// Returns `true` if every part found its slots.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Reservations made for `part`, in the order they were made.
    pub fn reservations_for(&self, part: PartIndex) -> impl Iterator<Item = &Reservation> + '_ {
        self.reservations.iter().filter(move |r| r.part == part)
    }

    /// Total units reserved for `part` over all its reservations.
    pub fn capacity_for(&self, part: PartIndex) -> u32 {
        self.reservations_for(part).map(|r| r.capacity).sum()
    }

    /// Rewrites the reserved slot lists after compaction moved assignments.
    ///
    /// `moves` must be in the order they were made, as returned by
    /// `WorkspaceMapper::compress`.
    pub fn follow_moves(&mut self, moves: &[(FeedSetIndex, SlotMove)]) {
        for &(feed_set, SlotMove { from, to }) in moves {
            for reservation in self.reservations.iter_mut().filter(|r| r.feed_set == feed_set) {
                for slot in reservation.slots.iter_mut().filter(|s| **s == from) {
                    *slot = to;
                }
            }
        }
    }
}

impl std::fmt::Display for MappingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} reservations, {} unplaced parts",
            self.reservations.len(),
            self.unplaced.len()
        )?;
        for reservation in &self.reservations {
            writeln!(f, "  {}", reservation)?;
        }
        for unplaced in &self.unplaced {
            writeln!(f, "  UNPLACED {}", unplaced)?;
        }
        Ok(())
    }
}
