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

/// Statistics collected during a mapping run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapperStatistics {
    /// Number of project parts the run looked at.
    pub parts_considered: usize,
    /// Number of parts that received all the slots they need.
    pub parts_placed: usize,
    /// Number of parts that could not be placed, for any reason.
    pub num_unplaced: usize,
    /// Number of unplaced parts that have no package description.
    pub num_unpackaged: usize,
    /// Number of parts that had to be split over several feed sets.
    pub parts_split: usize,
    /// Number of slots bound to a part, preset slots included.
    pub slots_reserved: usize,
    /// Number of slots reused because the host already held the part there.
    pub preset_slots: usize,
    /// Number of slots protected from modification.
    pub protected_slots: usize,
    /// Total duration of the run.
    pub map_duration: std::time::Duration,
}

impl std::fmt::Display for MapperStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mapper Statistics:")?;
        writeln!(f, "  Parts Considered: {}", self.parts_considered)?;
        writeln!(f, "  Parts Placed: {}", self.parts_placed)?;
        writeln!(f, "  Parts Unplaced: {}", self.num_unplaced)?;
        writeln!(f, "  Parts Without Package: {}", self.num_unpackaged)?;
        writeln!(f, "  Parts Split: {}", self.parts_split)?;
        writeln!(f, "  Slots Reserved: {}", self.slots_reserved)?;
        writeln!(f, "  Preset Slots: {}", self.preset_slots)?;
        writeln!(f, "  Protected Slots: {}", self.protected_slots)?;
        writeln!(
            f,
            "  Map Duration (secs): {:.3}",
            self.map_duration.as_secs_f64()
        )
    }
}

/// Builder for `MapperStatistics`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapperStatisticsBuilder {
    stats: MapperStatistics,
}

impl MapperStatisticsBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn parts_considered(mut self, parts_considered: usize) -> Self {
        self.stats.parts_considered = parts_considered;
        self
    }

    #[inline]
    pub fn parts_placed(mut self, parts_placed: usize) -> Self {
        self.stats.parts_placed = parts_placed;
        self
    }

    #[inline]
    pub fn num_unplaced(mut self, num_unplaced: usize) -> Self {
        self.stats.num_unplaced = num_unplaced;
        self
    }

    #[inline]
    pub fn num_unpackaged(mut self, num_unpackaged: usize) -> Self {
        self.stats.num_unpackaged = num_unpackaged;
        self
    }

    #[inline]
    pub fn parts_split(mut self, parts_split: usize) -> Self {
        self.stats.parts_split = parts_split;
        self
    }

    #[inline]
    pub fn slots_reserved(mut self, slots_reserved: usize) -> Self {
        self.stats.slots_reserved = slots_reserved;
        self
    }

    #[inline]
    pub fn preset_slots(mut self, preset_slots: usize) -> Self {
        self.stats.preset_slots = preset_slots;
        self
    }

    #[inline]
    pub fn protected_slots(mut self, protected_slots: usize) -> Self {
        self.stats.protected_slots = protected_slots;
        self
    }

    /// Sets the total run duration.
    #[inline]
    pub fn map_duration(mut self, map_duration: std::time::Duration) -> Self {
        self.stats.map_duration = map_duration;
        self
    }

    #[inline]
    pub fn build(self) -> MapperStatistics {
        self.stats
    }
}

/// Counters produced when an allocation is written back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyStatistics {
    /// Slots visited.
    pub processed: usize,
    /// Slots enabled and configured with a part.
    pub enabled: usize,
    /// Free slots disabled.
    pub disabled: usize,
    /// Protected slots left as they were.
    pub untouched: usize,
}

impl std::fmt::Display for ApplyStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed {} slots: {} enabled, {} disabled, {} untouched",
            self.processed, self.enabled, self.disabled, self.untouched
        )
    }
}
