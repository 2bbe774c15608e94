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

//! The mapping run.
//!
//! `WorkspaceMapper::map` walks the project parts, highest per-board quantity
//! first, and binds each one to slots:
//!
//! 1. **Preflight**: the context must hold descriptions and an acceptable
//!    project, and at least one board must be built. Nothing is touched
//!    otherwise. Bindings and flags left by an earlier run are then dropped,
//!    so every run starts from the host's snapshot.
//! 2. **Preset slots** (optional): slots the host already has configured with
//!    a part are bound to it first. Only the shortfall continues below.
//! 3. **Protection** (optional): slots holding some other part on the host
//!    are marked untouchable, fiducials and homing targets excepted.
//! 4. **Placement**: each part goes to the best single feed set if one can
//!    hold its batch, otherwise (if spreading is allowed) over several sets.
//!    A part that cannot be placed in full is not placed at all.
//!
//! After a run, `compress`, `apply` and `report` operate on the resulting
//! bindings. `compress` moves assignments between slots; pass its moves to
//! `MappingOutcome::follow_moves` to keep an outcome in step with the feeds.

use crate::{
    context::AllocationContext,
    host::{self, HostInventory},
    report::FeedReport,
    result::{MappingOutcome, Reservation, UnplacedPart, UnplacedReason},
    selection,
    stats::{ApplyStatistics, MapperStatisticsBuilder},
};
use reelmap_model::{
    feedset::{Neighbours, SlotMove},
    grouping::SystemFeeds,
    index::{FeedSetIndex, PartIndex, SlotIndex},
    package::PackageDescription,
    part::ProjectPart,
    partmap::PartMap,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::{sync::Arc, time::Instant};

/// Host part ids containing one of these (case-insensitive) never protect their slot.
const UNPROTECTED_PART_MARKERS: [&str; 2] = ["fiduc", "home"];

/// Slot addresses across the whole machine.
type SlotRefs = SmallVec<[(FeedSetIndex, SlotIndex); 4]>;

/// Reasons a run refuses to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapperError {
    #[error("workspace is not ready: descriptions and an acceptable project are required")]
    NotReady,
    #[error("the number of boards must be at least 1")]
    InvalidBoardCount,
}

/// Drives mapping runs over an [`AllocationContext`].
#[derive(Debug)]
pub struct WorkspaceMapper<'a> {
    context: &'a mut AllocationContext,
}

impl<'a> WorkspaceMapper<'a> {
    #[inline]
    pub fn new(context: &'a mut AllocationContext) -> Self {
        Self { context }
    }

    #[inline]
    pub fn context(&self) -> &AllocationContext {
        self.context
    }

    /// Allocates slots for every project part, for a batch of `num_boards`.
    ///
    /// # Errors
    ///
    /// Returns `MapperError::NotReady` if the context is missing descriptions
    /// or an acceptable project, and `MapperError::InvalidBoardCount` when
    /// `num_boards` is zero. The context is left untouched in both cases.
    pub fn map(&mut self, num_boards: u32) -> Result<MappingOutcome, MapperError> {
        if !self.context.is_ready() {
            tracing::warn!("mapping refused, workspace is not ready");
            return Err(MapperError::NotReady);
        }
        if num_boards == 0 {
            tracing::warn!("mapping refused, no boards to build");
            return Err(MapperError::InvalidBoardCount);
        }

        let start = Instant::now();
        let (feeds, project, config) = self.context.split_mut();
        let project = project.ok_or(MapperError::NotReady)?;

        let cleared = feeds.reset();
        if cleared > 0 {
            tracing::debug!(slots = cleared, "cleared bindings of the previous run");
        }

        tracing::info!(
            parts = project.num_mapped(),
            num_boards,
            "mapping project to feeds"
        );

        let mut run = MappingRun::new(feeds, project, config.restrict_to_enabled);
        let mut remaining: Vec<u32> = project
            .parts()
            .iter()
            .map(|p| p.quantity_per_board().saturating_mul(num_boards))
            .collect();

        if config.map_to_preset_feeders {
            run.bind_preset_slots(&mut remaining);
        }
        if config.leave_associated_untouched {
            run.protect_associated_slots();
        }

        for (index, part) in project.iter() {
            run.place(index, part, remaining[index.get()], config.allow_part_spreading);
        }

        let outcome = run.finish(start);
        tracing::info!(
            placed = outcome.statistics.parts_placed,
            unplaced = outcome.statistics.num_unplaced,
            slots = outcome.statistics.slots_reserved,
            "mapping done"
        );
        Ok(outcome)
    }

    /// Closes the gaps left between bound slots in every feed set.
    ///
    /// Returns the moves made. Reservations of an earlier `MappingOutcome`
    /// still name the slots bound before compaction until they are passed
    /// through [`MappingOutcome::follow_moves`].
    pub fn compress(&mut self) -> Vec<(FeedSetIndex, SlotMove)> {
        let moves = self.context.feeds_mut().compress();
        tracing::info!(moved = moves.len(), "feed sets compressed");
        moves
    }

    /// Writes the current bindings to the host.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the host.
    pub fn apply<H>(&self, host: &mut H) -> Result<Option<ApplyStatistics>, H::Error>
    where
        H: HostInventory + ?Sized,
    {
        match self.context.project() {
            Some(project) => host::apply(self.context.feeds(), project, host).map(Some),
            None => {
                tracing::warn!("nothing to apply, no project attached");
                Ok(None)
            }
        }
    }

    /// A printable view of the current bindings.
    #[inline]
    pub fn report(&self) -> FeedReport<'_> {
        FeedReport::new(self.context.feeds(), self.context.project())
    }
}

/// Book-keeping of a single run.
struct MappingRun<'r> {
    feeds: &'r mut SystemFeeds,
    project: &'r PartMap,
    restrict_to_enabled: bool,
    reservations: Vec<Reservation>,
    unplaced: Vec<UnplacedPart>,
    parts_considered: usize,
    parts_placed: usize,
    parts_split: usize,
    num_unpackaged: usize,
    preset_slots: usize,
    protected_slots: usize,
}

impl<'r> MappingRun<'r> {
    fn new(feeds: &'r mut SystemFeeds, project: &'r PartMap, restrict_to_enabled: bool) -> Self {
        Self {
            feeds,
            project,
            restrict_to_enabled,
            reservations: Vec::new(),
            unplaced: Vec::new(),
            parts_considered: 0,
            parts_placed: 0,
            parts_split: 0,
            num_unpackaged: 0,
            preset_slots: 0,
            protected_slots: 0,
        }
    }

    /// Binds every available slot whose host part is a project part, and
    /// lowers that part's remaining quantity by what the slots hold.
    fn bind_preset_slots(&mut self, remaining: &mut [u32]) {
        let mut by_host_part: FxHashMap<&str, SlotRefs> = FxHashMap::default();
        for (set_index, set) in self.feeds.iter() {
            for (i, slot) in set.slots().iter().enumerate() {
                if let Some(host_part) = slot.host_part() {
                    if slot.available() {
                        by_host_part
                            .entry(host_part)
                            .or_default()
                            .push((set_index, SlotIndex::new(i)));
                    }
                }
            }
        }

        let mut bindings: Vec<(PartIndex, Arc<PackageDescription>, SlotRefs)> = Vec::new();
        for (part_index, part) in self.project.iter() {
            let Some(package) = part.package_description() else {
                continue;
            };
            if remaining[part_index.get()] == 0 {
                continue;
            }
            if let Some(slots) = by_host_part.get(part.id()) {
                bindings.push((part_index, Arc::clone(package), slots.clone()));
            }
        }

        for (part_index, package, slots) in bindings {
            let part_id = self.project.part(part_index).id().to_owned();
            let mut per_set: SmallVec<[Reservation; 2]> = SmallVec::new();

            for (set_index, slot_index) in slots {
                let slot = self.feeds.get_mut(set_index).slot_mut(slot_index);
                slot.set_preset_part(part_index, Arc::clone(&package));
                let capacity = slot.max_capacity();

                match per_set.iter_mut().find(|r| r.feed_set == set_index) {
                    Some(reservation) => {
                        reservation.slots.push(slot_index);
                        reservation.capacity = reservation.capacity.saturating_add(capacity);
                    }
                    None => {
                        let mut slots = Neighbours::new();
                        slots.push(slot_index);
                        per_set.push(Reservation {
                            part: part_index,
                            part_id: part_id.clone(),
                            feed_set: set_index,
                            slots,
                            quantity: 0,
                            capacity,
                            preset: true,
                        });
                    }
                }
                self.preset_slots += 1;
            }

            let needed = &mut remaining[part_index.get()];
            for reservation in per_set {
                let covered = reservation.capacity.min(*needed);
                *needed -= covered;
                tracing::debug!(
                    part = %part_id,
                    set = %self.feeds.get(reservation.feed_set).name(),
                    slots = reservation.slots.len(),
                    capacity = reservation.capacity,
                    "bound preset slots"
                );
                self.reservations.push(Reservation {
                    quantity: covered,
                    ..reservation
                });
            }
        }
    }

    /// Protects every available slot that holds a part on the host, unless the
    /// part is a fiducial or homing target.
    fn protect_associated_slots(&mut self) {
        for set in self.feeds.iter_mut() {
            for slot in set.slots_mut() {
                if !slot.available() {
                    continue;
                }
                let Some(host_part) = slot.host_part() else {
                    continue;
                };
                let lowered = host_part.to_lowercase();
                if UNPROTECTED_PART_MARKERS.iter().any(|m| lowered.contains(m)) {
                    continue;
                }
                tracing::debug!(slot = %slot.name(), part = %host_part, "protecting associated slot");
                slot.set_leave_unmodified(true);
                self.protected_slots += 1;
            }
        }
    }

    fn place(
        &mut self,
        index: PartIndex,
        part: &ProjectPart,
        remaining: u32,
        allow_spreading: bool,
    ) {
        self.parts_considered += 1;

        let Some(package) = part.package_description() else {
            tracing::warn!(part = %part.id(), "no package description, skipping");
            self.num_unpackaged += 1;
            self.mark_unplaced(index, part, UnplacedReason::NoPackage);
            return;
        };

        if part.quantity_per_board() == 0 {
            tracing::debug!(part = %part.id(), "zero quantity, skipping");
            return;
        }

        if remaining == 0 {
            tracing::debug!(part = %part.id(), "fully held by preset slots");
            self.parts_placed += 1;
            return;
        }

        let scores =
            selection::score_sets(self.feeds, remaining, package, self.restrict_to_enabled);
        if let Some(set_index) = selection::select_set(self.feeds, &scores) {
            if let Some(reservation) = self.reserve(set_index, index, part, remaining, package) {
                self.commit(index, part, vec![reservation]);
                return;
            }
        }

        if allow_spreading {
            if let Some(reservations) = self.reserve_split(index, part, remaining, package) {
                if reservations.len() > 1 {
                    self.parts_split += 1;
                }
                self.commit(index, part, reservations);
                return;
            }
        }

        self.mark_unplaced(index, part, UnplacedReason::NoSpace);
    }

    /// Binds enough neighbouring slots of one set to hold `quantity` units.
    ///
    /// Binds nothing and returns `None` if the set cannot supply them all.
    fn reserve(
        &mut self,
        set_index: FeedSetIndex,
        part_index: PartIndex,
        part: &ProjectPart,
        quantity: u32,
        package: &Arc<PackageDescription>,
    ) -> Option<Reservation> {
        let set = self.feeds.get_mut(set_index);
        let seed = set.find_nearest_available(self.restrict_to_enabled)?;

        let per_slot = set.slot(seed).holds_up_to(package);
        if per_slot == 0 {
            tracing::debug!(part = %part.id(), set = %set.name(), "seed slot cannot hold the package");
            return None;
        }

        let needed = quantity.div_ceil(per_slot) as usize;
        let slots = set.neighbours(seed, needed);
        let capacity = slots
            .iter()
            .map(|&s| set.slot(s).holds_up_to(package))
            .fold(0u32, |acc, n| acc.saturating_add(n));

        if slots.len() < needed || capacity < quantity {
            tracing::debug!(
                part = %part.id(),
                set = %set.name(),
                needed,
                found = slots.len(),
                capacity,
                "not enough neighbouring slots"
            );
            return None;
        }

        for &slot in &slots {
            set.assign(slot, part_index, Arc::clone(package));
        }

        tracing::debug!(
            part = %part.id(),
            set = %set.name(),
            slots = slots.len(),
            quantity,
            capacity,
            "reserved slots"
        );

        Some(Reservation {
            part: part_index,
            part_id: part.id().to_owned(),
            feed_set: set_index,
            slots,
            quantity,
            capacity,
            preset: false,
        })
    }

    /// Spreads `quantity` units over several sets, all or nothing.
    fn reserve_split(
        &mut self,
        part_index: PartIndex,
        part: &ProjectPart,
        quantity: u32,
        package: &Arc<PackageDescription>,
    ) -> Option<Vec<Reservation>> {
        let plan = selection::plan_split(self.feeds, quantity, package)?;
        tracing::debug!(part = %part.id(), sets = plan.len(), quantity, "splitting part over sets");

        let mut reservations = Vec::with_capacity(plan.len());
        for (set_index, share) in plan {
            match self.reserve(set_index, part_index, part, share, package) {
                Some(reservation) => reservations.push(reservation),
                None => {
                    for reservation in &reservations {
                        self.feeds.get_mut(reservation.feed_set).release_part(part_index);
                    }
                    tracing::debug!(part = %part.id(), "split failed, bindings rolled back");
                    return None;
                }
            }
        }
        Some(reservations)
    }

    fn commit(&mut self, index: PartIndex, part: &ProjectPart, reservations: Vec<Reservation>) {
        tracing::info!(
            part = %part.id(),
            part_index = index.get(),
            sets = reservations.len(),
            slots = reservations.iter().map(|r| r.slots.len()).sum::<usize>(),
            "part placed"
        );
        self.reservations.extend(reservations);
        self.parts_placed += 1;
    }

    fn mark_unplaced(&mut self, index: PartIndex, part: &ProjectPart, reason: UnplacedReason) {
        tracing::warn!(part = %part.id(), refs = %part.bom_entry().short_references(), %reason, "part not placed");
        self.unplaced.push(UnplacedPart {
            part: index,
            part_id: part.id().to_owned(),
            reason,
        });
    }

    fn finish(self, start: Instant) -> MappingOutcome {
        let slots_reserved = self.reservations.iter().map(|r| r.slots.len()).sum();
        let statistics = MapperStatisticsBuilder::new()
            .parts_considered(self.parts_considered)
            .parts_placed(self.parts_placed)
            .num_unplaced(self.unplaced.len())
            .num_unpackaged(self.num_unpackaged)
            .parts_split(self.parts_split)
            .slots_reserved(slots_reserved)
            .preset_slots(self.preset_slots)
            .protected_slots(self.protected_slots)
            .map_duration(start.elapsed())
            .build();

        MappingOutcome::new(self.reservations, self.unplaced, statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MapperConfig, host::tests::RecordingHost};
    use proptest::prelude::*;
    use reelmap_model::{
        package::FeedDescription,
        part::{BomEntry, Part},
        slot::{FeedKind, HostSlot, Location},
    };

    /// `n` strip slots named `{prefix}_01..`.
    fn rail(prefix: &str, n: usize) -> Vec<HostSlot> {
        (1..=n)
            .map(|i| HostSlot::new(format!("{prefix}_{i:02}"), FeedKind::Strip))
            .collect()
    }

    /// An 8mm feed description whose slots hold `units` of the 2mm pitch package.
    fn feed(name: &str, units: i32) -> FeedDescription {
        FeedDescription::new(name, 8, units * 2)
    }

    /// Builds a ready context. Parts are `(name, quantity per board, host package)`;
    /// each becomes catalog id `{name}-V`.
    fn context(
        inventory: Vec<HostSlot>,
        feeds: Vec<FeedDescription>,
        parts: &[(&str, u32, &str)],
        config: MapperConfig,
    ) -> AllocationContext {
        let packages = vec![
            PackageDescription::new("0402", 8, 2),
            PackageDescription::new("SOIC", 12, 8),
        ];
        let mut ctx = AllocationContext::new(&inventory, packages, feeds, config);

        let catalog: Vec<Part> = parts
            .iter()
            .map(|&(name, _, package)| Part::new(format!("{name}-V"), 0.5, package))
            .collect();
        let bom: Vec<BomEntry> = parts
            .iter()
            .map(|&(name, qty, _)| BomEntry::new(vec![format!("{name}1")], qty, name, "V"))
            .collect();
        ctx.set_project(PartMap::map(bom, &catalog, Some("_")));
        ctx
    }

    fn slot_names(ctx: &AllocationContext, reservation: &Reservation) -> Vec<String> {
        let set = ctx.feeds().get(reservation.feed_set);
        reservation
            .slots
            .iter()
            .map(|&s| set.slot(s).name().to_owned())
            .collect()
    }

    #[test]
    fn test_batch_takes_contiguous_slots() {
        let mut ctx = context(
            rail("8mmLeft", 5),
            vec![feed("8mm", 1000)],
            &[("R", 700, "R_0402")],
            MapperConfig::default(),
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(5).unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.reservations.len(), 1);
        let reservation = &outcome.reservations[0];
        assert_eq!(reservation.quantity, 3500);
        assert_eq!(reservation.capacity, 4000);
        assert_eq!(
            slot_names(&ctx, reservation),
            vec!["8mmLeft_01", "8mmLeft_02", "8mmLeft_03", "8mmLeft_04"]
        );
        assert_eq!(outcome.statistics.slots_reserved, 4);
    }

    #[test]
    fn test_single_large_slot_is_chosen() {
        let mut inventory = rail("AAAA", 2);
        inventory.extend(rail("BBBB", 1));
        let mut ctx = context(
            inventory,
            vec![feed("AAAA", 500), feed("BBBB", 2000)],
            &[("R", 1800, "R_0402")],
            MapperConfig::default(),
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(outcome.reservations.len(), 1);
        assert_eq!(slot_names(&ctx, &outcome.reservations[0]), vec!["BBBB_01"]);
    }

    #[test]
    fn test_split_over_sets() {
        let mut inventory = rail("AAAA", 2);
        inventory.extend(rail("BBBB", 3));
        inventory.extend(rail("CCCC", 2));
        let feeds = vec![feed("AAAA", 500), feed("BBBB", 1000), feed("CCCC", 1000)];
        let mut ctx = context(
            inventory,
            feeds,
            &[("R", 5000, "R_0402")],
            MapperConfig::default(),
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.statistics.parts_split, 1);
        let shares: Vec<(u32, usize)> = outcome
            .reservations
            .iter()
            .map(|r| (r.quantity, r.slots.len()))
            .collect();
        assert_eq!(shares, vec![(3000, 3), (2000, 2)]);
        assert!(outcome.capacity_for(PartIndex::new(0)) >= 5000);
    }

    #[test]
    fn test_split_disallowed_leaves_part_unplaced() {
        let mut inventory = rail("AAAA", 2);
        inventory.extend(rail("BBBB", 2));
        let config = MapperConfig {
            allow_part_spreading: false,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("AAAA", 1000), feed("BBBB", 1000)],
            &[("R", 3000, "R_0402")],
            config,
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(outcome.num_unplaced(), 1);
        assert_eq!(outcome.unplaced[0].reason, UnplacedReason::NoSpace);
        assert!(ctx
            .feeds()
            .iter()
            .all(|(_, set)| set.slots().iter().all(|s| s.available())));
    }

    #[test]
    fn test_unpackaged_part_is_counted_separately() {
        let mut ctx = context(
            rail("8mmLeft", 2),
            vec![feed("8mm", 1000)],
            &[
                ("R", 500, "R_0402"),
                ("Y", 400, "XTAL_3225"),
                ("C", 300, "C_0402"),
            ],
            MapperConfig::default(),
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(10).unwrap();

        let reasons: Vec<(&str, UnplacedReason)> = outcome
            .unplaced
            .iter()
            .map(|u| (u.part_id.as_str(), u.reason))
            .collect();
        // Two slots hold 2000 units, short of both remaining batches.
        assert_eq!(
            reasons,
            vec![
                ("R-V", UnplacedReason::NoSpace),
                ("Y-V", UnplacedReason::NoPackage),
                ("C-V", UnplacedReason::NoSpace),
            ]
        );
        assert_eq!(outcome.statistics.num_unplaced, 3);
        assert_eq!(outcome.statistics.num_unpackaged, 1);
        assert_eq!(outcome.statistics.parts_placed, 0);
    }

    #[test]
    fn test_parts_are_placed_largest_first() {
        let mut ctx = context(
            rail("8mmLeft", 4),
            vec![feed("8mm", 1000)],
            &[("C", 100, "C_0402"), ("R", 250, "R_0402")],
            MapperConfig::default(),
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(10).unwrap();

        assert!(outcome.is_complete());
        let ids: Vec<&str> = outcome.reservations.iter().map(|r| r.part_id.as_str()).collect();
        assert_eq!(ids, vec!["R-V", "C-V"]);
        assert_eq!(
            slot_names(&ctx, &outcome.reservations[0]),
            vec!["8mmLeft_01", "8mmLeft_02", "8mmLeft_03"]
        );
        assert_eq!(slot_names(&ctx, &outcome.reservations[1]), vec!["8mmLeft_04"]);
    }

    #[test]
    fn test_preflight_refuses_without_change() {
        let inventory = rail("8mmLeft", 2);
        let mut ctx = AllocationContext::new(
            &inventory,
            vec![PackageDescription::new("0402", 8, 2)],
            vec![feed("8mm", 1000)],
            MapperConfig::default(),
        );
        let before = ctx.feeds().clone();
        assert_eq!(
            WorkspaceMapper::new(&mut ctx).map(1).unwrap_err(),
            MapperError::NotReady
        );
        assert_eq!(ctx.feeds(), &before);

        let mut ctx = context(
            rail("8mmLeft", 2),
            vec![feed("8mm", 1000)],
            &[("R", 1, "R_0402")],
            MapperConfig::default(),
        );
        assert_eq!(
            WorkspaceMapper::new(&mut ctx).map(0).unwrap_err(),
            MapperError::InvalidBoardCount
        );
    }

    #[test]
    fn test_preset_slots_cover_the_batch() {
        let mut inventory = rail("8mmLeft", 4);
        inventory[2] = inventory[2].clone().with_bound_part("R-V");
        let config = MapperConfig {
            map_to_preset_feeders: true,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("8mm", 1000)],
            &[("R", 800, "R_0402")],
            config,
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(outcome.reservations.len(), 1);
        assert!(outcome.reservations[0].preset);
        assert_eq!(slot_names(&ctx, &outcome.reservations[0]), vec!["8mmLeft_03"]);
        assert_eq!(outcome.statistics.preset_slots, 1);
        assert_eq!(outcome.statistics.parts_placed, 1);
    }

    #[test]
    fn test_preset_shortfall_continues_to_placement() {
        let mut inventory = rail("8mmLeft", 4);
        inventory[2] = inventory[2].clone().with_bound_part("R-V");
        let config = MapperConfig {
            map_to_preset_feeders: true,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("8mm", 1000)],
            &[("R", 1500, "R_0402")],
            config,
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(outcome.reservations.len(), 2);
        assert_eq!(outcome.reservations[0].quantity, 1000);
        assert_eq!(outcome.reservations[1].quantity, 500);
        assert_eq!(slot_names(&ctx, &outcome.reservations[1]), vec!["8mmLeft_01"]);
        assert!(outcome.capacity_for(PartIndex::new(0)) >= 1500);

        // The preset slot never moves.
        let mut mapper = WorkspaceMapper::new(&mut ctx);
        mapper.compress();
        let set = mapper.context().feeds().get(FeedSetIndex::new(0));
        assert!(set.slots()[2].is_preset());
        assert_eq!(set.slots()[2].associated_part(), Some(PartIndex::new(0)));
    }

    #[test]
    fn test_associated_slots_are_protected() {
        let mut inventory = rail("8mmLeft", 5);
        inventory[0] = inventory[0].clone().with_bound_part("FID-1mm");
        inventory[1] = inventory[1].clone().with_bound_part("C_0603-100n");
        inventory[2] = inventory[2].clone().with_bound_part("HomeFiducial");
        let config = MapperConfig {
            leave_associated_untouched: true,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("8mm", 1000)],
            &[("R", 3000, "R_0402")],
            config,
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(outcome.statistics.protected_slots, 1);
        assert_eq!(
            slot_names(&ctx, &outcome.reservations[0]),
            vec!["8mmLeft_01", "8mmLeft_03", "8mmLeft_04"]
        );
        let set = ctx.feeds().get(FeedSetIndex::new(0));
        assert!(set.slots()[1].leave_unmodified());
        assert!(set.slots()[1].associated_part().is_none());
    }

    #[test]
    fn test_map_compress_apply() {
        let mut ctx = context(
            rail("8mmLeft", 4),
            vec![feed("8mm", 1000)],
            &[("R", 1500, "R_0402"), ("C", 500, "C_0402")],
            MapperConfig::default(),
        );
        let mut mapper = WorkspaceMapper::new(&mut ctx);
        let outcome = mapper.map(1).unwrap();
        assert!(mapper.compress().is_empty());

        let mut host = RecordingHost::default();
        let stats = mapper.apply(&mut host).unwrap().unwrap();
        assert_eq!(stats.enabled, outcome.statistics.slots_reserved);
        assert_eq!(stats.disabled, 1);
        assert!(host.calls.contains(&"8mmLeft_03: part=C-V".to_owned()));

        let report = mapper.report().to_string();
        assert!(report.contains("8mmLeft_04\tFREE"));
    }

    fn bound_slots(ctx: &AllocationContext) -> usize {
        ctx.feeds()
            .iter()
            .flat_map(|(_, set)| set.slots())
            .filter(|s| s.associated_part().is_some())
            .count()
    }

    #[test]
    fn test_second_run_starts_from_snapshot() {
        let mut inventory = rail("8mmLeft", 5);
        inventory[4] = inventory[4].clone().with_bound_part("C_0603-100n");
        let config = MapperConfig {
            leave_associated_untouched: true,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("8mm", 1000)],
            &[("R", 500, "R_0402"), ("C", 400, "C_0402")],
            config,
        );

        let first = WorkspaceMapper::new(&mut ctx).map(1).unwrap();
        let second = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        assert_eq!(first.reservations, second.reservations);
        assert_eq!(second.statistics.slots_reserved, 2);
        assert_eq!(second.statistics.protected_slots, 1);
        assert_eq!(bound_slots(&ctx), 2);
    }

    #[test]
    fn test_new_project_drops_previous_bindings() {
        let mut ctx = context(
            rail("8mmLeft", 4),
            vec![feed("8mm", 1000)],
            &[("R", 500, "R_0402"), ("C", 400, "C_0402")],
            MapperConfig::default(),
        );
        WorkspaceMapper::new(&mut ctx).map(1).unwrap();
        assert_eq!(bound_slots(&ctx), 2);

        ctx.set_project(PartMap::map(
            vec![BomEntry::new(vec!["R1".into()], 500, "R", "V")],
            &[Part::new("R-V", 0.5, "R_0402")],
            Some("_"),
        ));
        assert_eq!(bound_slots(&ctx), 0);

        let mapper = WorkspaceMapper::new(&mut ctx);
        let report = mapper.report().to_string();
        assert_eq!(report.matches("FREE").count(), 4);
        let stats = mapper.apply(&mut RecordingHost::default()).unwrap().unwrap();
        assert_eq!(stats.enabled, 0);
        assert_eq!(stats.disabled, 4);
    }

    #[test]
    fn test_outcome_follows_compaction() {
        let inventory: Vec<HostSlot> = rail("8mmLeft", 4)
            .into_iter()
            .enumerate()
            .map(|(i, host)| host.with_location(Location::new(i as f64 * 10.0, 0.0)))
            .collect();
        let mut ctx = context(
            inventory,
            vec![feed("8mm", 1000)],
            &[("R", 800, "R_0402")],
            MapperConfig::default(),
        );
        let mut mapper = WorkspaceMapper::new(&mut ctx);
        let mut outcome = mapper.map(1).unwrap();
        // The two middle slots are nearest the centroid; the first of them seeds.
        assert_eq!(outcome.reservations[0].slots.as_slice(), &[SlotIndex::new(1)]);

        let moves = mapper.compress();
        assert_eq!(
            moves,
            vec![(
                FeedSetIndex::new(0),
                SlotMove {
                    from: SlotIndex::new(1),
                    to: SlotIndex::new(0),
                }
            )]
        );
        outcome.follow_moves(&moves);

        let reservation = &outcome.reservations[0];
        assert_eq!(reservation.slots.as_slice(), &[SlotIndex::new(0)]);
        let set = mapper.context().feeds().get(reservation.feed_set);
        assert_eq!(set.slot(SlotIndex::new(0)).associated_part(), Some(reservation.part));
        assert!(set.slot(SlotIndex::new(1)).available());
    }

    #[test]
    fn test_failed_split_share_rolls_back() {
        let mut inventory = rail("AAAA", 3);
        inventory.extend(
            rail("BBBB", 2)
                .into_iter()
                .map(|host| host.with_enabled(false)),
        );
        let config = MapperConfig {
            restrict_to_enabled: true,
            ..MapperConfig::default()
        };
        let mut ctx = context(
            inventory,
            vec![feed("AAAA", 1000), feed("BBBB", 1000)],
            &[("R", 4000, "R_0402")],
            config,
        );
        let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();

        // AAAA takes its 3000 share, then BBBB has no enabled seed for the rest.
        assert_eq!(outcome.num_unplaced(), 1);
        assert_eq!(outcome.unplaced[0].reason, UnplacedReason::NoSpace);
        assert!(outcome.reservations.is_empty());
        assert_eq!(outcome.statistics.parts_split, 0);
        assert_eq!(bound_slots(&ctx), 0);
    }

    proptest! {
        #[test]
        fn prop_allocation_conservation(
            sets in proptest::collection::vec((1usize..6, prop_oneof![Just(100i32), Just(500), Just(1000)]), 1..4),
            quantities in proptest::collection::vec(1u32..3000, 1..6),
            spreading in any::<bool>(),
        ) {
            let mut inventory = Vec::new();
            let mut feeds = Vec::new();
            for (k, &(n, units)) in sets.iter().enumerate() {
                let prefix = format!("Set{k}Rail");
                inventory.extend(rail(&prefix, n));
                feeds.push(feed(&prefix, units));
            }
            let names: Vec<String> = (0..quantities.len()).map(|i| format!("P{i}")).collect();
            let parts: Vec<(&str, u32, &str)> = names
                .iter()
                .zip(&quantities)
                .map(|(n, &q)| (n.as_str(), q, "R_0402"))
                .collect();
            let config = MapperConfig { allow_part_spreading: spreading, ..MapperConfig::default() };
            let mut ctx = context(inventory, feeds, &parts, config);

            let outcome = WorkspaceMapper::new(&mut ctx).map(1).unwrap();
            let project = ctx.project().unwrap();

            let mut bound = 0;
            for (_, set) in ctx.feeds().iter() {
                for slot in set.slots() {
                    if let Some(part) = slot.associated_part() {
                        bound += 1;
                        prop_assert!(!outcome.unplaced.iter().any(|u| u.part == part));
                    }
                }
            }
            prop_assert_eq!(bound, outcome.statistics.slots_reserved);

            for (index, part) in project.iter() {
                if outcome.unplaced.iter().any(|u| u.part == index) {
                    continue;
                }
                prop_assert!(outcome.capacity_for(index) >= part.quantity_per_board());
            }
            prop_assert_eq!(
                outcome.statistics.parts_placed + outcome.statistics.num_unplaced,
                project.num_mapped()
            );
        }
    }
}
