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

//! Feed slots.
//!
//! A `Slot` is the allocator's view of one physical feed position on the
//! machine. It is created from a `HostSlot` snapshot, learns its physical
//! dimensions once a `FeedDescription` is attached, and during an allocation
//! run may be bound to one project part.
//!
//! Availability is the central invariant: a slot is available exactly when it
//! is not protected (`leave_unmodified`) and holds no assignment. Protected
//! slots are never handed out and never mutated by the allocator.

use crate::{
    index::PartIndex,
    package::{FeedDescription, PackageDescription},
};
use std::sync::Arc;

/// Distance assigned to slots before (or without) a centroid computation.
pub const DEFAULT_DISTANCE_FROM_CENTROID: f64 = 1000.0;

/// The kind of physical feeder behind a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Cut tape strip held in a fixed holder.
    Strip,
    /// Push-pull feeder advancing tape mechanically.
    PushPull,
    /// Component tray. Recognised, but not handled by the allocator.
    Tray,
}

impl FeedKind {
    /// Returns `true` for kinds the allocator can size and assign.
    #[inline]
    pub fn is_supported(&self) -> bool {
        matches!(self, FeedKind::Strip | FeedKind::PushPull)
    }

    /// Returns `true` if the host feeder has a configurable tape colour.
    #[inline]
    pub fn supports_tape_color(&self) -> bool {
        matches!(self, FeedKind::Strip)
    }

    /// Returns `true` if the host feeder counts picks against a maximum.
    #[inline]
    pub fn tracks_feed_count(&self) -> bool {
        matches!(self, FeedKind::Strip)
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::Strip => write!(f, "strip"),
            FeedKind::PushPull => write!(f, "pushpull"),
            FeedKind::Tray => write!(f, "tray"),
        }
    }
}

/// A planar machine location in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance_to(&self, other: &Location) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Snapshot of one feeder as reported by the host machine inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSlot {
    pub name: String,
    pub kind: FeedKind,
    pub enabled: bool,
    /// Id of the part currently configured on the host, if any.
    pub bound_part: Option<String>,
    /// Reference location (reference hole, first hole or pick location).
    pub location: Option<Location>,
}

impl HostSlot {
    pub fn new(name: impl Into<String>, kind: FeedKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            bound_part: None,
            location: None,
        }
    }

    #[inline]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[inline]
    pub fn with_bound_part(mut self, part_id: impl Into<String>) -> Self {
        self.bound_part = Some(part_id.into());
        self
    }

    #[inline]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// The part (and its package) a slot has been reserved for.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotAssignment {
    pub part: PartIndex,
    pub package: Arc<PackageDescription>,
}

/// One physical feed position, as tracked during an allocation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    name: String,
    kind: FeedKind,
    enabled: bool,
    location: Option<Location>,
    distance_from_centroid: f64,
    host_part: Option<String>,
    assignment: Option<SlotAssignment>,
    max_capacity: u32,
    leave_unmodified: bool,
    preset: bool,
    feed_description: Option<Arc<FeedDescription>>,
}

impl Slot {
    /// Creates a free, unprotected slot without a feed description.
    pub fn new(name: impl Into<String>, kind: FeedKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            location: None,
            distance_from_centroid: DEFAULT_DISTANCE_FROM_CENTROID,
            host_part: None,
            assignment: None,
            max_capacity: 0,
            leave_unmodified: false,
            preset: false,
            feed_description: None,
        }
    }

    /// Creates a slot from a host inventory snapshot.
    pub fn from_host(host: &HostSlot) -> Self {
        Self {
            enabled: host.enabled,
            location: host.location,
            host_part: host.bound_part.clone(),
            ..Self::new(host.name.clone(), host.kind)
        }
    }

    #[inline]
    pub fn with_feed_description(mut self, description: Arc<FeedDescription>) -> Self {
        self.feed_description = Some(description);
        self
    }

    #[inline]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance_from_centroid = distance;
        self
    }

    #[inline]
    pub fn with_host_part(mut self, part_id: impl Into<String>) -> Self {
        self.host_part = Some(part_id.into());
        self
    }

    #[inline]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    #[inline]
    pub fn distance_from_centroid(&self) -> f64 {
        self.distance_from_centroid
    }

    #[inline]
    pub fn set_distance_from_centroid(&mut self, distance: f64) {
        self.distance_from_centroid = distance;
    }

    /// Id of the part the host had on this slot before the run.
    #[inline]
    pub fn host_part(&self) -> Option<&str> {
        self.host_part.as_deref()
    }

    #[inline]
    pub fn assignment(&self) -> Option<&SlotAssignment> {
        self.assignment.as_ref()
    }

    #[inline]
    pub fn associated_part(&self) -> Option<PartIndex> {
        self.assignment.as_ref().map(|a| a.part)
    }

    #[inline]
    pub fn associated_package(&self) -> Option<&Arc<PackageDescription>> {
        self.assignment.as_ref().map(|a| &a.package)
    }

    /// Capacity cached when the current assignment was made.
    #[inline]
    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    #[inline]
    pub fn leave_unmodified(&self) -> bool {
        self.leave_unmodified
    }

    /// Protects the slot from any further change by the allocator.
    #[inline]
    pub fn set_leave_unmodified(&mut self, leave: bool) {
        self.leave_unmodified = leave;
    }

    /// Returns `true` if the assignment was taken over from the host's configuration.
    #[inline]
    pub fn is_preset(&self) -> bool {
        self.preset
    }

    #[inline]
    pub fn feed_description(&self) -> Option<&Arc<FeedDescription>> {
        self.feed_description.as_ref()
    }

    #[inline]
    pub fn set_feed_description(&mut self, description: Option<Arc<FeedDescription>>) {
        self.feed_description = description;
    }

    /// Returns `true` if the slot may be handed out to a part.
    #[inline]
    pub fn available(&self) -> bool {
        !self.leave_unmodified && self.assignment.is_none()
    }

    /// Returns `true` if the slot can be moved around by compaction.
    #[inline]
    pub fn is_movable(&self) -> bool {
        self.assignment.is_some() && !self.leave_unmodified && !self.preset
    }

    /// Returns `true` if this slot physically accepts `package`.
    ///
    /// Bare slots (no feed description) and unsupported kinds accept nothing.
    pub fn can_carry(&self, package: &PackageDescription) -> bool {
        match &self.feed_description {
            Some(desc) if self.kind.is_supported() => desc.can_carry(package),
            _ => false,
        }
    }

    /// Returns how many units of `package` this slot holds.
    pub fn holds_up_to(&self, package: &PackageDescription) -> u32 {
        match &self.feed_description {
            Some(desc) if self.kind.is_supported() => desc.capacity(package),
            _ => 0,
        }
    }

    /// Binds the slot to a part and caches its capacity for that part's package.
    pub fn set_part(&mut self, part: PartIndex, package: Arc<PackageDescription>) {
        debug_assert!(
            !self.leave_unmodified,
            "called `Slot::set_part` on protected slot {}",
            self.name
        );
        self.max_capacity = self.holds_up_to(&package);
        self.assignment = Some(SlotAssignment { part, package });
    }

    /// Binds the slot to a part the host already had configured on it.
    pub fn set_preset_part(&mut self, part: PartIndex, package: Arc<PackageDescription>) {
        self.set_part(part, package);
        self.preset = true;
    }

    /// Moves this slot's assignment to `other` and frees this slot.
    ///
    /// Only the association travels; names, locations and descriptions stay
    /// with their physical slots. The target recomputes its cached capacity.
    pub fn move_to(&mut self, other: &mut Slot) {
        match self.assignment.take() {
            Some(assignment) => {
                other.max_capacity = other.holds_up_to(&assignment.package);
                other.assignment = Some(assignment);
            }
            None => {
                other.assignment = None;
                other.max_capacity = 0;
            }
        }
        self.max_capacity = 0;
    }

    /// Drops the assignment, leaving protection flags untouched.
    pub fn clear(&mut self) {
        self.assignment = None;
        self.max_capacity = 0;
        self.preset = false;
    }

    /// Drops the assignment and the protection flag.
    pub fn reset(&mut self) {
        self.clear();
        self.leave_unmodified = false;
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} @ {:.1})",
            self.name, self.kind, self.distance_from_centroid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r0402() -> Arc<PackageDescription> {
        Arc::new(PackageDescription::new("0402", 8, 2))
    }

    fn strip_8mm(name: &str) -> Slot {
        Slot::new(name, FeedKind::Strip)
            .with_feed_description(Arc::new(FeedDescription::new("8mm", 8, 200)))
    }

    #[test]
    fn test_new_slot_is_available() {
        let slot = strip_8mm("8mmLeft_01");
        assert!(slot.available());
        assert_eq!(slot.distance_from_centroid(), DEFAULT_DISTANCE_FROM_CENTROID);
        assert!(slot.associated_part().is_none());
    }

    #[test]
    fn test_set_part_caches_capacity() {
        let mut slot = strip_8mm("8mmLeft_01");
        slot.set_part(PartIndex::new(4), r0402());

        assert!(!slot.available());
        assert_eq!(slot.max_capacity(), 100);
        assert_eq!(slot.associated_part(), Some(PartIndex::new(4)));
        assert_eq!(slot.associated_package().map(|p| p.name()), Some("0402"));
    }

    #[test]
    fn test_leave_unmodified_is_never_available() {
        let mut slot = strip_8mm("8mmLeft_01");
        slot.set_leave_unmodified(true);
        assert!(!slot.available());
        assert!(!slot.is_movable());
    }

    #[test]
    fn test_bare_slot_cannot_be_sized() {
        let slot = Slot::new("mystery", FeedKind::Strip);
        assert!(!slot.can_carry(&r0402()));
        assert_eq!(slot.holds_up_to(&r0402()), 0);
    }

    #[test]
    fn test_tray_is_not_sized() {
        let slot = Slot::new("Tray_01", FeedKind::Tray)
            .with_feed_description(Arc::new(FeedDescription::new("Tray", 8, 0)));
        assert_eq!(slot.holds_up_to(&r0402()), 0);
        assert!(!FeedKind::Tray.is_supported());
    }

    #[test]
    fn test_move_to_transfers_association_only() {
        let mut from = strip_8mm("8mmLeft_05").with_distance(3.0);
        let mut to = strip_8mm("8mmLeft_01").with_distance(9.0);
        from.set_part(PartIndex::new(1), r0402());

        from.move_to(&mut to);

        assert!(from.available());
        assert_eq!(from.max_capacity(), 0);
        assert_eq!(to.associated_part(), Some(PartIndex::new(1)));
        assert_eq!(to.max_capacity(), 100);
        assert_eq!(to.name(), "8mmLeft_01");
        assert_eq!(to.distance_from_centroid(), 9.0);
    }

    #[test]
    fn test_from_host_copies_snapshot() {
        let host = HostSlot::new("8mmRight_02", FeedKind::PushPull)
            .with_enabled(false)
            .with_bound_part("C_0402-100n")
            .with_location(Location::new(10.0, 20.0));
        let slot = Slot::from_host(&host);

        assert_eq!(slot.name(), "8mmRight_02");
        assert_eq!(slot.kind(), FeedKind::PushPull);
        assert!(!slot.is_enabled());
        assert_eq!(slot.host_part(), Some("C_0402-100n"));
        assert_eq!(slot.location(), Some(Location::new(10.0, 20.0)));
        assert!(slot.available());
    }

    #[test]
    fn test_location_distance() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
