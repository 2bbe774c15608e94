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

//! Writing an allocation back to the machine.
//!
//! The engine never talks to hardware. Whatever drives the machine implements
//! [`HostInventory`], and [`apply`] walks the feed sets and issues one small
//! configuration call after the other.

use crate::stats::ApplyStatistics;
use reelmap_model::{grouping::SystemFeeds, package::TapeColor, partmap::PartMap};

/// Mutable view of the host's slots, addressed by slot name.
pub trait HostInventory {
    type Error;

    fn set_enabled(&mut self, slot: &str, enabled: bool) -> Result<(), Self::Error>;

    /// Configures the slot to feed the catalog part `part_id`.
    fn set_part(&mut self, slot: &str, part_id: &str) -> Result<(), Self::Error>;

    /// Sets how many units the slot can feed before it runs empty.
    fn set_max_feed_count(&mut self, slot: &str, count: u32) -> Result<(), Self::Error>;

    fn reset_feed_count(&mut self, slot: &str) -> Result<(), Self::Error>;

    fn zero_rotation(&mut self, slot: &str) -> Result<(), Self::Error>;

    fn set_tape_color(&mut self, slot: &str, color: TapeColor) -> Result<(), Self::Error>;
}

/// Applies the slot bindings of `feeds` to `host`.
///
/// Protected slots are skipped. Free slots are disabled. Bound slots are
/// enabled and configured with their part; strip slots also get their feed
/// count reset and, when the package names one, their tape colour.
///
/// Stops at the first host error.
pub fn apply<H>(
    feeds: &SystemFeeds,
    project: &PartMap,
    host: &mut H,
) -> Result<ApplyStatistics, H::Error>
where
    H: HostInventory + ?Sized,
{
    let mut stats = ApplyStatistics::default();

    for (_, set) in feeds.iter() {
        for slot in set.iter_ordered() {
            stats.processed += 1;

            if slot.leave_unmodified() {
                tracing::debug!(slot = %slot.name(), "leaving slot untouched");
                stats.untouched += 1;
                continue;
            }

            let Some(assignment) = slot.assignment() else {
                host.set_enabled(slot.name(), false)?;
                stats.disabled += 1;
                continue;
            };

            let part = project.part(assignment.part);
            host.set_enabled(slot.name(), true)?;
            host.set_part(slot.name(), part.id())?;

            let kind = slot.kind();
            if kind.tracks_feed_count() {
                host.set_max_feed_count(slot.name(), slot.max_capacity())?;
                host.reset_feed_count(slot.name())?;
            }
            host.zero_rotation(slot.name())?;

            if kind.supports_tape_color() {
                if let Some(color) = assignment.package.tape_color() {
                    host.set_tape_color(slot.name(), color)?;
                }
            }

            tracing::debug!(slot = %slot.name(), part = %part.id(), "slot configured");
            stats.enabled += 1;
        }
    }

    tracing::info!(%stats, "allocation applied to host");
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use reelmap_model::{
        grouping::FEED_SET_NAME_MAX_DISTANCE,
        index::{FeedSetIndex, PartIndex, SlotIndex},
        package::{FeedDescription, PackageDescription},
        part::{BomEntry, Part},
        slot::{FeedKind, Slot},
    };
    use std::sync::Arc;

    /// Records every host call as a line of text.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub calls: Vec<String>,
        pub fail_on: Option<String>,
    }

    impl RecordingHost {
        fn record(&mut self, slot: &str, call: String) -> Result<(), String> {
            if self.fail_on.as_deref() == Some(slot) {
                return Err(format!("{slot} is offline"));
            }
            self.calls.push(format!("{slot}: {call}"));
            Ok(())
        }
    }

    impl HostInventory for RecordingHost {
        type Error = String;

        fn set_enabled(&mut self, slot: &str, enabled: bool) -> Result<(), String> {
            self.record(slot, format!("enabled={enabled}"))
        }

        fn set_part(&mut self, slot: &str, part_id: &str) -> Result<(), String> {
            self.record(slot, format!("part={part_id}"))
        }

        fn set_max_feed_count(&mut self, slot: &str, count: u32) -> Result<(), String> {
            self.record(slot, format!("max_feed_count={count}"))
        }

        fn reset_feed_count(&mut self, slot: &str) -> Result<(), String> {
            self.record(slot, "reset_feed_count".to_owned())
        }

        fn zero_rotation(&mut self, slot: &str) -> Result<(), String> {
            self.record(slot, "zero_rotation".to_owned())
        }

        fn set_tape_color(&mut self, slot: &str, color: TapeColor) -> Result<(), String> {
            self.record(slot, format!("tape={color}"))
        }
    }

    fn fixture() -> (SystemFeeds, PartMap) {
        let strip = Arc::new(FeedDescription::new("8mm", 8, 200));
        let slots = vec![
            Slot::new("8mm_01", FeedKind::Strip).with_feed_description(Arc::clone(&strip)),
            Slot::new("8mm_02", FeedKind::Strip).with_feed_description(Arc::clone(&strip)),
            Slot::new("8mm_03", FeedKind::PushPull).with_feed_description(Arc::clone(&strip)),
            Slot::new("8mm_04", FeedKind::Strip).with_feed_description(strip),
        ];
        let mut feeds = SystemFeeds::group(slots, FEED_SET_NAME_MAX_DISTANCE);

        let project = PartMap::map(
            vec![BomEntry::new(vec!["R1".into()], 2, "R", "10k")],
            &[Part::new("R-10k", 0.5, "R_0402")],
            Some("_"),
        );

        let package = Arc::new(
            PackageDescription::new("0402", 8, 2).with_tape_color(Some(TapeColor::White)),
        );
        let set = feeds.get_mut(FeedSetIndex::new(0));
        set.assign(SlotIndex::new(0), PartIndex::new(0), Arc::clone(&package));
        set.assign(SlotIndex::new(2), PartIndex::new(0), package);
        set.slot_mut(SlotIndex::new(3)).set_leave_unmodified(true);

        (feeds, project)
    }

    #[test]
    fn test_apply_configures_slots_by_kind() {
        let (feeds, project) = fixture();
        let mut host = RecordingHost::default();
        let stats = apply(&feeds, &project, &mut host).unwrap();

        assert_eq!(
            stats,
            ApplyStatistics {
                processed: 4,
                enabled: 2,
                disabled: 1,
                untouched: 1,
            }
        );
        assert_eq!(
            host.calls,
            vec![
                "8mm_01: enabled=true",
                "8mm_01: part=R-10k",
                "8mm_01: max_feed_count=100",
                "8mm_01: reset_feed_count",
                "8mm_01: zero_rotation",
                "8mm_01: tape=white",
                "8mm_02: enabled=false",
                "8mm_03: enabled=true",
                "8mm_03: part=R-10k",
                "8mm_03: zero_rotation",
            ]
        );
    }

    #[test]
    fn test_apply_stops_on_host_error() {
        let (feeds, project) = fixture();
        let mut host = RecordingHost {
            fail_on: Some("8mm_02".into()),
            ..RecordingHost::default()
        };
        let err = apply(&feeds, &project, &mut host).unwrap_err();
        assert_eq!(err, "8mm_02 is offline");
        assert_eq!(host.calls.len(), 6);
    }
}
