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

//! Human-readable dump of the current slot bindings.

use reelmap_model::{grouping::SystemFeeds, partmap::PartMap};

/// A printable slot-by-slot view of the allocation, grouped by feed set.
///
/// ```text
/// FEEDSET: 8mmLeft_01
///   8mmLeft_01    [R_0402] 10k (4/board)    @ 12.5
///   8mmLeft_02    FREE
///   8mmLeft_03    [UNTOUCHED] FID-1mm    @ 20.0
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FeedReport<'a> {
    feeds: &'a SystemFeeds,
    project: Option<&'a PartMap>,
}

impl<'a> FeedReport<'a> {
    #[inline]
    pub fn new(feeds: &'a SystemFeeds, project: Option<&'a PartMap>) -> Self {
        Self { feeds, project }
    }
}

impl std::fmt::Display for FeedReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (_, set) in self.feeds.iter() {
            writeln!(f, "FEEDSET: {}", set.name())?;
            for slot in set.iter_ordered() {
                let distance = slot.distance_from_centroid();
                if slot.leave_unmodified() {
                    writeln!(
                        f,
                        "  {}\t[UNTOUCHED] {}\t@ {:.1}",
                        slot.name(),
                        slot.host_part().unwrap_or("-"),
                        distance
                    )?;
                    continue;
                }

                let bound = slot
                    .assignment()
                    .and_then(|a| self.project.map(|p| (a, p.part(a.part))));
                match bound {
                    Some((assignment, part)) => writeln!(
                        f,
                        "  {}\t[{}] {} ({}/board)\t@ {:.1}",
                        slot.name(),
                        assignment.package.name(),
                        part.value(),
                        part.quantity_per_board(),
                        distance
                    )?,
                    None => writeln!(f, "  {}\tFREE", slot.name())?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
