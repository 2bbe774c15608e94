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

//! The state a mapping run operates on.
//!
//! An `AllocationContext` is built fresh from a snapshot of the host: the
//! slots are grouped into feed sets, each slot gets the first enabled feed
//! description whose name it contains, and slots nobody describes are dropped
//! from their set. Once a project (a matched [`PartMap`]) is attached, each
//! part is resolved to its package description.

use crate::config::MapperConfig;
use reelmap_model::{
    grouping::SystemFeeds,
    package::{FeedDescription, PackageDescription},
    part::{BomEntry, Part},
    partmap::PartMap,
    slot::HostSlot,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AllocationContext {
    config: MapperConfig,
    feeds: SystemFeeds,
    packages: Vec<Arc<PackageDescription>>,
    feed_descriptions: Vec<Arc<FeedDescription>>,
    project: Option<PartMap>,
}

impl AllocationContext {
    /// Builds the feed sets from a host inventory and attaches feed descriptions.
    pub fn new(
        inventory: &[HostSlot],
        packages: Vec<PackageDescription>,
        feed_descriptions: Vec<FeedDescription>,
        config: MapperConfig,
    ) -> Self {
        let packages: Vec<_> = packages.into_iter().map(Arc::new).collect();
        let feed_descriptions: Vec<_> = feed_descriptions.into_iter().map(Arc::new).collect();
        let mut feeds = SystemFeeds::from_inventory(inventory, config.feed_set_name_max_distance);

        attach_feed_descriptions(&mut feeds, &feed_descriptions);

        tracing::info!(
            sets = feeds.len(),
            slots = feeds.num_slots(),
            packages = packages.len(),
            feed_descriptions = feed_descriptions.len(),
            "allocation context ready"
        );

        Self {
            config,
            feeds,
            packages,
            feed_descriptions,
            project: None,
        }
    }

    /// Matches a BOM against the catalog with the configured whitespace
    /// replacement and attaches the result.
    pub fn map_project(&mut self, entries: Vec<BomEntry>, catalog: &[Part]) -> &PartMap {
        let project = PartMap::map(entries, catalog, self.config.whitespace_replacement());
        tracing::info!(
            mapped = project.num_mapped(),
            skipped = project.num_skipped(),
            percentage = project.percentage_mapped(),
            "project matched against catalog"
        );
        self.attach(project)
    }

    /// Attaches a project and resolves every part's package description.
    ///
    /// Slot bindings refer to parts by position, so any state left by a
    /// previous run is dropped first.
    pub fn set_project(&mut self, project: PartMap) {
        self.attach(project);
    }

    fn attach(&mut self, mut project: PartMap) -> &PartMap {
        let cleared = self.feeds.reset();
        if cleared > 0 {
            tracing::debug!(slots = cleared, "cleared bindings of the previous project");
        }

        for part in project.parts_mut() {
            let description = self
                .packages
                .iter()
                .find(|p| p.matches(part.part().package()))
                .cloned();

            match &description {
                Some(d) => {
                    tracing::debug!(part = %part.id(), package = %d.name(), "resolved package");
                }
                None => {
                    tracing::warn!(part = %part.id(), package = %part.part().package(), "no package description");
                }
            }
            part.set_package_description(description);
        }

        self.project.insert(project)
    }

    /// Returns `true` if descriptions are loaded and an acceptable project is attached.
    pub fn is_ready(&self) -> bool {
        if self.packages.is_empty() || !self.feed_descriptions.iter().any(|f| f.is_enabled()) {
            return false;
        }

        match &self.project {
            Some(project) => project.is_success() || self.config.ignore_project_status,
            None => false,
        }
    }

    #[inline]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    #[inline]
    pub fn feeds(&self) -> &SystemFeeds {
        &self.feeds
    }

    #[inline]
    pub fn feeds_mut(&mut self) -> &mut SystemFeeds {
        &mut self.feeds
    }

    #[inline]
    pub fn packages(&self) -> &[Arc<PackageDescription>] {
        &self.packages
    }

    #[inline]
    pub fn feed_descriptions(&self) -> &[Arc<FeedDescription>] {
        &self.feed_descriptions
    }

    #[inline]
    pub fn project(&self) -> Option<&PartMap> {
        self.project.as_ref()
    }

    /// Borrows the feeds mutably alongside the project and configuration.
    pub(crate) fn split_mut(&mut self) -> (&mut SystemFeeds, Option<&PartMap>, &MapperConfig) {
        (&mut self.feeds, self.project.as_ref(), &self.config)
    }
}

fn attach_feed_descriptions(feeds: &mut SystemFeeds, descriptions: &[Arc<FeedDescription>]) {
    for set in feeds.iter_mut() {
        let mut undescribed = Vec::new();
        for slot in set.slots_mut() {
            let description = descriptions
                .iter()
                .find(|d| d.is_enabled() && d.matches(slot.name()))
                .cloned();
            if description.is_none() {
                undescribed.push(slot.name().to_owned());
            }
            slot.set_feed_description(description);
        }

        for name in undescribed {
            tracing::debug!(slot = %name, "no feed description, removing slot");
            set.remove(&name);
        }
    }
}
