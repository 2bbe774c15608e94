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

//! # Reelmap Mapper
//!
//! **Allocates pick-and-place feed slots to the parts of a project.**
//!
//! Given the machine's slots (grouped into feed sets by `reelmap_model`), the
//! package and feed descriptions and a BOM matched against the catalog, the
//! mapper decides which slots hold which part so that a whole production batch
//! can be run without refilling.
//!
//! ## Architecture
//!
//! * **`config`**: Options steering a run, loadable from TOML.
//! * **`context`**: The workspace a run operates on: feeds, descriptions and project.
//! * **`selection`**: Scoring of feed sets and planning of split placements.
//! * **`mapper`**: The run itself, plus compaction, apply and report entry points.
//! * **`result`**: Reservations and unplaced parts produced by a run.
//! * **`stats`**: Run and apply statistics.
//! * **`host`**: The `HostInventory` seam through which bindings reach the machine.
//! * **`report`**: A printable slot-by-slot view of the allocation.
//!
//! ## Example
//!
//! ```
//! use reelmap_mapper::{
//!     config::MapperConfig, context::AllocationContext, mapper::WorkspaceMapper,
//! };
//! use reelmap_model::{
//!     package::{FeedDescription, PackageDescription},
//!     part::{BomEntry, Part},
//!     slot::{FeedKind, HostSlot},
//! };
//!
//! let inventory: Vec<HostSlot> = (1..=4)
//!     .map(|i| HostSlot::new(format!("8mmLeft_{i:02}"), FeedKind::Strip))
//!     .collect();
//! let mut context = AllocationContext::new(
//!     &inventory,
//!     vec![PackageDescription::new("0402", 8, 2)],
//!     vec![FeedDescription::new("8mm", 8, 400)],
//!     MapperConfig::default(),
//! );
//! context.map_project(
//!     vec![BomEntry::new(vec!["R1".into(), "R2".into()], 2, "R_0402", "10k")],
//!     &[Part::new("R_0402-10k", 0.5, "R_0402_1005Metric")],
//! );
//!
//! let outcome = WorkspaceMapper::new(&mut context).map(150).unwrap();
//! assert!(outcome.is_complete());
//! assert_eq!(outcome.statistics.slots_reserved, 2);
//! ```

pub mod config;
pub mod context;
pub mod host;
pub mod mapper;
pub mod report;
pub mod result;
pub mod selection;
pub mod stats;
