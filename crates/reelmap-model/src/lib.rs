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

//! # Reelmap Model
//!
//! **The domain model for assigning BOM parts to pick-and-place feed slots.**
//!
//! This crate describes the machine (slots grouped into feed sets), the
//! components (packages on tape) and the project (BOM lines matched to catalog
//! parts). The allocation engine itself lives in `reelmap_mapper`.
//!
//! ## Architecture
//!
//! * **`index`**: Strongly typed positions (`SlotIndex`, `FeedSetIndex`, `PartIndex`).
//! * **`package`**: Package and feed descriptions, and the capacity rule tying them together.
//! * **`part`**: Catalog parts, BOM entries and matched project parts.
//! * **`slot`**: A single feed slot, its kind and the host snapshot it is built from.
//! * **`feedset`**: Neighbour expansion, package preference and compaction within a set.
//! * **`grouping`**: Name-based clustering of slots into sets and centroid distances.
//! * **`partmap`**: Matching of a BOM against the catalog.
//! * **`loading`**: Delimited-text loaders for descriptions and BOMs.
//!
//! ## Design Philosophy
//!
//! 1.  **Explicit ownership**: Sets own their slots; slots refer to parts by index, never by pointer.
//! 2.  **Shared descriptions**: Package and feed descriptions are immutable and shared through `Arc`.
//! 3.  **Determinism**: Every ordering the allocator depends on is defined by input order or by name.

pub mod feedset;
pub mod grouping;
pub mod index;
pub mod loading;
pub mod package;
pub mod part;
pub mod partmap;
pub mod slot;
