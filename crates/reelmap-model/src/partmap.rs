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

//! Matching of BOM entries against the host's part catalog.
//!
//! A BOM line is identified on the host by the key `package-value`, with the
//! spaces in the value replaced (so `R` + `10 k` looks for `R-10_k`). Matched
//! lines become [`ProjectPart`]s, ordered by per-board quantity so that the
//! allocator places the hungriest parts first.

use crate::{
    index::PartIndex,
    part::{BomEntry, Part, ProjectPart},
};
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

/// Match ratio (in percent) at or above which a project counts as mapped.
pub const MIN_PERCENTAGE_FOR_SUCCESS: f64 = 49.0;

/// Default replacement for whitespace in BOM values.
pub const DEFAULT_VALUE_WHITESPACE_REPLACEMENT: &str = "_";

/// Builds the catalog id a BOM entry is expected to have.
///
/// ```rust
/// use reelmap_model::{part::BomEntry, partmap::match_key};
///
/// let entry = BomEntry::new(vec!["R1".into()], 1, "R", "10 k");
/// assert_eq!(match_key(&entry, Some("_")), "R-10_k");
/// assert_eq!(match_key(&entry, None), "R-10 k");
/// ```
pub fn match_key(entry: &BomEntry, whitespace_replacement: Option<&str>) -> String {
    let value = match whitespace_replacement {
        Some(replacement) => entry.value().replace(' ', replacement),
        None => entry.value().to_owned(),
    };
    format!("{}-{}", entry.package(), value)
}

/// Outcome of matching a BOM against a catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartMap {
    parts: Vec<ProjectPart>,
    unmatched: Vec<BomEntry>,
    percentage_mapped: f64,
}

impl PartMap {
    /// Matches every BOM entry against `catalog`.
    ///
    /// When the catalog holds the same id twice, the later part wins.
    pub fn map<I>(entries: I, catalog: &[Part], whitespace_replacement: Option<&str>) -> Self
    where
        I: IntoIterator<Item = BomEntry>,
    {
        let by_id: FxHashMap<&str, &Part> = catalog.iter().map(|p| (p.id(), p)).collect();

        let mut parts = Vec::new();
        let mut unmatched = Vec::new();
        for entry in entries {
            let key = match_key(&entry, whitespace_replacement);
            match by_id.get(key.as_str()) {
                Some(part) => {
                    tracing::debug!(part = %key, refs = %entry.short_references(), "matched BOM entry");
                    parts.push(ProjectPart::new(entry, (*part).clone()));
                }
                None => {
                    tracing::warn!(part = %key, refs = %entry.short_references(), "no catalog part for BOM entry");
                    unmatched.push(entry);
                }
            }
        }

        let total = parts.len() + unmatched.len();
        let percentage_mapped = if total == 0 {
            0.0
        } else {
            parts.len() as f64 / total as f64 * 100.0
        };

        parts.sort_by_key(|p| Reverse(p.quantity_per_board()));

        tracing::info!(
            mapped = parts.len(),
            skipped = unmatched.len(),
            percentage = percentage_mapped,
            "BOM matched against catalog"
        );

        Self {
            parts,
            unmatched,
            percentage_mapped,
        }
    }

    #[inline]
    pub fn num_mapped(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn num_skipped(&self) -> usize {
        self.unmatched.len()
    }

    #[inline]
    pub fn num_in_bom(&self) -> usize {
        self.parts.len() + self.unmatched.len()
    }

    #[inline]
    pub fn percentage_mapped(&self) -> f64 {
        self.percentage_mapped
    }

    /// Returns `true` if enough of the BOM was matched to build the project.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.percentage_mapped >= MIN_PERCENTAGE_FOR_SUCCESS
    }

    /// Matched parts, highest per-board quantity first.
    #[inline]
    pub fn parts(&self) -> &[ProjectPart] {
        &self.parts
    }

    #[inline]
    pub fn parts_mut(&mut self) -> &mut [ProjectPart] {
        &mut self.parts
    }

    /// Returns the part at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn part(&self, index: PartIndex) -> &ProjectPart {
        &self.parts[index.get()]
    }

    /// Matched parts with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (PartIndex, &ProjectPart)> + '_ {
        self.parts
            .iter()
            .enumerate()
            .map(|(i, p)| (PartIndex::new(i), p))
    }

    /// Finds a matched part by its catalog id.
    pub fn find(&self, part_id: &str) -> Option<PartIndex> {
        self.parts
            .iter()
            .position(|p| p.id() == part_id)
            .map(PartIndex::new)
    }

    #[inline]
    pub fn unmatched(&self) -> &[BomEntry] {
        &self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(reference: &str, qty: u32, package: &str, value: &str) -> BomEntry {
        BomEntry::new(vec![reference.to_owned()], qty, package, value)
    }

    fn catalog() -> Vec<Part> {
        vec![
            Part::new("R_0402-10_k", 0.5, "R_0402"),
            Part::new("C_0402-100n", 0.5, "C_0402"),
            Part::new("SOT-23-LDO", 1.2, "SOT-23"),
        ]
    }

    #[test]
    fn test_whitespace_in_value_is_replaced() {
        let map = PartMap::map(
            vec![entry("R1", 1, "R_0402", "10 k")],
            &catalog(),
            Some(DEFAULT_VALUE_WHITESPACE_REPLACEMENT),
        );
        assert_eq!(map.num_mapped(), 1);
        assert_eq!(map.parts()[0].id(), "R_0402-10_k");

        let map = PartMap::map(vec![entry("R1", 1, "R_0402", "10 k")], &catalog(), None);
        assert_eq!(map.num_mapped(), 0);
        assert_eq!(map.num_skipped(), 1);
    }

    #[test]
    fn test_orders_by_quantity_descending_and_stable() {
        let entries = vec![
            entry("U1", 1, "SOT-23", "LDO"),
            entry("C1", 12, "C_0402", "100n"),
            entry("R1", 1, "R_0402", "10_k"),
        ];
        let map = PartMap::map(entries, &catalog(), Some("_"));
        let ids: Vec<&str> = map.parts().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["C_0402-100n", "SOT-23-LDO", "R_0402-10_k"]);
        assert_eq!(map.find("SOT-23-LDO"), Some(PartIndex::new(1)));
    }

    #[test]
    fn test_success_threshold() {
        let half = PartMap::map(
            vec![entry("U1", 1, "SOT-23", "LDO"), entry("X1", 1, "XTAL", "8MHz")],
            &catalog(),
            Some("_"),
        );
        assert_eq!(half.percentage_mapped(), 50.0);
        assert!(half.is_success());
        assert_eq!(half.unmatched()[0].package(), "XTAL");

        let third = PartMap::map(
            vec![
                entry("U1", 1, "SOT-23", "LDO"),
                entry("X1", 1, "XTAL", "8MHz"),
                entry("J1", 1, "USB", "C"),
            ],
            &catalog(),
            Some("_"),
        );
        assert!(!third.is_success());
        assert_eq!(third.num_in_bom(), 3);
    }

    #[test]
    fn test_empty_bom_is_not_a_success() {
        let map = PartMap::map(Vec::new(), &catalog(), Some("_"));
        assert_eq!(map.percentage_mapped(), 0.0);
        assert!(!map.is_success());
    }

    #[test]
    fn test_later_catalog_duplicate_wins() {
        let mut parts = catalog();
        parts.push(Part::new("SOT-23-LDO", 2.0, "SOT-23-5"));
        let map = PartMap::map(vec![entry("U1", 1, "SOT-23", "LDO")], &parts, Some("_"));
        assert_eq!(map.parts()[0].part().height(), 2.0);
    }
}
