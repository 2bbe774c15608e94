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

//! Catalog parts, BOM entries and the pairing of the two.

use crate::package::PackageDescription;
use std::sync::Arc;

/// A part configured on the host machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    id: String,
    height: f64,
    package: String,
}

impl Part {
    pub fn new(id: impl Into<String>, height: f64, package: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            height,
            package: package.into(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The host's package identifier, matched against package descriptions by substring.
    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }
}

/// One line of a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomEntry {
    references: Vec<String>,
    quantity: u32,
    package: String,
    value: String,
}

impl BomEntry {
    pub fn new(
        references: Vec<String>,
        quantity: u32,
        package: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            references,
            quantity,
            package: package.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Units of this line needed on a single board.
    #[inline]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Footprint package, e.g. `R_0402_1005Metric`.
    #[inline]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// A compact reference list for log lines, e.g. `R1,R2,...`.
    pub fn short_references(&self) -> String {
        let joined = self.references.join(",");
        if joined.chars().count() > 7 {
            let head: String = joined.chars().take(6).collect();
            format!("{head}...")
        } else {
            joined
        }
    }
}

impl std::fmt::Display for BomEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" {}\t{}\t{}",
            self.short_references(),
            self.quantity,
            self.package,
            self.value
        )
    }
}

/// A BOM entry that was matched to a catalog part.
///
/// The package description is resolved later, once the workspace knows which
/// descriptions were loaded; until then (or if none matches) it is `None` and
/// the part cannot be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPart {
    bom_entry: BomEntry,
    part: Part,
    package_description: Option<Arc<PackageDescription>>,
}

impl ProjectPart {
    pub fn new(bom_entry: BomEntry, part: Part) -> Self {
        Self {
            bom_entry,
            part,
            package_description: None,
        }
    }

    #[inline]
    pub fn bom_entry(&self) -> &BomEntry {
        &self.bom_entry
    }

    #[inline]
    pub fn part(&self) -> &Part {
        &self.part
    }

    #[inline]
    pub fn id(&self) -> &str {
        self.part.id()
    }

    #[inline]
    pub fn value(&self) -> &str {
        self.bom_entry.value()
    }

    #[inline]
    pub fn quantity_per_board(&self) -> u32 {
        self.bom_entry.quantity()
    }

    #[inline]
    pub fn package_description(&self) -> Option<&Arc<PackageDescription>> {
        self.package_description.as_ref()
    }

    #[inline]
    pub fn set_package_description(&mut self, description: Option<Arc<PackageDescription>>) {
        self.package_description = description;
    }
}

impl std::fmt::Display for ProjectPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} {}/board)",
            self.part.id(),
            self.bom_entry.short_references(),
            self.bom_entry.quantity()
        )
    }
}
