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

//! Loaders for package descriptions, feed descriptions and bills of materials.
//!
//! All three inputs are delimited text tables. Fields may be wrapped in double
//! quotes (a doubled quote inside a quoted field stands for one quote), blank
//! lines are ignored, and a first row whose first cell carries a `#` in its
//! first two characters is treated as a header comment and skipped. Cells are
//! trimmed before they are interpreted.
//!
//! Every loader follows the same builder shape: configure it, then feed it a
//! `BufRead`, a path, a raw reader or a string slice.
//!
//! ```rust
//! use reelmap_model::loading::{BomLoader, FeedDescriptionLoader, PackageDescriptionLoader};
//!
//! let packages = PackageDescriptionLoader::new()
//!     .from_str("# name, width, pitch, tape\n0402, 8, 2, white\nSOIC8, 12, 8, black\n")
//!     .unwrap();
//! assert_eq!(packages.len(), 2);
//!
//! let feeds = FeedDescriptionLoader::new()
//!     .from_str("8mm, 8, 250, 1, left rail\n12mm, 12, 0\n")
//!     .unwrap();
//! assert!(feeds[1].is_reel());
//!
//! let bom = BomLoader::kicad()
//!     .from_str("\"1\",\"2\",\"R1 R2\",\"10k\",\"Device:R\",\"Resistor_SMD:R_0402_1005Metric\"\n")
//!     .unwrap();
//! assert_eq!(bom[0].package(), "R_0402_1005Metric");
//! ```

use crate::{
    package::{FeedDescription, PackageDescription, TapeColor},
    part::BomEntry,
};
use rustc_hash::FxHashMap;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};

/// The error type for all loaders.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An I/O error occurred while reading the input stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The input holds no data rows.
    #[error("input contains no data rows")]
    Empty,
    /// A cell could not be parsed into the expected type.
    #[error("row {row}, column {column}: could not parse '{token}' as {expected}")]
    Parse {
        row: usize,
        column: usize,
        token: String,
        expected: &'static str,
    },
    /// A description row carries data but no name.
    #[error("row {row}: description has no name")]
    MissingName { row: usize },
}

/// A single data row together with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    line: usize,
    cells: Vec<String>,
}

impl Row {
    #[inline]
    fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    fn parse<T: FromStr>(&self, column: usize, expected: &'static str) -> Result<T, LoadError> {
        let token = self.cell(column);
        token.parse().map_err(|_| LoadError::Parse {
            row: self.line,
            column,
            token: token.to_owned(),
            expected,
        })
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// Splits one line into trimmed cells.
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                cells.push(current.trim().to_owned());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_owned());
    cells
}

/// Reads all data rows of a delimited table.
fn read_rows<R: BufRead>(rdr: R, delimiter: char) -> Result<Vec<Row>, LoadError> {
    let mut rows = Vec::new();
    let mut first = true;

    for (i, line) in rdr.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let row = Row {
            line: i + 1,
            cells: split_line(line, delimiter),
        };

        if std::mem::take(&mut first) {
            let is_comment = row.cells[0]
                .char_indices()
                .take(2)
                .any(|(_, c)| c == '#');
            if is_comment {
                continue;
            }
        }

        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(rows)
}

/// Parses the `enabled` column of a feed description.
///
/// Empty means enabled; `0` and `false` (any case) mean disabled.
pub fn parse_enabled(cell: &str) -> bool {
    !(cell == "0" || cell.eq_ignore_ascii_case("false"))
}

/// Inserts `value` keyed by `name`, replacing an earlier entry in place.
fn upsert<T>(entries: &mut Vec<T>, positions: &mut FxHashMap<String, usize>, name: &str, value: T) {
    match positions.get(name) {
        Some(&pos) => entries[pos] = value,
        None => {
            positions.insert(name.to_owned(), entries.len());
            entries.push(value);
        }
    }
}

/// Loads package descriptions from rows `name, width, pitch[, tape colour[, comments]]`.
///
/// A later row with the same name replaces the earlier one. Unknown tape
/// colours are logged and treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageDescriptionLoader {
    delimiter: char,
}

impl Default for PackageDescriptionLoader {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl PackageDescriptionLoader {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column delimiter.
    #[inline]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Loads descriptions from a type implementing `BufRead`.
    pub fn from_bufread<R: BufRead>(&self, rdr: R) -> Result<Vec<PackageDescription>, LoadError> {
        let mut packages = Vec::new();
        let mut positions = FxHashMap::default();

        for row in read_rows(rdr, self.delimiter)? {
            let name = row.cell(0);
            if name.is_empty() {
                if row.is_blank() {
                    continue;
                }
                return Err(LoadError::MissingName { row: row.line });
            }

            let width: u32 = row.parse(1, "u32")?;
            let pitch: u32 = row.parse(2, "u32")?;
            let tape_color = match row.cell(3) {
                "" => None,
                cell => match cell.parse::<TapeColor>() {
                    Ok(color) => Some(color),
                    Err(e) => {
                        tracing::warn!(package = %name, row = row.line, "{e}");
                        None
                    }
                },
            };

            let package = PackageDescription::new(name, width, pitch)
                .with_tape_color(tape_color)
                .with_comments(row.cell(4));
            upsert(&mut packages, &mut positions, name, package);
        }

        tracing::debug!(count = packages.len(), "loaded package descriptions");
        Ok(packages)
    }

    /// Loads descriptions from a file path.
    #[inline]
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<PackageDescription>, LoadError> {
        let file = File::open(path)?;
        self.from_bufread(BufReader::new(file))
    }

    /// Loads descriptions from a generic reader.
    #[inline]
    pub fn from_reader<R: Read>(&self, r: R) -> Result<Vec<PackageDescription>, LoadError> {
        self.from_bufread(BufReader::new(r))
    }

    /// Loads descriptions from a string slice.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, s: &str) -> Result<Vec<PackageDescription>, LoadError> {
        self.from_reader(s.as_bytes())
    }
}

/// Loads feed descriptions from rows `name, width, length[, enabled[, comments]]`.
///
/// Disabled descriptions are kept so callers can report them; they are never
/// attached to slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedDescriptionLoader {
    delimiter: char,
}

impl Default for FeedDescriptionLoader {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl FeedDescriptionLoader {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Loads descriptions from a type implementing `BufRead`.
    pub fn from_bufread<R: BufRead>(&self, rdr: R) -> Result<Vec<FeedDescription>, LoadError> {
        let mut feeds = Vec::new();
        let mut positions = FxHashMap::default();

        for row in read_rows(rdr, self.delimiter)? {
            let name = row.cell(0);
            if name.is_empty() {
                if row.is_blank() {
                    continue;
                }
                return Err(LoadError::MissingName { row: row.line });
            }

            let width: u32 = row.parse(1, "u32")?;
            let length: i32 = row.parse(2, "i32")?;
            let enabled = parse_enabled(row.cell(3));
            if !enabled {
                tracing::debug!(feed = %name, "feed description is disabled");
            }

            let feed = FeedDescription::new(name, width, length)
                .with_enabled(enabled)
                .with_comments(row.cell(4));
            upsert(&mut feeds, &mut positions, name, feed);
        }

        tracing::debug!(count = feeds.len(), "loaded feed descriptions");
        Ok(feeds)
    }

    #[inline]
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<FeedDescription>, LoadError> {
        let file = File::open(path)?;
        self.from_bufread(BufReader::new(file))
    }

    #[inline]
    pub fn from_reader<R: Read>(&self, r: R) -> Result<Vec<FeedDescription>, LoadError> {
        self.from_bufread(BufReader::new(r))
    }

    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, s: &str) -> Result<Vec<FeedDescription>, LoadError> {
        self.from_reader(s.as_bytes())
    }
}

/// Post-processing applied to the package column of a BOM row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FootprintStyle {
    /// The cell is the package as is.
    #[default]
    Plain,
    /// The cell is a `Library:Footprint` pair; only the footprint is kept.
    /// An empty cell marks a part that is not placed (`DNP`).
    KiCad,
}

impl FootprintStyle {
    fn package(&self, cell: &str) -> String {
        match self {
            FootprintStyle::Plain => cell.to_owned(),
            FootprintStyle::KiCad if cell.is_empty() => "DNP".to_owned(),
            FootprintStyle::KiCad => match cell.split_once(':') {
                Some((_, footprint)) => footprint.to_owned(),
                None => cell.to_owned(),
            },
        }
    }
}

/// Column positions (0-based) of the fields a BOM row must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomColumnMap {
    pub quantity: usize,
    pub package: usize,
    pub value: usize,
    pub references: Option<usize>,
}

impl BomColumnMap {
    /// KiCad's `Item, Qty, Reference(s), Value, LibPart, Footprint` layout.
    pub const KICAD: BomColumnMap = BomColumnMap {
        quantity: 1,
        references: Some(2),
        value: 3,
        package: 5,
    };

    /// Rows with fewer cells than this are skipped.
    pub fn min_columns(&self) -> usize {
        let last = self.quantity.max(self.package).max(self.value);
        self.references.map_or(last, |r| last.max(r)) + 1
    }
}

/// Loads BOM entries through a [`BomColumnMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomLoader {
    delimiter: char,
    columns: BomColumnMap,
    footprint: FootprintStyle,
}

impl BomLoader {
    /// Creates a loader for the given column layout with plain package cells.
    pub fn new(columns: BomColumnMap) -> Self {
        Self {
            delimiter: ',',
            columns,
            footprint: FootprintStyle::Plain,
        }
    }

    /// Creates a loader for KiCad's default BOM export.
    pub fn kicad() -> Self {
        Self::new(BomColumnMap::KICAD).footprint(FootprintStyle::KiCad)
    }

    #[inline]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[inline]
    pub fn footprint(mut self, footprint: FootprintStyle) -> Self {
        self.footprint = footprint;
        self
    }

    /// Loads entries from a type implementing `BufRead`.
    pub fn from_bufread<R: BufRead>(&self, rdr: R) -> Result<Vec<BomEntry>, LoadError> {
        let min_columns = self.columns.min_columns();
        let mut entries = Vec::new();

        for row in read_rows(rdr, self.delimiter)? {
            if row.cells.len() < min_columns {
                tracing::debug!(row = row.line, cells = row.cells.len(), "skipping short BOM row");
                continue;
            }

            let quantity: u32 = row.parse(self.columns.quantity, "u32")?;
            let references = self
                .columns
                .references
                .map(|column| {
                    row.cell(column)
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .filter(|r| !r.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            let package = self.footprint.package(row.cell(self.columns.package));

            entries.push(BomEntry::new(
                references,
                quantity,
                package,
                row.cell(self.columns.value),
            ));
        }

        tracing::debug!(count = entries.len(), "loaded BOM entries");
        Ok(entries)
    }

    #[inline]
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BomEntry>, LoadError> {
        let file = File::open(path)?;
        self.from_bufread(BufReader::new(file))
    }

    #[inline]
    pub fn from_reader<R: Read>(&self, r: R) -> Result<Vec<BomEntry>, LoadError> {
        self.from_bufread(BufReader::new(r))
    }

    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, s: &str) -> Result<Vec<BomEntry>, LoadError> {
        self.from_reader(s.as_bytes())
    }
}
