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

//! Package and feed capacity model.
//!
//! A `PackageDescription` says how wide the carrier tape of a component
//! package is and how far apart the pockets are. A `FeedDescription` says how
//! wide and how long a class of feed slot is. Together they answer the two
//! questions the allocator keeps asking: *can this slot carry the package at
//! all*, and *how many units fit*.
//!
//! Strip feeders have a finite length and therefore a countable number of
//! pockets. A feed description with a length of zero (or less) models a reel,
//! which is treated as holding [`REEL_CAPACITY`] units.

use std::str::FromStr;

/// Units assumed to be held by a slot whose feed description has no length.
pub const REEL_CAPACITY: u32 = 10_000;

/// The carrier tape type of a package, used to configure vision on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapeColor {
    Black,
    White,
    Clear,
}

impl TapeColor {
    /// Returns the lowercase name used in description files.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TapeColor::Black => "black",
            TapeColor::White => "white",
            TapeColor::Clear => "clear",
        }
    }
}

impl std::fmt::Display for TapeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tape colour name is not one of `black`, `white` or `clear`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tape colour '{0}' (expected black, white or clear)")]
pub struct UnknownTapeColor(pub String);

impl FromStr for TapeColor {
    type Err = UnknownTapeColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(TapeColor::Black),
            "white" => Ok(TapeColor::White),
            "clear" => Ok(TapeColor::Clear),
            _ => Err(UnknownTapeColor(s.to_owned())),
        }
    }
}

/// Physical description of a component package on tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescription {
    name: String,
    width_mm: u32,
    pitch_mm: u32,
    tape_color: Option<TapeColor>,
    comments: String,
}

impl PackageDescription {
    /// Creates a description without tape colour or comments.
    pub fn new(name: impl Into<String>, width_mm: u32, pitch_mm: u32) -> Self {
        Self {
            name: name.into(),
            width_mm,
            pitch_mm,
            tape_color: None,
            comments: String::new(),
        }
    }

    /// Sets the tape colour.
    #[inline]
    pub fn with_tape_color(mut self, tape_color: Option<TapeColor>) -> Self {
        self.tape_color = tape_color;
        self
    }

    /// Sets the free-form comment column.
    #[inline]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width of the carrier tape in millimetres.
    #[inline]
    pub fn width_mm(&self) -> u32 {
        self.width_mm
    }

    /// Distance between two consecutive pockets in millimetres.
    #[inline]
    pub fn pitch_mm(&self) -> u32 {
        self.pitch_mm
    }

    #[inline]
    pub fn tape_color(&self) -> Option<TapeColor> {
        self.tape_color
    }

    #[inline]
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Returns `true` if this description applies to the given package string.
    ///
    /// Matching is by substring: a description named `0402` applies to
    /// `R_0402_1005Metric`.
    #[inline]
    pub fn matches(&self, package: &str) -> bool {
        !self.name.is_empty() && package.contains(self.name.as_str())
    }
}

impl std::fmt::Display for PackageDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.width_mm, self.pitch_mm)
    }
}

/// Physical description of a class of feed slots.
///
/// Every slot whose name contains `name` is described by this entry, so a
/// description named `8mm` covers `8mmLeft_01`, `8mmRight_07`, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDescription {
    name: String,
    width_mm: u32,
    length_mm: i32,
    enabled: bool,
    comments: String,
}

impl FeedDescription {
    /// Creates an enabled description without comments.
    pub fn new(name: impl Into<String>, width_mm: u32, length_mm: i32) -> Self {
        Self {
            name: name.into(),
            width_mm,
            length_mm,
            enabled: true,
            comments: String::new(),
        }
    }

    #[inline]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[inline]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn width_mm(&self) -> u32 {
        self.width_mm
    }

    /// Usable strip length in millimetres; `<= 0` denotes a reel.
    #[inline]
    pub fn length_mm(&self) -> i32 {
        self.length_mm
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn comments(&self) -> &str {
        &self.comments
    }

    #[inline]
    pub fn is_reel(&self) -> bool {
        self.length_mm <= 0
    }

    /// Returns `true` if a slot of this class applies to the given slot name.
    #[inline]
    pub fn matches(&self, slot_name: &str) -> bool {
        !self.name.is_empty() && slot_name.contains(self.name.as_str())
    }

    /// Returns `true` if the tape width of `package` equals the slot width.
    #[inline]
    pub fn can_carry(&self, package: &PackageDescription) -> bool {
        self.width_mm == package.width_mm
    }

    /// Returns how many units of `package` a single slot of this class holds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use reelmap_model::package::{FeedDescription, PackageDescription, REEL_CAPACITY};
    ///
    /// let r0402 = PackageDescription::new("0402", 8, 2);
    /// assert_eq!(FeedDescription::new("8mm", 8, 250).capacity(&r0402), 125);
    /// assert_eq!(FeedDescription::new("8mmReel", 8, 0).capacity(&r0402), REEL_CAPACITY);
    /// assert_eq!(FeedDescription::new("12mm", 12, 250).capacity(&r0402), 0);
    /// ```
    pub fn capacity(&self, package: &PackageDescription) -> u32 {
        if !self.can_carry(package) {
            return 0;
        }

        if self.is_reel() {
            return REEL_CAPACITY;
        }

        match package.pitch_mm {
            0 => 0,
            pitch => self.length_mm as u32 / pitch,
        }
    }
}

impl std::fmt::Display for FeedDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} @ {})", self.name, self.length_mm, self.width_mm)
    }
}
