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

//! Strongly typed indices for the feed allocation domain.
//!
//! Slots live inside feed sets, feed sets live inside `SystemFeeds`, and
//! matched parts live inside the `PartMap`. All three are addressed by a
//! position, and mixing them up is an easy mistake to make. `TypedIndex<T>`
//! wraps the position in a zero-cost newtype carrying a tag, so that a
//! `SlotIndex` can never be handed to something expecting a `PartIndex`.
//!
//! ```rust
//! use reelmap_model::index::{PartIndex, SlotIndex};
//!
//! let slot = SlotIndex::new(3);
//! let part = PartIndex::new(3);
//! assert_eq!(slot.get(), part.get());
//! assert_eq!(format!("{}", slot), "SlotIndex(3)");
//! ```

use std::marker::PhantomData;

/// Names a family of indices for `Debug`/`Display` output.
pub trait TypedIndexTag: Clone {
    const NAME: &'static str;
}

/// A `usize` position tagged with the collection it points into.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedIndex<T> {
    index: usize,
    _marker: PhantomData<T>,
}

impl<T> TypedIndex<T> {
    /// Wraps a raw position.
    #[inline(always)]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the raw position.
    #[inline(always)]
    pub const fn get(&self) -> usize {
        self.index
    }
}

impl<T: TypedIndexTag> std::fmt::Debug for TypedIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T: TypedIndexTag> std::fmt::Display for TypedIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> From<usize> for TypedIndex<T> {
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl<T> From<TypedIndex<T>> for usize {
    fn from(typed_index: TypedIndex<T>) -> Self {
        typed_index.index
    }
}

/// Tag for positions of slots inside a single `FeedSet`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SlotIndexTag;

impl TypedIndexTag for SlotIndexTag {
    const NAME: &'static str = "SlotIndex";
}

/// Position of a slot in its feed set's insertion order.
pub type SlotIndex = TypedIndex<SlotIndexTag>;

/// Tag for positions of feed sets inside `SystemFeeds`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FeedSetIndexTag;

impl TypedIndexTag for FeedSetIndexTag {
    const NAME: &'static str = "FeedSetIndex";
}

/// Position of a feed set in creation order.
pub type FeedSetIndex = TypedIndex<FeedSetIndexTag>;

/// Tag for positions of matched parts inside the `PartMap`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PartIndexTag;

impl TypedIndexTag for PartIndexTag {
    const NAME: &'static str = "PartIndex";
}

/// Position of a project part in the (quantity ordered) part map.
pub type PartIndex = TypedIndex<PartIndexTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_tag_name() {
        assert_eq!(format!("{}", SlotIndex::new(2)), "SlotIndex(2)");
        assert_eq!(format!("{:?}", FeedSetIndex::new(0)), "FeedSetIndex(0)");
        assert_eq!(format!("{}", PartIndex::new(11)), "PartIndex(11)");
    }

    #[test]
    fn test_conversions() {
        let idx: SlotIndex = 42.into();
        assert_eq!(idx.get(), 42);
        let raw: usize = idx.into();
        assert_eq!(raw, 42);
    }

    #[test]
    fn test_ordering_follows_position() {
        assert!(PartIndex::new(1) < PartIndex::new(2));
        assert_eq!(SlotIndex::new(5), SlotIndex::new(5));
    }
}
