//! Source-side bookkeeping for phrase-based search.
//!
//! This crate provides the two leaf value types every other part of the decoder
//! is built on:
//!
//! - [`SourceRange`] - an inclusive, contiguous span `[start, end]` of source positions
//! - [`CoverageBitmap`] - a fixed-length bit vector recording which source positions a
//!   partial translation has already consumed, with cached word count and first gap
//!
//! Both types are immutable in practice: a bitmap is only ever derived from its
//! parent by [`CoverageBitmap::with_range`], so bitmaps referenced by hypotheses
//! never change and can be compared and hashed structurally.

pub mod bitmap;
pub mod range;

pub use bitmap::{CoverageBitmap, GapsIter};
pub use range::SourceRange;
