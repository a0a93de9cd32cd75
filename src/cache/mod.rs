//! # Binary Spectrum Cache
//!
//! A cache file holds the numeric payload of one LC-MS run in a layout that
//! supports O(1) point reads:
//!
//! ```text
//! ┌────────────────────────────┐ 0
//! │ header (32 bytes)          │ magic, version, flags, record counts
//! ├────────────────────────────┤ 32
//! │ spectrum records           │ all spectra, in id order
//! ├────────────────────────────┤
//! │ chromatogram records       │ all chromatograms, in id order
//! ├────────────────────────────┤ footer_start
//! │ offset footer (optional)   │ record offsets, CRC32 trailer
//! └────────────────────────────┘
//! ```
//!
//! Writing is a single sequential pass ([`CacheWriter`]). Opening a file
//! builds a validated [`OffsetIndex`], from the footer or by scanning every
//! record ([`CacheIndexBuilder`]). [`RandomAccessCacheReader`] then serves
//! point reads with one seek each. A record owns the bytes up to the next
//! record's offset (or `footer_start`), and its declared count must fill
//! exactly that slot.

mod error;

pub mod codec;
pub mod footer;
pub mod header;
pub mod index;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use error::CacheError;
pub use header::FileHeader;
pub use index::{build_index, BuiltIndex, CacheIndexBuilder, IndexMode, IndexSource, OffsetIndex};
pub use reader::{RandomAccessCacheReader, ReaderConfig};
pub use writer::{CacheWriter, CacheWriterStats, WriterConfig, WriterState};
