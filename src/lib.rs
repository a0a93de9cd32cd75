//! # mzcache - Random-Access Spectrum Cache
//!
//! `mzcache` stores the numeric payload of very large LC-MS runs in a flat
//! binary file so that any single spectrum or chromatogram can be read with
//! one seek, without parsing the original XML document again and without
//! holding the run in memory.
//!
//! ## Key Features
//!
//! - **Single-pass writer**: records are appended as upstream parsers emit
//!   them; only one offset per record is kept in memory.
//!
//! - **Offset index**: a checksummed footer makes opening O(records); files
//!   without it are indexed by a sequential scan.
//!
//! - **Companion metadata**: native identifiers, MS levels and retention
//!   times live in a small JSON file next to the cache and answer every
//!   metadata query from memory.
//!
//! - **Interchangeable backends**: [`access::SpectrumAccess`] serves records
//!   from the cache file or from memory behind one interface.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzcache::cache::{CacheWriter, RandomAccessCacheReader, WriterConfig};
//! use mzcache::record::SpectrumRecord;
//!
//! let spectrum = SpectrumRecord::new("scan=1", 1, 60.0, vec![400.0, 500.0], vec![1e4, 2e4])?;
//!
//! let mut writer = CacheWriter::create("run.mzcache", 1, 0, WriterConfig::default())?;
//! writer.consume_spectrum(&spectrum)?;
//! writer.close()?;
//!
//! let mut reader = RandomAccessCacheReader::open("run.mzcache")?;
//! assert_eq!(reader.get_spectrum_by_id(0)?, spectrum);
//! # Ok::<(), mzcache::cache::CacheError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`record`]: spectrum and chromatogram records
//! - [`cache`]: binary codec, offset index, streaming writer and random-access reader
//! - [`metadata`]: companion metadata store
//! - [`access`]: backend-independent read interface
//! - [`validator`]: deep integrity checks for cache files

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod access;
pub mod cache;
pub mod metadata;
pub mod record;
pub mod validator;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::access::{CachedAccess, InMemoryAccess, ReadMode, SpectrumAccess};
    pub use crate::cache::{
        CacheError, CacheWriter, CacheWriterStats, IndexMode, RandomAccessCacheReader,
        ReaderConfig, WriterConfig,
    };
    pub use crate::metadata::{ChromatogramMeta, MetadataError, MetadataStore, RunInfo, SpectrumMeta};
    pub use crate::record::{ChromatogramRecord, SpectrumRecord};
    pub use crate::validator::{validate_cache_file, ValidationOptions, ValidationReport};
}
