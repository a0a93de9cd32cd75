//! # Spectrum Access
//!
//! One read interface over interchangeable backends. Callers hold a
//! `Box<dyn SpectrumAccess>` and never learn whether records come from memory
//! or from a cache file on disk.
//!
//! Every metadata query is answered from the in-memory [`MetadataStore`];
//! only `get_spectrum_by_id` and `get_chromatogram_by_id` touch payload.
//!
//! ```rust,no_run
//! use mzcache::access::{self, ReadMode};
//! use mzcache::cache::ReaderConfig;
//!
//! let mut access = access::open("run.mzcache", ReadMode::Cached, ReaderConfig::default())?;
//! for id in access.get_spectra_by_rt(120.0, 5.0)? {
//!     let spectrum = access.get_spectrum_by_id(id)?;
//!     println!("{}: {} peaks", spectrum.native_id, spectrum.peak_count());
//! }
//! # Ok::<(), mzcache::cache::CacheError>(())
//! ```

mod cached;
mod in_memory;

pub use cached::CachedAccess;
pub use in_memory::InMemoryAccess;

use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::cache::{CacheError, RandomAccessCacheReader, ReaderConfig};
use crate::metadata::{MetadataStore, SpectrumMeta};
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Read interface shared by all backends
///
/// Point reads take `&mut self` because file-backed implementations move a
/// cursor. Use [`light_clone`](Self::light_clone) for concurrent readers.
pub trait SpectrumAccess: Send {
    /// Metadata store answering all light queries
    fn metadata(&self) -> &MetadataStore;

    /// Full spectrum `id`, including its native identifier
    fn get_spectrum_by_id(&mut self, id: usize) -> Result<SpectrumRecord, CacheError>;

    /// Full chromatogram `id`, including its native identifier
    fn get_chromatogram_by_id(&mut self, id: usize) -> Result<ChromatogramRecord, CacheError>;

    /// Independent accessor sharing this one's immutable state
    fn light_clone(&self) -> Result<Box<dyn SpectrumAccess>, CacheError>;

    /// Number of spectra
    fn get_nr_spectra(&self) -> usize {
        self.metadata().nr_spectra()
    }

    /// Number of chromatograms
    fn get_nr_chromatograms(&self) -> usize {
        self.metadata().nr_chromatograms()
    }

    /// Light metadata of spectrum `id`
    fn get_spectrum_meta_by_id(&self, id: usize) -> Result<&SpectrumMeta, CacheError> {
        self.metadata().spectrum(id)
    }

    /// Native identifier of spectrum `id`
    fn get_spectrum_native_id(&self, id: usize) -> Result<&str, CacheError> {
        Ok(self.metadata().spectrum(id)?.native_id.as_str())
    }

    /// Native identifier of chromatogram `id`
    fn get_chromatogram_native_id(&self, id: usize) -> Result<&str, CacheError> {
        Ok(self.metadata().chromatogram(id)?.native_id.as_str())
    }

    /// Ids of spectra with RT in `[rt - delta_rt, rt + delta_rt]`, in RT order
    fn get_spectra_by_rt(&self, rt: f64, delta_rt: f64) -> Result<Vec<usize>, CacheError> {
        self.metadata().spectra_by_rt(rt, delta_rt)
    }

    /// Spectrum id for a native identifier
    fn find_spectrum_by_native_id(&self, native_id: &str) -> Option<usize> {
        self.metadata().find_spectrum(native_id)
    }

    /// Chromatogram id for a native identifier
    fn find_chromatogram_by_native_id(&self, native_id: &str) -> Option<usize> {
        self.metadata().find_chromatogram(native_id)
    }
}

/// How a cache file is exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMode {
    /// Serve payload from the file with one seek per read
    #[default]
    Cached,
    /// Load every record into memory once, then serve from memory
    CachedInMemory,
}

/// Open a cache file behind the access interface
pub fn open<P: AsRef<Path>>(
    path: P,
    mode: ReadMode,
    config: ReaderConfig,
) -> Result<Box<dyn SpectrumAccess>, CacheError> {
    let path = path.as_ref();
    let reader = RandomAccessCacheReader::open_with_config(path, config)?;
    match mode {
        ReadMode::Cached => Ok(Box::new(CachedAccess::from_reader(reader)?)),
        ReadMode::CachedInMemory => {
            let mut reader = reader;
            let access = InMemoryAccess::load(&mut reader)?;
            info!(
                "Loaded {} spectra and {} chromatograms from {} into memory",
                access.get_nr_spectra(),
                access.get_nr_chromatograms(),
                path.display()
            );
            Ok(Box::new(access))
        }
    }
}
