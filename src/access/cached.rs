use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use super::SpectrumAccess;
use crate::cache::{CacheError, RandomAccessCacheReader, ReaderConfig};
use crate::metadata::MetadataStore;
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Backend reading payload from a cache file on demand
///
/// Metadata comes from the companion file, or from the record headers when
/// the reader was configured to derive it.
#[derive(Debug)]
pub struct CachedAccess {
    reader: RandomAccessCacheReader<BufReader<File>>,
    metadata: Arc<MetadataStore>,
}

impl CachedAccess {
    /// Open a cache file
    pub fn open<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self, CacheError> {
        Self::from_reader(RandomAccessCacheReader::open_with_config(path, config)?)
    }

    /// Wrap an opened reader
    ///
    /// Fails with `MissingMetadata` when the reader has no metadata store.
    pub fn from_reader(reader: RandomAccessCacheReader<BufReader<File>>) -> Result<Self, CacheError> {
        let metadata = reader
            .metadata()
            .cloned()
            .ok_or(CacheError::MissingMetadata)?;
        Ok(Self { reader, metadata })
    }

    /// Underlying reader
    pub fn reader(&self) -> &RandomAccessCacheReader<BufReader<File>> {
        &self.reader
    }
}

impl SpectrumAccess for CachedAccess {
    fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn get_spectrum_by_id(&mut self, id: usize) -> Result<SpectrumRecord, CacheError> {
        self.reader.get_spectrum_by_id(id)
    }

    fn get_chromatogram_by_id(&mut self, id: usize) -> Result<ChromatogramRecord, CacheError> {
        self.reader.get_chromatogram_by_id(id)
    }

    fn light_clone(&self) -> Result<Box<dyn SpectrumAccess>, CacheError> {
        Ok(Box::new(Self {
            reader: self.reader.try_clone()?,
            metadata: Arc::clone(&self.metadata),
        }))
    }
}
