//! Random-access cache reader
//!
//! Opening a file reads the header and builds the offset index once. After
//! that every point read is a single seek followed by one bounded read.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use super::codec::{self, SpectrumHeader};
use super::header::FileHeader;
use super::index::{CacheIndexBuilder, IndexMode, IndexSource, OffsetIndex};
use super::CacheError;
use crate::metadata::{MetadataStore, RunInfo, SpectrumMeta};
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Configuration for opening a cache file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// How the offset index is obtained
    pub index_mode: IndexMode,

    /// Input buffer size in bytes
    pub buffer_size: usize,

    /// Derive metadata from record headers when no companion file exists
    pub derive_missing_metadata: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            index_mode: IndexMode::Auto,
            buffer_size: 64 * 1024,
            derive_missing_metadata: true,
        }
    }
}

/// Reader for a single cache file
///
/// Point reads need `&mut self` because they move the file cursor. Use
/// [`try_clone`](Self::try_clone) to get an independent handle for another
/// thread; the index and metadata are shared.
#[derive(Debug)]
pub struct RandomAccessCacheReader<R = BufReader<File>> {
    reader: R,
    path: Option<PathBuf>,
    header: FileHeader,
    index: Arc<OffsetIndex>,
    source: IndexSource,
    file_len: u64,
    config: ReaderConfig,
    metadata: Option<Arc<MetadataStore>>,
}

impl RandomAccessCacheReader<BufReader<File>> {
    /// Open a cache file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    /// Open a cache file
    ///
    /// The companion metadata file is attached when present. Without it the
    /// store is derived from the record headers if the configuration allows.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: ReaderConfig,
    ) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(config.buffer_size, file);
        let mut cache = Self::from_reader(reader, config)?;
        cache.path = Some(path.to_path_buf());

        let companion = MetadataStore::companion_path(path);
        if companion.exists() {
            let store = MetadataStore::load(&companion).map_err(|e| {
                CacheError::CorruptCache(format!(
                    "unreadable companion metadata {}: {}",
                    companion.display(),
                    e
                ))
            })?;
            cache = cache.with_metadata(Arc::new(store))?;
        } else if cache.config.derive_missing_metadata {
            debug!(
                "No companion metadata at {}; deriving from record headers",
                companion.display()
            );
            let store = cache.derive_metadata()?;
            cache = cache.with_metadata(Arc::new(store))?;
        }

        info!(
            "Opened {} ({} spectra, {} chromatograms, index from {})",
            path.display(),
            cache.nr_spectra(),
            cache.nr_chromatograms(),
            cache.source
        );
        Ok(cache)
    }

    /// Open an independent handle to the same file
    ///
    /// The clone shares the index and metadata and owns its own cursor.
    pub fn try_clone(&self) -> Result<Self, CacheError> {
        let path = self.path.as_ref().ok_or_else(|| {
            CacheError::InvalidArgument("reader was not opened from a path".to_string())
        })?;
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::with_capacity(self.config.buffer_size, file),
            path: self.path.clone(),
            header: self.header,
            index: Arc::clone(&self.index),
            source: self.source,
            file_len: self.file_len,
            config: self.config.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

impl<R: Read + Seek> RandomAccessCacheReader<R> {
    /// Build a reader over any seekable source
    ///
    /// No metadata is attached; see [`with_metadata`](Self::with_metadata).
    pub fn from_reader(mut reader: R, config: ReaderConfig) -> Result<Self, CacheError> {
        let built = CacheIndexBuilder::new(config.index_mode).build(&mut reader)?;
        Ok(Self {
            reader,
            path: None,
            header: built.header,
            index: Arc::new(built.index),
            source: built.source,
            file_len: built.file_len,
            config,
            metadata: None,
        })
    }

    /// Attach a metadata store
    ///
    /// Fails with `CorruptCache` when its record counts disagree with the index.
    pub fn with_metadata(mut self, store: Arc<MetadataStore>) -> Result<Self, CacheError> {
        if store.nr_spectra() != self.index.nr_spectra()
            || store.nr_chromatograms() != self.index.nr_chromatograms()
        {
            return Err(CacheError::CorruptCache(format!(
                "metadata describes {} spectra and {} chromatograms but the cache holds {} and {}",
                store.nr_spectra(),
                store.nr_chromatograms(),
                self.index.nr_spectra(),
                self.index.nr_chromatograms()
            )));
        }
        self.metadata = Some(store);
        Ok(self)
    }

    /// Decoded file header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Validated offset index
    pub fn index(&self) -> &Arc<OffsetIndex> {
        &self.index
    }

    /// Where the index came from
    pub fn index_source(&self) -> IndexSource {
        self.source
    }

    /// File length in bytes
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Path the reader was opened from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Attached metadata store
    pub fn metadata(&self) -> Option<&Arc<MetadataStore>> {
        self.metadata.as_ref()
    }

    /// Number of spectra
    pub fn nr_spectra(&self) -> usize {
        self.index.nr_spectra()
    }

    /// Number of chromatograms
    pub fn nr_chromatograms(&self) -> usize {
        self.index.nr_chromatograms()
    }

    /// Read spectrum `id`
    ///
    /// The native id is filled in from the attached metadata, if any.
    pub fn get_spectrum_by_id(&mut self, id: usize) -> Result<SpectrumRecord, CacheError> {
        let (offset, span) = self.index.spectrum_span(id)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut record = codec::decode_spectrum_exact(&mut self.reader, span)?;
        if let Some(store) = &self.metadata {
            record.native_id = store.spectrum(id)?.native_id.clone();
        }
        Ok(record)
    }

    /// Read chromatogram `id`
    pub fn get_chromatogram_by_id(&mut self, id: usize) -> Result<ChromatogramRecord, CacheError> {
        let (offset, span) = self.index.chromatogram_span(id)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut record = codec::decode_chromatogram_exact(&mut self.reader, span)?;
        if let Some(store) = &self.metadata {
            let meta = store.chromatogram(id)?;
            record.native_id = meta.native_id.clone();
            record.precursor_mz = meta.precursor_mz;
            record.product_mz = meta.product_mz;
        }
        Ok(record)
    }

    /// Read only the fixed header of spectrum `id`
    ///
    /// The declared peak count must fill the record's slot exactly.
    pub fn read_spectrum_header(&mut self, id: usize) -> Result<SpectrumHeader, CacheError> {
        let (offset, span) = self.index.spectrum_span(id)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        codec::read_spectrum_header_exact(&mut self.reader, span)
    }

    /// Ids of spectra with RT in `[rt - delta_rt, rt + delta_rt]`, in RT order
    pub fn get_spectra_by_rt(&self, rt: f64, delta_rt: f64) -> Result<Vec<usize>, CacheError> {
        self.metadata
            .as_ref()
            .ok_or(CacheError::MissingMetadata)?
            .spectra_by_rt(rt, delta_rt)
    }

    /// Build a metadata store from the record headers
    ///
    /// Native ids are left empty; chromatograms get no transition.
    pub fn derive_metadata(&mut self) -> Result<MetadataStore, CacheError> {
        let mut spectra = Vec::with_capacity(self.nr_spectra());
        for id in 0..self.nr_spectra() {
            let header = self.read_spectrum_header(id)?;
            spectra.push(SpectrumMeta {
                native_id: String::new(),
                ms_level: header.ms_level,
                retention_time: header.retention_time,
            });
        }
        let chromatograms = (0..self.nr_chromatograms())
            .map(|_| Default::default())
            .collect();

        let mut run = RunInfo::new();
        if let Some(path) = &self.path {
            run.source_file = Some(path.display().to_string());
        }
        Ok(MetadataStore::new(run, spectra, chromatograms)?)
    }
}
