//! Single-pass streaming cache writer
//!
//! Records are appended as they arrive; only one offset and one light metadata
//! entry per record stay in memory. The writer needs nothing but [`Write`]: it
//! tracks its own byte position, so no seeking back is ever required.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::codec;
use super::footer;
use super::header::{FileHeader, HEADER_LEN};
use super::CacheError;
use crate::metadata::{ChromatogramMeta, MetadataStore, RunInfo, SpectrumMeta};
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Configuration for the cache writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Append the offset footer on close
    pub write_footer: bool,

    /// Write the companion metadata file next to path-based caches
    pub write_companion: bool,

    /// Output buffer size in bytes
    pub buffer_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            write_footer: true,
            write_companion: true,
            buffer_size: 256 * 1024,
        }
    }
}

/// Lifecycle of a [`CacheWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing written yet
    NotStarted,
    /// Header being emitted
    WritingHeader,
    /// Spectrum section open
    WritingSpectra,
    /// Chromatogram section open; no more spectra accepted
    WritingChromatograms,
    /// Footer written and sink flushed
    Closed,
}

/// Statistics from a completed cache write
#[derive(Debug, Clone, Default)]
pub struct CacheWriterStats {
    /// Spectrum records written
    pub spectra_written: usize,
    /// Chromatogram records written
    pub chromatograms_written: usize,
    /// Total (axis, intensity) pairs written
    pub data_points_written: u64,
    /// Total file size including header and footer
    pub bytes_written: u64,
}

impl std::fmt::Display for CacheWriterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} spectra and {} chromatograms ({} data points, {} bytes)",
            self.spectra_written,
            self.chromatograms_written,
            self.data_points_written,
            self.bytes_written
        )
    }
}

/// Streaming writer for cache files
///
/// Spectra must all precede chromatograms. Expected counts are declared up
/// front because they go into the header. If the writer is dropped without
/// [`close`](Self::close), the same finalization runs in `Drop`.
pub struct CacheWriter<W: Write = BufWriter<File>> {
    sink: Option<W>,
    state: WriterState,
    failed: bool,
    config: WriterConfig,
    expected_spectra: u64,
    expected_chromatograms: u64,
    position: u64,
    spectra_offsets: Vec<u64>,
    chrom_offsets: Vec<u64>,
    spectra_meta: Vec<SpectrumMeta>,
    chrom_meta: Vec<ChromatogramMeta>,
    data_points_written: u64,
    run: RunInfo,
    companion_path: Option<PathBuf>,
}

impl CacheWriter<BufWriter<File>> {
    /// Create a cache file at `path`
    ///
    /// With `write_companion` enabled the companion metadata file is written
    /// next to it on close.
    pub fn create<P: AsRef<Path>>(
        path: P,
        expected_spectra: u64,
        expected_chromatograms: u64,
        config: WriterConfig,
    ) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let sink = BufWriter::with_capacity(config.buffer_size, file);
        let companion_path = config
            .write_companion
            .then(|| MetadataStore::companion_path(path));

        let mut writer = Self::new(sink, expected_spectra, expected_chromatograms, config);
        writer.companion_path = companion_path;
        writer.run.source_file = Some(path.display().to_string());
        Ok(writer)
    }
}

impl<W: Write> CacheWriter<W> {
    /// Create a writer over any sink
    pub fn new(
        sink: W,
        expected_spectra: u64,
        expected_chromatograms: u64,
        config: WriterConfig,
    ) -> Self {
        Self {
            sink: Some(sink),
            state: WriterState::NotStarted,
            failed: false,
            config,
            expected_spectra,
            expected_chromatograms,
            position: 0,
            spectra_offsets: Vec::new(),
            chrom_offsets: Vec::new(),
            spectra_meta: Vec::new(),
            chrom_meta: Vec::new(),
            data_points_written: 0,
            run: RunInfo::new(),
            companion_path: None,
        }
    }

    /// Replace the run description stored in the companion metadata
    pub fn with_run_info(mut self, run: RunInfo) -> Self {
        self.run = run;
        self
    }

    /// Current state
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Append one spectrum
    pub fn consume_spectrum(&mut self, record: &SpectrumRecord) -> Result<(), CacheError> {
        self.check_open()?;
        match self.state {
            WriterState::NotStarted => self.start()?,
            WriterState::WritingChromatograms => {
                return Err(CacheError::IllegalState(
                    "cannot write a spectrum after chromatograms have been written".to_string(),
                ))
            }
            _ => {}
        }
        if self.spectra_offsets.len() as u64 >= self.expected_spectra {
            return Err(CacheError::IllegalState(format!(
                "header declares {} spectra; refusing spectrum '{}'",
                self.expected_spectra, record.native_id
            )));
        }
        record.validate()?;

        let offset = self.position;
        let bytes = codec::encode_spectrum(
            record.ms_level,
            record.retention_time,
            &record.mz,
            &record.intensity,
        );
        self.write_bytes(&bytes)?;

        self.spectra_offsets.push(offset);
        self.spectra_meta.push(record.meta());
        self.data_points_written += record.peak_count() as u64;
        Ok(())
    }

    /// Append one chromatogram, closing the spectrum section on first use
    pub fn consume_chromatogram(&mut self, record: &ChromatogramRecord) -> Result<(), CacheError> {
        self.check_open()?;
        if self.state == WriterState::NotStarted {
            self.start()?;
        }
        if self.state == WriterState::WritingSpectra {
            self.close_spectra_section()?;
        }
        if self.chrom_offsets.len() as u64 >= self.expected_chromatograms {
            return Err(CacheError::IllegalState(format!(
                "header declares {} chromatograms; refusing chromatogram '{}'",
                self.expected_chromatograms, record.native_id
            )));
        }
        record.validate()?;

        let offset = self.position;
        let bytes = codec::encode_chromatogram(&record.rt, &record.intensity);
        self.write_bytes(&bytes)?;

        self.chrom_offsets.push(offset);
        self.chrom_meta.push(record.meta());
        self.data_points_written += record.data_point_count() as u64;
        Ok(())
    }

    /// Light metadata collected so far
    pub fn companion_metadata(&self) -> Result<MetadataStore, CacheError> {
        Ok(MetadataStore::new(
            self.run.clone(),
            self.spectra_meta.clone(),
            self.chrom_meta.clone(),
        )?)
    }

    /// Finalize: footer, flush and companion metadata
    ///
    /// The footer is written even when fewer records than declared arrived,
    /// but the call then fails and readers will reject the file.
    pub fn finish(&mut self) -> Result<CacheWriterStats, CacheError> {
        self.check_open()?;
        if self.state == WriterState::NotStarted {
            self.start()?;
        }
        self.state = WriterState::Closed;

        if self.config.write_footer {
            let footer_start = self.position;
            let sink = self.sink.as_mut().ok_or_else(|| {
                CacheError::IllegalState("writer sink already released".to_string())
            })?;
            let written = footer::write_footer(
                sink,
                footer_start,
                &self.spectra_offsets,
                &self.chrom_offsets,
            )?;
            self.position += written;
            debug!("Footer written at byte {} ({} bytes)", footer_start, written);
        }
        self.sink_mut()?.flush()?;

        if let Some(path) = self.companion_path.take() {
            let store = MetadataStore::new(
                self.run.clone(),
                std::mem::take(&mut self.spectra_meta),
                std::mem::take(&mut self.chrom_meta),
            )?;
            store.save(&path)?;
            debug!("Companion metadata written to {}", path.display());
        }

        let stats = CacheWriterStats {
            spectra_written: self.spectra_offsets.len(),
            chromatograms_written: self.chrom_offsets.len(),
            data_points_written: self.data_points_written,
            bytes_written: self.position,
        };
        info!("{}", stats);

        if stats.spectra_written as u64 != self.expected_spectra
            || stats.chromatograms_written as u64 != self.expected_chromatograms
        {
            return Err(CacheError::IllegalState(format!(
                "closed after {} spectra and {} chromatograms but {} and {} were declared",
                stats.spectra_written,
                stats.chromatograms_written,
                self.expected_spectra,
                self.expected_chromatograms
            )));
        }
        Ok(stats)
    }

    /// Finalize and consume the writer
    pub fn close(mut self) -> Result<CacheWriterStats, CacheError> {
        self.finish()
    }

    /// Finalize and return the sink (for in-memory buffers)
    pub fn into_inner(mut self) -> Result<(W, CacheWriterStats), CacheError> {
        let stats = self.finish()?;
        let sink = self.sink.take().ok_or_else(|| {
            CacheError::IllegalState("writer sink already released".to_string())
        })?;
        Ok((sink, stats))
    }

    fn check_open(&self) -> Result<(), CacheError> {
        if self.state == WriterState::Closed {
            return Err(CacheError::IllegalState("writer is already closed".to_string()));
        }
        if self.failed {
            return Err(CacheError::IllegalState(
                "an earlier write failed; the cache file is incomplete".to_string(),
            ));
        }
        if self.state == WriterState::WritingHeader {
            return Err(CacheError::IllegalState(
                "header was never completed".to_string(),
            ));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), CacheError> {
        self.state = WriterState::WritingHeader;
        let header = FileHeader::new(
            self.expected_spectra,
            self.expected_chromatograms,
            self.config.write_footer,
        );
        let result = header.write_to(self.sink_mut()?);
        if let Err(e) = result {
            self.failed = true;
            return Err(e.into());
        }
        self.position = HEADER_LEN;
        self.state = WriterState::WritingSpectra;
        debug!(
            "Cache header written ({} spectra, {} chromatograms declared)",
            self.expected_spectra, self.expected_chromatograms
        );
        Ok(())
    }

    fn close_spectra_section(&mut self) -> Result<(), CacheError> {
        let written = self.spectra_offsets.len() as u64;
        if written != self.expected_spectra {
            return Err(CacheError::IllegalState(format!(
                "spectrum section would close with {} of {} declared spectra",
                written, self.expected_spectra
            )));
        }
        self.state = WriterState::WritingChromatograms;
        debug!("Spectrum section closed at byte {}", self.position);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CacheError> {
        let result = self.sink_mut()?.write_all(bytes);
        match result {
            Ok(()) => {
                self.position += bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.failed = true;
                Err(e.into())
            }
        }
    }

    fn sink_mut(&mut self) -> Result<&mut W, CacheError> {
        self.sink
            .as_mut()
            .ok_or_else(|| CacheError::IllegalState("writer sink already released".to_string()))
    }
}

impl<W: Write> Drop for CacheWriter<W> {
    fn drop(&mut self) {
        if self.state == WriterState::Closed || self.sink.is_none() {
            return;
        }
        if self.failed {
            warn!("CacheWriter dropped after a failed write; the cache file has no footer");
            return;
        }
        warn!("CacheWriter dropped without calling close(); finalizing now");
        if let Err(e) = self.finish() {
            error!("Finalizing cache on drop failed: {}", e);
        }
    }
}
