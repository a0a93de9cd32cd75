//! Offset index construction
//!
//! The index is the table of byte positions that turns a cache file into a
//! random-access store. It is rebuilt every time a file is opened, either from
//! the footer or by a sequential scan, and is only handed out after it passed
//! validation.

use std::io::{Read, Seek, SeekFrom};
use std::time::Instant;

use log::{debug, info};
use serde::Deserialize;

use super::codec::{self, CHROMATOGRAM_HEADER_LEN, SPECTRUM_HEADER_LEN};
use super::footer::{self, TRAILER_LEN};
use super::header::{FileHeader, HEADER_LEN};
use super::CacheError;

/// How the offset index should be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexMode {
    /// Use the footer when the header announces one, scan otherwise
    #[default]
    Auto,
    /// Require a valid footer
    Footer,
    /// Always scan every record ("memdump" mode)
    FullScan,
}

/// Where a built index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Read from the trailing footer
    Footer,
    /// Reconstructed by a sequential scan
    FullScan,
}

impl std::fmt::Display for IndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexSource::Footer => write!(f, "footer"),
            IndexSource::FullScan => write!(f, "full scan"),
        }
    }
}

/// Validated byte offsets of every record in a cache file
///
/// Offsets are strictly increasing within each list, every chromatogram
/// starts after the last spectrum, and every record lies inside the record
/// region `[HEADER_LEN, records_end)`. A record spans from its own offset to
/// the next record's offset, or to `records_end` for the last one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetIndex {
    spectra_offsets: Vec<u64>,
    chrom_offsets: Vec<u64>,
    records_end: u64,
}

impl OffsetIndex {
    /// Build an index, rejecting offsets that violate ordering or fall
    /// outside the record region ending at `records_end`
    pub fn new(
        spectra_offsets: Vec<u64>,
        chrom_offsets: Vec<u64>,
        records_end: u64,
    ) -> Result<Self, CacheError> {
        check_strictly_increasing("spectrum", &spectra_offsets)?;
        check_strictly_increasing("chromatogram", &chrom_offsets)?;
        if let (Some(&last_spectrum), Some(&first_chrom)) =
            (spectra_offsets.last(), chrom_offsets.first())
        {
            if first_chrom <= last_spectrum {
                return Err(CacheError::CorruptCache(format!(
                    "first chromatogram offset {} does not follow last spectrum offset {}",
                    first_chrom, last_spectrum
                )));
            }
        }

        if let Some(&first) = spectra_offsets.first().or(chrom_offsets.first()) {
            if first < HEADER_LEN {
                return Err(CacheError::CorruptCache(format!(
                    "record offset {} points into the file header",
                    first
                )));
            }
        }

        let last = match (spectra_offsets.last(), chrom_offsets.last()) {
            (_, Some(&last)) => Some((last, CHROMATOGRAM_HEADER_LEN)),
            (Some(&last), None) => Some((last, SPECTRUM_HEADER_LEN)),
            (None, None) => None,
        };
        if let Some((last, min_len)) = last {
            if last.checked_add(min_len).map_or(true, |end| end > records_end) {
                return Err(CacheError::CorruptCache(format!(
                    "record offset {} points past the record region ending at {}",
                    last, records_end
                )));
            }
        }

        Ok(Self {
            spectra_offsets,
            chrom_offsets,
            records_end,
        })
    }

    /// Spectrum record offsets
    pub fn spectra_offsets(&self) -> &[u64] {
        &self.spectra_offsets
    }

    /// Chromatogram record offsets
    pub fn chrom_offsets(&self) -> &[u64] {
        &self.chrom_offsets
    }

    /// First byte past the last record
    pub fn records_end(&self) -> u64 {
        self.records_end
    }

    /// Number of spectrum records
    pub fn nr_spectra(&self) -> usize {
        self.spectra_offsets.len()
    }

    /// Number of chromatogram records
    pub fn nr_chromatograms(&self) -> usize {
        self.chrom_offsets.len()
    }

    /// Offset of spectrum `id`
    pub fn spectrum_offset(&self, id: usize) -> Result<u64, CacheError> {
        lookup(&self.spectra_offsets, id)
    }

    /// Offset of chromatogram `id`
    pub fn chromatogram_offset(&self, id: usize) -> Result<u64, CacheError> {
        lookup(&self.chrom_offsets, id)
    }

    /// Offset and byte length of spectrum `id`
    pub fn spectrum_span(&self, id: usize) -> Result<(u64, u64), CacheError> {
        let start = lookup(&self.spectra_offsets, id)?;
        let end = self
            .spectra_offsets
            .get(id + 1)
            .or(self.chrom_offsets.first())
            .copied()
            .unwrap_or(self.records_end);
        Ok((start, end - start))
    }

    /// Offset and byte length of chromatogram `id`
    pub fn chromatogram_span(&self, id: usize) -> Result<(u64, u64), CacheError> {
        let start = lookup(&self.chrom_offsets, id)?;
        let end = self
            .chrom_offsets
            .get(id + 1)
            .copied()
            .unwrap_or(self.records_end);
        Ok((start, end - start))
    }
}

fn lookup(offsets: &[u64], id: usize) -> Result<u64, CacheError> {
    offsets
        .get(id)
        .copied()
        .ok_or(CacheError::IndexOutOfRange {
            id,
            len: offsets.len(),
        })
}

fn check_strictly_increasing(kind: &str, offsets: &[u64]) -> Result<(), CacheError> {
    if let Some(pos) = offsets.windows(2).position(|w| w[0] >= w[1]) {
        return Err(CacheError::CorruptCache(format!(
            "{} offsets are not strictly increasing at position {} ({} >= {})",
            kind,
            pos + 1,
            offsets[pos],
            offsets[pos + 1]
        )));
    }
    Ok(())
}

/// Result of a successful index build
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    /// Header of the indexed file
    pub header: FileHeader,
    /// The validated index
    pub index: OffsetIndex,
    /// How the index was obtained
    pub source: IndexSource,
    /// Total file length in bytes
    pub file_len: u64,
}

/// Builds an [`OffsetIndex`] for a cache file
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheIndexBuilder {
    mode: IndexMode,
}

impl CacheIndexBuilder {
    /// Create a builder for the given mode
    pub fn new(mode: IndexMode) -> Self {
        Self { mode }
    }

    /// Read the header and build a validated index
    ///
    /// Any inconsistency is fatal for the whole file; there is no partial
    /// index.
    pub fn build<R: Read + Seek>(&self, reader: &mut R) -> Result<BuiltIndex, CacheError> {
        let started = Instant::now();
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read_from(reader)?;

        let source = match self.mode {
            IndexMode::Auto if header.has_footer() => IndexSource::Footer,
            IndexMode::Auto => IndexSource::FullScan,
            IndexMode::Footer if !header.has_footer() => {
                return Err(CacheError::CorruptCache(
                    "footer index requested but the header declares no footer".to_string(),
                ))
            }
            IndexMode::Footer => IndexSource::Footer,
            IndexMode::FullScan => IndexSource::FullScan,
        };
        debug!(
            "Building offset index ({}) for {} spectra, {} chromatograms",
            source, header.spectrum_count, header.chromatogram_count
        );

        let index = match source {
            IndexSource::Footer => Self::from_footer(reader, &header)?,
            IndexSource::FullScan => Self::from_scan(reader, &header, file_len)?,
        };

        if index.nr_spectra() as u64 != header.spectrum_count
            || index.nr_chromatograms() as u64 != header.chromatogram_count
        {
            return Err(CacheError::CorruptCache(format!(
                "index holds {} spectra and {} chromatograms but the header declares {} and {}",
                index.nr_spectra(),
                index.nr_chromatograms(),
                header.spectrum_count,
                header.chromatogram_count
            )));
        }

        info!(
            "Indexed {} spectra and {} chromatograms from {} in {:.2?}",
            index.nr_spectra(),
            index.nr_chromatograms(),
            source,
            started.elapsed()
        );

        Ok(BuiltIndex {
            header,
            index,
            source,
            file_len,
        })
    }

    fn from_footer<R: Read + Seek>(
        reader: &mut R,
        header: &FileHeader,
    ) -> Result<OffsetIndex, CacheError> {
        let table = footer::read_footer(reader)?;
        let index = OffsetIndex::new(table.spectra_offsets, table.chrom_offsets, table.footer_start)?;

        debug!(
            "Footer at byte {} (header declares {} + {} records)",
            table.footer_start, header.spectrum_count, header.chromatogram_count
        );
        Ok(index)
    }

    fn from_scan<R: Read + Seek>(
        reader: &mut R,
        header: &FileHeader,
        file_len: u64,
    ) -> Result<OffsetIndex, CacheError> {
        // Declared counts are untrusted; the vectors grow past this as records are found
        let max_prealloc = codec::MAX_PREALLOC / 8;
        let mut spectra_offsets =
            Vec::with_capacity(header.spectrum_count.min(max_prealloc) as usize);
        let mut chrom_offsets =
            Vec::with_capacity(header.chromatogram_count.min(max_prealloc) as usize);

        let mut position = reader.seek(SeekFrom::Start(HEADER_LEN))?;
        for _ in 0..header.spectrum_count {
            spectra_offsets.push(position);
            position += codec::skip_spectrum(reader, file_len)?;
        }
        for _ in 0..header.chromatogram_count {
            chrom_offsets.push(position);
            position += codec::skip_chromatogram(reader, file_len)?;
        }

        let trailing = file_len - position;
        if !header.has_footer() && trailing != 0 {
            return Err(CacheError::CorruptCache(format!(
                "{} unexpected bytes after the last record",
                trailing
            )));
        }
        if header.has_footer() && trailing < TRAILER_LEN {
            debug!("Scanned file declares a footer but only {} bytes follow the records", trailing);
        }

        // Zero-length records cannot exist, so a scan always yields increasing offsets;
        // OffsetIndex::new re-checks regardless.
        OffsetIndex::new(spectra_offsets, chrom_offsets, position)
    }
}

/// Build an index with the given mode
pub fn build_index<R: Read + Seek>(reader: &mut R, mode: IndexMode) -> Result<OffsetIndex, CacheError> {
    CacheIndexBuilder::new(mode).build(reader).map(|built| built.index)
}
