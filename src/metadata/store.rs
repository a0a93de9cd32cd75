use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{
    ChromatogramMeta, CompanionDocument, MetadataError, RunInfo, SpectrumMeta,
    COMPANION_FORMAT_VERSION, COMPANION_SUFFIX,
};
use crate::cache::CacheError;
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// In-memory store of light per-record metadata
///
/// Immutable once built. Backends share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    run: RunInfo,
    spectra: Vec<SpectrumMeta>,
    chromatograms: Vec<ChromatogramMeta>,
    /// Spectrum ids sorted by (retention time, id)
    rt_order: Vec<usize>,
    spectrum_ids: HashMap<String, usize>,
    chromatogram_ids: HashMap<String, usize>,
}

impl MetadataStore {
    /// Build a store and its lookup tables
    pub fn new(
        run: RunInfo,
        spectra: Vec<SpectrumMeta>,
        chromatograms: Vec<ChromatogramMeta>,
    ) -> Result<Self, MetadataError> {
        if let Some(id) = spectra.iter().position(|s| !s.retention_time.is_finite()) {
            return Err(MetadataError::InvalidFormat(format!(
                "spectrum {} has non-finite retention time",
                id
            )));
        }

        let mut rt_order: Vec<usize> = (0..spectra.len()).collect();
        rt_order.sort_by(|&a, &b| {
            spectra[a]
                .retention_time
                .total_cmp(&spectra[b].retention_time)
                .then(a.cmp(&b))
        });

        let spectrum_ids = native_id_map("spectrum", spectra.iter().map(|s| s.native_id.as_str()));
        let chromatogram_ids = native_id_map(
            "chromatogram",
            chromatograms.iter().map(|c| c.native_id.as_str()),
        );

        Ok(Self {
            run,
            spectra,
            chromatograms,
            rt_order,
            spectrum_ids,
            chromatogram_ids,
        })
    }

    /// Store describing fully materialized records
    pub fn from_records(
        run: RunInfo,
        spectra: &[SpectrumRecord],
        chromatograms: &[ChromatogramRecord],
    ) -> Result<Self, MetadataError> {
        Self::new(
            run,
            spectra.iter().map(SpectrumRecord::meta).collect(),
            chromatograms.iter().map(ChromatogramRecord::meta).collect(),
        )
    }

    /// Conventional companion path for a cache file
    pub fn companion_path(cache_path: &Path) -> PathBuf {
        let mut name = cache_path.as_os_str().to_os_string();
        name.push(COMPANION_SUFFIX);
        PathBuf::from(name)
    }

    /// Load a companion file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let document: CompanionDocument = serde_json::from_reader(reader)?;

        let major = document.format_version.split('.').next().unwrap_or_default();
        let expected_major = COMPANION_FORMAT_VERSION
            .split('.')
            .next()
            .unwrap_or_default();
        if major != expected_major {
            return Err(MetadataError::InvalidFormat(format!(
                "unsupported companion format version {}",
                document.format_version
            )));
        }

        debug!(
            "Loaded companion metadata {} ({} spectra, {} chromatograms)",
            path.display(),
            document.spectra.len(),
            document.chromatograms.len()
        );
        Self::new(document.run, document.spectra, document.chromatograms)
    }

    /// Save as a companion file
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers never observe a half-written companion.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MetadataError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let document = CompanionDocument {
            format_version: COMPANION_FORMAT_VERSION.to_string(),
            run: self.run.clone(),
            spectra: self.spectra.clone(),
            chromatograms: self.chromatograms.clone(),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &document)?;
            writer.flush()?;
        }
        temp.persist(path).map_err(|e| MetadataError::IoError(e.error))?;
        Ok(())
    }

    /// Run description
    pub fn run(&self) -> &RunInfo {
        &self.run
    }

    /// All spectrum entries in id order
    pub fn spectra(&self) -> &[SpectrumMeta] {
        &self.spectra
    }

    /// All chromatogram entries in id order
    pub fn chromatograms(&self) -> &[ChromatogramMeta] {
        &self.chromatograms
    }

    /// Number of spectra
    pub fn nr_spectra(&self) -> usize {
        self.spectra.len()
    }

    /// Number of chromatograms
    pub fn nr_chromatograms(&self) -> usize {
        self.chromatograms.len()
    }

    /// Entry for spectrum `id`
    pub fn spectrum(&self, id: usize) -> Result<&SpectrumMeta, CacheError> {
        self.spectra.get(id).ok_or(CacheError::IndexOutOfRange {
            id,
            len: self.spectra.len(),
        })
    }

    /// Entry for chromatogram `id`
    pub fn chromatogram(&self, id: usize) -> Result<&ChromatogramMeta, CacheError> {
        self.chromatograms
            .get(id)
            .ok_or(CacheError::IndexOutOfRange {
                id,
                len: self.chromatograms.len(),
            })
    }

    /// Spectrum id for a native identifier
    pub fn find_spectrum(&self, native_id: &str) -> Option<usize> {
        self.spectrum_ids.get(native_id).copied()
    }

    /// Chromatogram id for a native identifier
    pub fn find_chromatogram(&self, native_id: &str) -> Option<usize> {
        self.chromatogram_ids.get(native_id).copied()
    }

    /// Ids of all spectra with retention time in `[rt - delta_rt, rt + delta_rt]`,
    /// in increasing RT order
    pub fn spectra_by_rt(&self, rt: f64, delta_rt: f64) -> Result<Vec<usize>, CacheError> {
        if rt.is_nan() {
            return Err(CacheError::InvalidArgument(
                "retention time must not be NaN".to_string(),
            ));
        }
        if !(delta_rt >= 0.0) {
            return Err(CacheError::InvalidArgument(format!(
                "RT window half-width must be non-negative, got {}",
                delta_rt
            )));
        }
        let low = rt - delta_rt;
        let high = rt + delta_rt;

        let start = self
            .rt_order
            .partition_point(|&id| self.spectra[id].retention_time < low);
        Ok(self.rt_order[start..]
            .iter()
            .copied()
            .take_while(|&id| self.spectra[id].retention_time <= high)
            .collect())
    }

    /// Smallest and largest spectrum retention time
    pub fn rt_range(&self) -> Option<(f64, f64)> {
        let first = *self.rt_order.first()?;
        let last = *self.rt_order.last()?;
        Some((
            self.spectra[first].retention_time,
            self.spectra[last].retention_time,
        ))
    }

    /// Number of spectra per MS level, ascending by level
    pub fn ms_level_counts(&self) -> Vec<(i32, usize)> {
        let mut counts: Vec<(i32, usize)> = Vec::new();
        for spectrum in &self.spectra {
            match counts.binary_search_by_key(&spectrum.ms_level, |&(level, _)| level) {
                Ok(pos) => counts[pos].1 += 1,
                Err(pos) => counts.insert(pos, (spectrum.ms_level, 1)),
            }
        }
        counts
    }
}

fn native_id_map<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (index, native_id) in ids.enumerate() {
        if native_id.is_empty() {
            continue;
        }
        if map.contains_key(native_id) {
            warn!("Duplicate {} native id '{}'; keeping first occurrence", kind, native_id);
            continue;
        }
        map.insert(native_id.to_string(), index);
    }
    map
}
