use std::io::{Read, Seek};
use std::sync::Arc;

use super::SpectrumAccess;
use crate::cache::{CacheError, RandomAccessCacheReader};
use crate::metadata::{MetadataStore, RunInfo};
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Backend holding every record in memory
///
/// Clones are cheap; all state sits behind `Arc`.
#[derive(Debug, Clone)]
pub struct InMemoryAccess {
    spectra: Arc<Vec<SpectrumRecord>>,
    chromatograms: Arc<Vec<ChromatogramRecord>>,
    metadata: Arc<MetadataStore>,
}

impl InMemoryAccess {
    /// Wrap fully materialized records
    pub fn new(
        run: RunInfo,
        spectra: Vec<SpectrumRecord>,
        chromatograms: Vec<ChromatogramRecord>,
    ) -> Result<Self, CacheError> {
        let metadata = MetadataStore::from_records(run, &spectra, &chromatograms)?;
        Ok(Self {
            spectra: Arc::new(spectra),
            chromatograms: Arc::new(chromatograms),
            metadata: Arc::new(metadata),
        })
    }

    /// Read every record of a cache once
    pub fn load<R: Read + Seek>(
        reader: &mut RandomAccessCacheReader<R>,
    ) -> Result<Self, CacheError> {
        let spectra = (0..reader.nr_spectra())
            .map(|id| reader.get_spectrum_by_id(id))
            .collect::<Result<Vec<_>, _>>()?;
        let chromatograms = (0..reader.nr_chromatograms())
            .map(|id| reader.get_chromatogram_by_id(id))
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = match reader.metadata() {
            Some(store) => Arc::clone(store),
            None => Arc::new(MetadataStore::from_records(
                RunInfo::new(),
                &spectra,
                &chromatograms,
            )?),
        };
        Ok(Self {
            spectra: Arc::new(spectra),
            chromatograms: Arc::new(chromatograms),
            metadata,
        })
    }
}

impl SpectrumAccess for InMemoryAccess {
    fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn get_spectrum_by_id(&mut self, id: usize) -> Result<SpectrumRecord, CacheError> {
        self.spectra
            .get(id)
            .cloned()
            .ok_or(CacheError::IndexOutOfRange {
                id,
                len: self.spectra.len(),
            })
    }

    fn get_chromatogram_by_id(&mut self, id: usize) -> Result<ChromatogramRecord, CacheError> {
        self.chromatograms
            .get(id)
            .cloned()
            .ok_or(CacheError::IndexOutOfRange {
                id,
                len: self.chromatograms.len(),
            })
    }

    fn light_clone(&self) -> Result<Box<dyn SpectrumAccess>, CacheError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> InMemoryAccess {
        let spectra = [1.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &rt)| {
                SpectrumRecord::new(format!("scan={}", i + 1), 1, rt, vec![500.0], vec![1.0])
                    .unwrap()
            })
            .collect();
        let chromatograms =
            vec![ChromatogramRecord::new("TIC", vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 1.0]).unwrap()];
        InMemoryAccess::new(RunInfo::new(), spectra, chromatograms).unwrap()
    }

    #[test]
    fn test_rt_queries() {
        let access = access();
        assert_eq!(access.get_spectra_by_rt(2.0, 0.5).unwrap(), vec![1]);
        assert_eq!(access.get_spectra_by_rt(2.0, 1.5).unwrap(), vec![0, 1, 2]);
        assert!(matches!(
            access.get_spectra_by_rt(2.0, -1.0),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_point_reads() {
        let mut access = access();
        assert_eq!(access.get_spectrum_by_id(2).unwrap().retention_time, 3.0);
        assert_eq!(access.get_spectrum_native_id(0).unwrap(), "scan=1");
        let len = access.get_nr_spectra();
        assert!(matches!(
            access.get_spectrum_by_id(len),
            Err(CacheError::IndexOutOfRange { id: 3, len: 3 })
        ));
        assert_eq!(access.get_chromatogram_by_id(0).unwrap().native_id, "TIC");
    }

    #[test]
    fn test_light_clone_shares_records() {
        let access = access();
        let mut clone = access.light_clone().unwrap();
        assert_eq!(clone.get_nr_spectra(), 3);
        assert_eq!(clone.get_spectrum_by_id(1).unwrap().native_id, "scan=2");
    }

    #[test]
    fn test_rejects_inconsistent_records() {
        let spectra = vec![SpectrumRecord {
            native_id: "bad".to_string(),
            ms_level: 1,
            retention_time: f64::NAN,
            mz: vec![],
            intensity: vec![],
        }];
        assert!(InMemoryAccess::new(RunInfo::new(), spectra, Vec::new()).is_err());
    }
}
