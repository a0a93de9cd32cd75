//! Spectrum and chromatogram records as produced by upstream parsers and
//! returned by every access backend.
//!
//! Records are plain owned data. Returned records never alias reader buffers.

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::metadata::{ChromatogramMeta, SpectrumMeta};

/// One scan: paired m/z and intensity arrays plus MS level and retention time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    /// Native identifier from the source file (companion metadata only)
    pub native_id: String,

    /// MS level (1, 2, ...)
    pub ms_level: i32,

    /// Retention time in seconds
    pub retention_time: f64,

    /// Mass-to-charge values, ascending
    pub mz: Vec<f64>,

    /// Intensities in m/z order
    pub intensity: Vec<f64>,
}

impl SpectrumRecord {
    /// Create a validated spectrum record
    pub fn new(
        native_id: impl Into<String>,
        ms_level: i32,
        retention_time: f64,
        mz: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self, CacheError> {
        let record = Self {
            native_id: native_id.into(),
            ms_level,
            retention_time,
            mz,
            intensity,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the array-length, ordering and retention time invariants
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.mz.len() != self.intensity.len() {
            return Err(CacheError::ArrayLengthMismatch {
                axis_len: self.mz.len(),
                intensity_len: self.intensity.len(),
            });
        }
        if !self.retention_time.is_finite() {
            return Err(CacheError::InvalidRecord(format!(
                "spectrum '{}' has non-finite retention time {}",
                self.native_id, self.retention_time
            )));
        }
        check_ascending("m/z", &self.native_id, &self.mz)
    }

    /// Number of peaks
    pub fn peak_count(&self) -> usize {
        self.mz.len()
    }

    /// Sum of all intensities
    pub fn total_ion_current(&self) -> f64 {
        self.intensity.iter().sum()
    }

    /// The light metadata entry for this spectrum
    pub fn meta(&self) -> SpectrumMeta {
        SpectrumMeta {
            native_id: self.native_id.clone(),
            ms_level: self.ms_level,
            retention_time: self.retention_time,
        }
    }
}

/// One trace: paired retention time and intensity arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramRecord {
    /// Native identifier from the source file (companion metadata only)
    pub native_id: String,

    /// Precursor m/z of an SRM/MRM transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_mz: Option<f64>,

    /// Product m/z of an SRM/MRM transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_mz: Option<f64>,

    /// Retention times in seconds, ascending
    pub rt: Vec<f64>,

    /// Intensities in RT order
    pub intensity: Vec<f64>,
}

impl ChromatogramRecord {
    /// Create a validated chromatogram record
    pub fn new(
        native_id: impl Into<String>,
        rt: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self, CacheError> {
        let record = Self {
            native_id: native_id.into(),
            precursor_mz: None,
            product_mz: None,
            rt,
            intensity,
        };
        record.validate()?;
        Ok(record)
    }

    /// Attach the precursor/product pair identifying an SRM/MRM trace
    pub fn with_transition(mut self, precursor_mz: f64, product_mz: f64) -> Self {
        self.precursor_mz = Some(precursor_mz);
        self.product_mz = Some(product_mz);
        self
    }

    /// Check the array-length and ordering invariants
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.rt.len() != self.intensity.len() {
            return Err(CacheError::ArrayLengthMismatch {
                axis_len: self.rt.len(),
                intensity_len: self.intensity.len(),
            });
        }
        check_ascending("RT", &self.native_id, &self.rt)
    }

    /// Number of data points
    pub fn data_point_count(&self) -> usize {
        self.rt.len()
    }

    /// The light metadata entry for this chromatogram
    pub fn meta(&self) -> ChromatogramMeta {
        ChromatogramMeta {
            native_id: self.native_id.clone(),
            precursor_mz: self.precursor_mz,
            product_mz: self.product_mz,
        }
    }
}

fn check_ascending(axis: &str, native_id: &str, values: &[f64]) -> Result<(), CacheError> {
    // NaN compares false and is rejected here as well
    if let Some(pos) = values.windows(2).position(|w| !(w[0] <= w[1])) {
        return Err(CacheError::InvalidRecord(format!(
            "{} array of '{}' is not ascending at position {}",
            axis,
            native_id,
            pos + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_creation() {
        let spectrum =
            SpectrumRecord::new("scan=1", 1, 60.0, vec![100.0, 200.0], vec![10.0, 20.0]).unwrap();
        assert_eq!(spectrum.peak_count(), 2);
        assert_eq!(spectrum.total_ion_current(), 30.0);
        assert_eq!(spectrum.meta().native_id, "scan=1");
    }

    #[test]
    fn test_spectrum_array_mismatch() {
        let result = SpectrumRecord::new("scan=1", 1, 60.0, vec![100.0, 200.0], vec![10.0]);
        assert!(matches!(
            result,
            Err(CacheError::ArrayLengthMismatch {
                axis_len: 2,
                intensity_len: 1
            })
        ));
    }

    #[test]
    fn test_spectrum_unsorted_mz() {
        let result = SpectrumRecord::new("scan=1", 1, 60.0, vec![200.0, 100.0], vec![1.0, 2.0]);
        assert!(matches!(result, Err(CacheError::InvalidRecord(_))));
    }

    #[test]
    fn test_spectrum_nan_rt() {
        let result = SpectrumRecord::new("scan=1", 1, f64::NAN, vec![], vec![]);
        assert!(matches!(result, Err(CacheError::InvalidRecord(_))));
    }

    #[test]
    fn test_chromatogram_transition() {
        let chrom = ChromatogramRecord::new("SRM 500.3 > 600.4", vec![0.0, 1.0], vec![5.0, 6.0])
            .unwrap()
            .with_transition(500.3, 600.4);
        assert_eq!(chrom.data_point_count(), 2);
        let meta = chrom.meta();
        assert_eq!(meta.precursor_mz, Some(500.3));
        assert_eq!(meta.product_mz, Some(600.4));
    }

    #[test]
    fn test_chromatogram_array_mismatch() {
        let result = ChromatogramRecord::new("TIC", vec![0.0, 1.0, 2.0], vec![1.0, 2.0]);
        assert!(matches!(result, Err(CacheError::ArrayLengthMismatch { .. })));
    }
}
