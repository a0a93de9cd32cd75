//! # Companion Metadata
//!
//! The binary cache only carries numeric payload. Native identifiers, MS
//! levels, retention times and the run description live in a companion JSON
//! file next to the cache (`<cache>.meta.json`). It is loaded once, kept fully
//! in memory and answers every metadata query without touching the payload.
//!
//! ```json
//! {
//!   "format_version": "1.0",
//!   "run": { "run_id": "…", "source_file": "run01.mzML", "created": "…", "parameters": {} },
//!   "spectra": [ { "native_id": "scan=1", "ms_level": 1, "retention_time": 0.5 } ],
//!   "chromatograms": [ { "native_id": "TIC" } ]
//! }
//! ```

mod error;
mod store;

pub use error::MetadataError;
pub use store::MetadataStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version written into companion files
pub const COMPANION_FORMAT_VERSION: &str = "1.0";

/// File name suffix appended to the cache path
pub const COMPANION_SUFFIX: &str = ".meta.json";

/// Light per-spectrum entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumMeta {
    /// Native identifier from the source file
    #[serde(default)]
    pub native_id: String,
    /// MS level
    pub ms_level: i32,
    /// Retention time in seconds
    pub retention_time: f64,
}

/// Light per-chromatogram entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramMeta {
    /// Native identifier from the source file
    #[serde(default)]
    pub native_id: String,
    /// Precursor m/z of an SRM/MRM transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_mz: Option<f64>,
    /// Product m/z of an SRM/MRM transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_mz: Option<f64>,
}

/// Description of the acquisition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Unique run identifier
    pub run_id: String,
    /// File the run was converted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// Free-form run parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl RunInfo {
    /// New run with a random identifier
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            source_file: None,
            created: Utc::now(),
            parameters: BTreeMap::new(),
        }
    }

    /// Set the source file
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Add a run parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl Default for RunInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk layout of the companion file
#[derive(Debug, Serialize, Deserialize)]
struct CompanionDocument {
    format_version: String,
    run: RunInfo,
    #[serde(default)]
    spectra: Vec<SpectrumMeta>,
    #[serde(default)]
    chromatograms: Vec<ChromatogramMeta>,
}
