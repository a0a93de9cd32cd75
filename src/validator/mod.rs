//! # Cache Validation
//!
//! Deep integrity check of a cache file and its companion metadata.
//!
//! 1. **Header**: magic, format version, flags and declared counts
//! 2. **Offset index**: built the way a reader would build it
//! 3. **Index agreement**: footer index against a full scan (optional)
//! 4. **Records**: every record decodes and satisfies the record invariants
//! 5. **Companion metadata**: loads, and agrees with the record headers
//!
//! ```rust,no_run
//! use mzcache::validator::{validate_cache_file, ValidationOptions};
//! use std::path::Path;
//!
//! let report = validate_cache_file(Path::new("run.mzcache"), &ValidationOptions::default())?;
//! println!("{}", report);
//! # Ok::<(), mzcache::cache::CacheError>(())
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;

pub use report::{CheckStatus, ValidationCheck, ValidationReport};

mod report;

use crate::cache::{
    build_index, CacheError, FileHeader, IndexMode, RandomAccessCacheReader, ReaderConfig,
};
use crate::metadata::MetadataStore;

/// Maximum number of per-record problems spelled out in a check message
const MAX_REPORTED_RECORDS: usize = 5;

/// Which of the optional checks to run
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Rebuild the index by full scan and compare it with the footer
    pub cross_check_full_scan: bool,
    /// Decode every record
    pub decode_records: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            cross_check_full_scan: false,
            decode_records: true,
        }
    }
}

type CacheFileReader = RandomAccessCacheReader<BufReader<File>>;

/// Validate a cache file
///
/// Problems with the file end up in the report. Only errors that prevent
/// validating at all are returned as `Err`.
pub fn validate_cache_file(
    path: &Path,
    options: &ValidationOptions,
) -> Result<ValidationReport, CacheError> {
    let mut report = ValidationReport::new(path.display().to_string());

    if !path.is_file() {
        report.add_check(ValidationCheck::failed(
            "File exists",
            format!("{} is not a file", path.display()),
        ));
        return Ok(report);
    }
    report.add_check(ValidationCheck::ok("File exists"));

    let Some(header) = check_header(path, &mut report)? else {
        return Ok(report);
    };
    let Some(mut reader) = check_index(path, &header, &mut report)? else {
        return Ok(report);
    };

    if options.cross_check_full_scan {
        check_index_agreement(path, &reader, &mut report)?;
    }
    if options.decode_records {
        check_records(&mut reader, &mut report);
    }
    check_companion(path, &mut reader, &mut report);

    debug!(
        "Validated {}: {} passed, {} warnings, {} failed",
        path.display(),
        report.success_count(),
        report.warning_count(),
        report.failure_count()
    );
    Ok(report)
}

fn check_header(
    path: &Path,
    report: &mut ValidationReport,
) -> Result<Option<FileHeader>, CacheError> {
    let mut file = BufReader::new(File::open(path)?);
    match FileHeader::read_from(&mut file) {
        Ok(header) => {
            report.add_check(ValidationCheck::ok(format!(
                "Header (version {}, {} spectra, {} chromatograms declared)",
                header.version, header.spectrum_count, header.chromatogram_count
            )));
            if header.has_footer() {
                report.add_check(ValidationCheck::ok("Offset footer declared"));
            } else {
                report.add_check(ValidationCheck::warning(
                    "Offset footer declared",
                    "no footer; every open requires a full scan",
                ));
            }
            Ok(Some(header))
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed("Header", e.to_string()));
            Ok(None)
        }
    }
}

fn check_index(
    path: &Path,
    header: &FileHeader,
    report: &mut ValidationReport,
) -> Result<Option<CacheFileReader>, CacheError> {
    let config = ReaderConfig {
        index_mode: IndexMode::Auto,
        ..Default::default()
    };
    let file = BufReader::with_capacity(config.buffer_size, File::open(path)?);
    match RandomAccessCacheReader::from_reader(file, config) {
        Ok(reader) => {
            report.add_check(ValidationCheck::ok(format!(
                "Offset index from {} ({} spectra, {} chromatograms)",
                reader.index_source(),
                reader.nr_spectra(),
                reader.nr_chromatograms()
            )));
            Ok(Some(reader))
        }
        Err(e) => {
            let name = if header.has_footer() {
                "Offset index from footer"
            } else {
                "Offset index from full scan"
            };
            report.add_check(ValidationCheck::failed(name, e.to_string()));
            Ok(None)
        }
    }
}

fn check_index_agreement(
    path: &Path,
    reader: &CacheFileReader,
    report: &mut ValidationReport,
) -> Result<(), CacheError> {
    const NAME: &str = "Footer index matches full scan";
    if !reader.header().has_footer() {
        return Ok(());
    }
    let mut file = BufReader::new(File::open(path)?);
    match build_index(&mut file, IndexMode::FullScan) {
        Ok(scanned) if scanned == **reader.index() => {
            report.add_check(ValidationCheck::ok(NAME));
        }
        Ok(scanned) => {
            let first_diff = reader
                .index()
                .spectra_offsets()
                .iter()
                .zip(scanned.spectra_offsets())
                .position(|(a, b)| a != b);
            let message = match first_diff {
                Some(id) => format!("spectrum {} offset differs", id),
                None => "chromatogram offsets differ".to_string(),
            };
            report.add_check(ValidationCheck::failed(NAME, message));
        }
        Err(e) => report.add_check(ValidationCheck::failed(NAME, e.to_string())),
    }
    Ok(())
}

fn check_records(reader: &mut CacheFileReader, report: &mut ValidationReport) {
    let mut decode_errors = Vec::new();
    let mut invalid = Vec::new();

    for id in 0..reader.nr_spectra() {
        match reader.get_spectrum_by_id(id) {
            Ok(record) => {
                if let Err(e) = record.validate() {
                    invalid.push(format!("spectrum {}: {}", id, e));
                }
            }
            Err(e) => decode_errors.push(format!("spectrum {}: {}", id, e)),
        }
    }
    for id in 0..reader.nr_chromatograms() {
        match reader.get_chromatogram_by_id(id) {
            Ok(record) => {
                if let Err(e) = record.validate() {
                    invalid.push(format!("chromatogram {}: {}", id, e));
                }
            }
            Err(e) => decode_errors.push(format!("chromatogram {}: {}", id, e)),
        }
    }

    let total = reader.nr_spectra() + reader.nr_chromatograms();
    if decode_errors.is_empty() {
        report.add_check(ValidationCheck::ok(format!("All {} records decode", total)));
    } else {
        report.add_check(ValidationCheck::failed(
            "All records decode",
            summarize(&decode_errors),
        ));
    }
    if invalid.is_empty() {
        report.add_check(ValidationCheck::ok("Record invariants"));
    } else {
        report.add_check(ValidationCheck::warning("Record invariants", summarize(&invalid)));
    }
}

fn check_companion(path: &Path, reader: &mut CacheFileReader, report: &mut ValidationReport) {
    const NAME: &str = "Companion metadata";
    let companion = MetadataStore::companion_path(path);
    if !companion.exists() {
        report.add_check(ValidationCheck::warning(
            NAME,
            format!("{} not found; native ids unavailable", companion.display()),
        ));
        return;
    }

    let store = match MetadataStore::load(&companion) {
        Ok(store) => store,
        Err(e) => {
            report.add_check(ValidationCheck::failed(NAME, e.to_string()));
            return;
        }
    };
    if store.nr_spectra() != reader.nr_spectra()
        || store.nr_chromatograms() != reader.nr_chromatograms()
    {
        report.add_check(ValidationCheck::failed(
            NAME,
            format!(
                "describes {} spectra and {} chromatograms but the cache holds {} and {}",
                store.nr_spectra(),
                store.nr_chromatograms(),
                reader.nr_spectra(),
                reader.nr_chromatograms()
            ),
        ));
        return;
    }
    report.add_check(ValidationCheck::ok(NAME));

    let mut mismatches = Vec::new();
    for (id, meta) in store.spectra().iter().enumerate() {
        match reader.read_spectrum_header(id) {
            Ok(header) => {
                if header.ms_level != meta.ms_level
                    || header.retention_time.to_bits() != meta.retention_time.to_bits()
                {
                    mismatches.push(format!(
                        "spectrum {} ('{}'): cache has MS{} at {} s, metadata MS{} at {} s",
                        id,
                        meta.native_id,
                        header.ms_level,
                        header.retention_time,
                        meta.ms_level,
                        meta.retention_time
                    ));
                }
            }
            Err(e) => mismatches.push(format!("spectrum {}: {}", id, e)),
        }
    }
    if mismatches.is_empty() {
        report.add_check(ValidationCheck::ok("Metadata agrees with record headers"));
    } else {
        report.add_check(ValidationCheck::failed(
            "Metadata agrees with record headers",
            summarize(&mismatches),
        ));
    }
}

fn summarize(problems: &[String]) -> String {
    let mut message = problems
        .iter()
        .take(MAX_REPORTED_RECORDS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if problems.len() > MAX_REPORTED_RECORDS {
        message.push_str(&format!(
            " (and {} more)",
            problems.len() - MAX_REPORTED_RECORDS
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheWriter, WriterConfig};
    use crate::record::{ChromatogramRecord, SpectrumRecord};
    use tempfile::tempdir;

    fn write_valid(path: &Path) {
        let mut writer = CacheWriter::create(path, 2, 1, WriterConfig::default()).unwrap();
        writer
            .consume_spectrum(&SpectrumRecord::new("scan=1", 1, 1.5, vec![100.0], vec![5.0]).unwrap())
            .unwrap();
        writer
            .consume_spectrum(&SpectrumRecord::new("scan=2", 2, 2.5, vec![], vec![]).unwrap())
            .unwrap();
        writer
            .consume_chromatogram(&ChromatogramRecord::new("TIC", vec![1.5, 2.5], vec![5.0, 0.0]).unwrap())
            .unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_valid_file_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.mzcache");
        write_valid(&path);

        let options = ValidationOptions {
            cross_check_full_scan: true,
            ..Default::default()
        };
        let report = validate_cache_file(&path, &options).unwrap();
        assert!(!report.has_failures(), "{}", report);
        assert!(!report.has_warnings(), "{}", report);
    }

    #[test]
    fn test_truncated_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cut.mzcache");
        write_valid(&path);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let report = validate_cache_file(&path, &ValidationOptions::default()).unwrap();
        assert!(report.has_failures());
        assert!(report
            .checks
            .iter()
            .any(|c| c.name.starts_with("Offset index") && c.status != CheckStatus::Ok));
    }

    #[test]
    fn test_corrupt_record_count_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("count.mzcache");
        write_valid(&path);
        let mut bytes = std::fs::read(&path).unwrap();
        // first spectrum holds one peak; claim two
        bytes[44..52].copy_from_slice(&2u64.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let report = validate_cache_file(&path, &ValidationOptions::default()).unwrap();
        assert!(report.has_failures(), "{}", report);
        assert!(report
            .checks
            .iter()
            .any(|c| c.name == "All records decode" && c.status != CheckStatus::Ok));
    }

    #[test]
    fn test_missing_companion_warns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.mzcache");
        write_valid(&path);
        std::fs::remove_file(MetadataStore::companion_path(&path)).unwrap();

        let report = validate_cache_file(&path, &ValidationOptions::default()).unwrap();
        assert!(!report.has_failures(), "{}", report);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let report =
            validate_cache_file(Path::new("/nonexistent/x.mzcache"), &ValidationOptions::default())
                .unwrap();
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn test_summarize_caps_message() {
        let problems: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();
        let message = summarize(&problems);
        assert!(message.starts_with("p0; p1"));
        assert!(message.ends_with("(and 3 more)"));
    }
}
