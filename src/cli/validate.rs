use anyhow::Result;
use log::info;
use std::path::PathBuf;

use mzcache::validator::{validate_cache_file, ValidationOptions};

/// Validate cache file integrity
pub fn run(file: PathBuf, full_scan: bool, decode_records: bool) -> Result<()> {
    info!("mzcache Validator");
    info!("=================");
    info!("File: {}", file.display());

    let options = ValidationOptions {
        cross_check_full_scan: full_scan,
        decode_records,
    };

    match validate_cache_file(&file, &options) {
        Ok(report) => {
            println!("{}", report.format_colored());

            if report.has_failures() {
                std::process::exit(1);
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Validation error: {}", e);
            std::process::exit(1);
        }
    }
}
