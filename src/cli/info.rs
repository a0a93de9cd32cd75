use anyhow::{Context, Result};
use std::path::PathBuf;

use mzcache::cache::{RandomAccessCacheReader, ReaderConfig};
use mzcache::metadata::MetadataStore;

/// Display information about a cache file
pub fn run(file: PathBuf, config: ReaderConfig) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let reader = RandomAccessCacheReader::open_with_config(&file, config)
        .with_context(|| format!("Failed to open cache file {}", file.display()))?;
    let header = reader.header();

    println!("mzcache File Information");
    println!("========================");
    println!("File: {}", file.display());
    println!();

    println!("File Statistics:");
    println!("  Format version: {}", header.version);
    println!(
        "  File size: {} bytes ({:.2} MB)",
        reader.file_len(),
        reader.file_len() as f64 / 1024.0 / 1024.0
    );
    println!("  Offset footer: {}", if header.has_footer() { "yes" } else { "no" });
    println!("  Index built from: {}", reader.index_source());
    println!("  Spectra: {}", reader.nr_spectra());
    println!("  Chromatograms: {}", reader.nr_chromatograms());
    println!();

    let companion = MetadataStore::companion_path(&file);
    let Some(store) = reader.metadata() else {
        println!("No metadata available ({} not found)", companion.display());
        return Ok(());
    };

    if companion.exists() {
        println!("Run ({}):", companion.display());
    } else {
        println!("Run (derived from record headers):");
    }
    let run = store.run();
    println!("  Run id: {}", run.run_id);
    if let Some(source) = &run.source_file {
        println!("  Source file: {}", source);
    }
    println!("  Created: {}", run.created.to_rfc3339());
    for (key, value) in &run.parameters {
        println!("  {}: {}", key, value);
    }
    println!();

    println!("Spectra:");
    if let Some((first, last)) = store.rt_range() {
        println!("  RT range: {:.2} - {:.2} s", first, last);
    }
    for (level, count) in store.ms_level_counts() {
        println!("  MS{}: {}", level, count);
    }

    if store.nr_chromatograms() > 0 {
        println!();
        println!("Chromatograms:");
        for (id, chromatogram) in store.chromatograms().iter().enumerate() {
            let name = if chromatogram.native_id.is_empty() {
                "<unnamed>"
            } else {
                chromatogram.native_id.as_str()
            };
            match (chromatogram.precursor_mz, chromatogram.product_mz) {
                (Some(q1), Some(q3)) => println!("  {:3}. {} ({:.4} -> {:.4})", id, name, q1, q3),
                _ => println!("  {:3}. {}", id, name),
            }
        }
    }

    Ok(())
}
