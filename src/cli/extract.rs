use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use mzcache::access::{self, ReadMode, SpectrumAccess};
use mzcache::cache::ReaderConfig;

use super::Selection;

/// Print the selected records as a JSON array
pub fn run(
    file: PathBuf,
    selection: Selection,
    delta: f64,
    read_mode: ReadMode,
    config: ReaderConfig,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut access = access::open(&file, read_mode, config)
        .with_context(|| format!("Failed to open cache file {}", file.display()))?;
    debug!("Opened {} in {:?} mode", file.display(), read_mode);

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let count = if let Some(id) = selection.chromatogram {
        let chromatogram = access
            .get_chromatogram_by_id(id)
            .with_context(|| format!("Failed to read chromatogram {}", id))?;
        write_json(sink, &[chromatogram])?;
        1
    } else {
        let ids = select_spectra(access.as_ref(), &selection, delta)?;
        let spectra = ids
            .iter()
            .map(|&id| {
                access
                    .get_spectrum_by_id(id)
                    .with_context(|| format!("Failed to read spectrum {}", id))
            })
            .collect::<Result<Vec<_>>>()?;
        write_json(sink, &spectra)?;
        spectra.len()
    };

    info!("Extracted {} record(s) from {}", count, file.display());
    Ok(())
}

fn select_spectra(
    access: &dyn SpectrumAccess,
    selection: &Selection,
    delta: f64,
) -> Result<Vec<usize>> {
    if let Some(id) = selection.id {
        return Ok(vec![id]);
    }
    if let Some(native_id) = &selection.native_id {
        let id = access
            .find_spectrum_by_native_id(native_id)
            .with_context(|| format!("No spectrum with native id '{}'", native_id))?;
        return Ok(vec![id]);
    }
    if let Some(rt) = selection.rt {
        return access
            .get_spectra_by_rt(rt, delta)
            .context("Invalid retention time window");
    }
    anyhow::bail!("No spectrum selected")
}

fn write_json<T: serde::Serialize>(mut sink: Box<dyn Write>, records: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, records).context("Failed to serialize records")?;
    writeln!(sink)?;
    sink.flush()?;
    Ok(())
}
