use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzcache::cache::{CacheWriter, WriterConfig};
use mzcache::metadata::RunInfo;
use mzcache::record::{ChromatogramRecord, SpectrumRecord};

/// Seconds between MS1 survey scans
const CYCLE_TIME_SEC: f64 = 3.0;

/// Generate a synthetic LC-MS run
pub fn run(
    output: PathBuf,
    duration_min: f64,
    ms2_per_cycle: usize,
    config: WriterConfig,
) -> Result<()> {
    if !(duration_min > 0.0) {
        anyhow::bail!("Run duration must be positive, got {} min", duration_min);
    }

    info!("mzcache Demo - synthetic LC-MS run");
    info!("==================================");

    let run_duration_sec = duration_min * 60.0;
    let spectra = generate_mock_lcms_run(run_duration_sec, ms2_per_cycle)?;
    let chromatograms = generate_chromatograms(&spectra)?;
    info!(
        "Generated {} spectra ({} peaks) and {} chromatograms",
        spectra.len(),
        spectra.iter().map(|s| s.peak_count()).sum::<usize>(),
        chromatograms.len()
    );

    let run_info = RunInfo::new()
        .with_source_file(output.display().to_string())
        .with_parameter("generator", "mzcache demo")
        .with_parameter("gradient_length_min", duration_min.to_string())
        .with_parameter("ms2_per_cycle", ms2_per_cycle.to_string());

    let mut writer = CacheWriter::create(
        &output,
        spectra.len() as u64,
        chromatograms.len() as u64,
        config,
    )
    .with_context(|| format!("Failed to create cache file {}", output.display()))?
    .with_run_info(run_info);

    for (i, spectrum) in spectra.iter().enumerate() {
        writer
            .consume_spectrum(spectrum)
            .with_context(|| format!("Failed to write spectrum {}", spectrum.native_id))?;
        if (i + 1) % 1000 == 0 {
            info!("  Written {} spectra...", i + 1);
        }
    }
    for chromatogram in &chromatograms {
        writer
            .consume_chromatogram(chromatogram)
            .with_context(|| format!("Failed to write chromatogram {}", chromatogram.native_id))?;
    }

    let stats = writer.close().context("Failed to finalize cache file")?;

    info!("Conversion complete!");
    info!("  Output file: {}", output.display());
    info!("  {}", stats);
    info!(
        "  File size: {:.2} MB",
        stats.bytes_written as f64 / 1024.0 / 1024.0
    );
    println!("{}", stats);

    Ok(())
}

/// Mock DDA run: one MS1 survey scan followed by `ms2_per_cycle` MS2 scans
/// per duty cycle
fn generate_mock_lcms_run(run_duration_sec: f64, ms2_per_cycle: usize) -> Result<Vec<SpectrumRecord>> {
    let mut spectra = Vec::new();
    let mut current_time = 0.0;

    while current_time < run_duration_sec {
        let (mz, intensity) = generate_ms1_peaks(current_time, run_duration_sec);
        spectra.push(SpectrumRecord::new(
            format!("scan={}", spectra.len() + 1),
            1,
            current_time,
            mz,
            intensity,
        )?);

        let scan_spacing = CYCLE_TIME_SEC / (ms2_per_cycle + 1) as f64;
        for (i, precursor_mz) in select_precursors(current_time, run_duration_sec, ms2_per_cycle)
            .into_iter()
            .enumerate()
        {
            let (mz, intensity) = generate_ms2_peaks(precursor_mz);
            spectra.push(SpectrumRecord::new(
                format!("scan={}", spectra.len() + 1),
                2,
                current_time + scan_spacing * (i + 1) as f64,
                mz,
                intensity,
            )?);
        }

        current_time += CYCLE_TIME_SEC;
    }

    Ok(spectra)
}

/// MS1 peaks whose abundance follows the gradient
fn generate_ms1_peaks(rt_sec: f64, total_duration: f64) -> (Vec<f64>, Vec<f64>) {
    let gradient_position = rt_sec / total_duration;
    let intensity_modifier = 1.0 - (gradient_position - 0.5).abs() * 2.0;
    let base_intensity = 1e6 * (0.5 + intensity_modifier * 0.5);

    let num_peaks = 200 + (intensity_modifier * 300.0) as usize;

    let mut peaks: Vec<(f64, f64)> = (0..num_peaks)
        .map(|i| {
            let mz = 300.0 + (i as f64 / num_peaks as f64) * 1500.0;
            let mz_noise = (i as f64 * 0.123).sin() * 0.01;
            let intensity = base_intensity * (0.1 + (i as f64 * 0.456).sin().abs() * 0.9);
            (mz + mz_noise, intensity)
        })
        .collect();

    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    peaks.into_iter().unzip()
}

/// Mock DDA precursor selection
fn select_precursors(rt_sec: f64, total_duration: f64, num_precursors: usize) -> Vec<f64> {
    let gradient_position = rt_sec / total_duration;
    (0..num_precursors)
        .map(|i| {
            let base_mz = 400.0 + (i as f64 / num_precursors as f64) * 1200.0;
            base_mz + gradient_position * 100.0 + (i as f64 * 0.789).sin() * 10.0
        })
        .collect()
}

/// Fragment ladder below the precursor plus a few reporter ions
fn generate_ms2_peaks(precursor_mz: f64) -> (Vec<f64>, Vec<f64>) {
    let num_fragments = 30 + (precursor_mz / 50.0) as usize;

    let mut peaks: Vec<(f64, f64)> = (0..num_fragments)
        .filter_map(|i| {
            let frag_mz = 100.0 + (i as f64 / num_fragments as f64) * (precursor_mz - 150.0);
            let intensity = 1e5 * (0.2 + (i as f64 * 0.321).sin().abs() * 0.8);
            (frag_mz < precursor_mz - 50.0).then_some((frag_mz, intensity))
        })
        .collect();

    peaks.extend([(110.0712, 5e4), (120.0808, 3e4), (136.0757, 4e4)]);
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    peaks.into_iter().unzip()
}

/// TIC and base peak traces over the MS1 scans
fn generate_chromatograms(spectra: &[SpectrumRecord]) -> Result<Vec<ChromatogramRecord>> {
    let ms1: Vec<&SpectrumRecord> = spectra.iter().filter(|s| s.ms_level == 1).collect();
    let rt: Vec<f64> = ms1.iter().map(|s| s.retention_time).collect();

    let tic = ms1.iter().map(|s| s.total_ion_current()).collect();
    let bpc = ms1
        .iter()
        .map(|s| s.intensity.iter().copied().fold(0.0, f64::max))
        .collect();

    Ok(vec![
        ChromatogramRecord::new("TIC", rt.clone(), tic)?,
        ChromatogramRecord::new("BPC", rt, bpc)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_run_is_valid() {
        let spectra = generate_mock_lcms_run(60.0, 4).unwrap();
        // 20 cycles of 1 MS1 + 4 MS2
        assert_eq!(spectra.len(), 100);
        assert!(spectra.iter().all(|s| s.validate().is_ok()));
        assert!(spectra
            .windows(2)
            .all(|w| w[0].retention_time <= w[1].retention_time));

        let chromatograms = generate_chromatograms(&spectra).unwrap();
        assert_eq!(chromatograms[0].data_point_count(), 20);
    }
}
