use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use std::path::Path;

use mzcache::cache::{
    build_index, CacheWriter, IndexMode, RandomAccessCacheReader, ReaderConfig, WriterConfig,
};
use mzcache::record::SpectrumRecord;
use tempfile::TempDir;

/// Create a cache file with known data
fn create_test_file(path: &Path, num_spectra: usize, peaks_per_spectrum: usize) {
    let mut writer =
        CacheWriter::create(path, num_spectra as u64, 0, WriterConfig::default()).unwrap();
    for i in 0..num_spectra {
        let spectrum = make_spectrum(i, peaks_per_spectrum);
        writer.consume_spectrum(&spectrum).unwrap();
    }
    writer.close().unwrap();
}

fn make_spectrum(i: usize, peaks: usize) -> SpectrumRecord {
    let mz = (0..peaks).map(|j| 200.0 + j as f64 * 10.0).collect();
    let intensity = (0..peaks).map(|j| 1000.0 + j as f64 * 100.0).collect();
    let ms_level = if i % 10 == 0 { 1 } else { 2 };
    SpectrumRecord::new(format!("scan={}", i + 1), ms_level, i as f64 * 0.5, mz, intensity)
        .unwrap()
}

/// Point reads scattered over the whole file
fn bench_random_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_access");

    for num_spectra in [1_000, 10_000] {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bench.mzcache");
        create_test_file(&file_path, num_spectra, 100);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}spectra", num_spectra)),
            &num_spectra,
            |b, &num_spectra| {
                let mut reader = RandomAccessCacheReader::open(&file_path).unwrap();
                let mut id = 0usize;
                b.iter(|| {
                    // large odd stride visits ids in scattered order
                    id = (id + 7_919) % num_spectra;
                    black_box(reader.get_spectrum_by_id(id).unwrap())
                });
            },
        );
    }

    group.finish();
}

/// Opening via footer versus full scan
fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    let num_spectra = 10_000;
    let mut writer = CacheWriter::new(
        Cursor::new(Vec::new()),
        num_spectra as u64,
        0,
        WriterConfig::default(),
    );
    for i in 0..num_spectra {
        writer.consume_spectrum(&make_spectrum(i, 50)).unwrap();
    }
    let (sink, _) = writer.into_inner().unwrap();
    let bytes = sink.into_inner();

    group.throughput(Throughput::Elements(num_spectra as u64));
    for mode in [IndexMode::Footer, IndexMode::FullScan] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", mode)),
            &mode,
            |b, &mode| {
                b.iter(|| {
                    let mut cursor = Cursor::new(bytes.as_slice());
                    black_box(build_index(&mut cursor, mode).unwrap())
                });
            },
        );
    }

    group.finish();
}

/// Retention time window lookups against the metadata store
fn bench_rt_window(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("rt.mzcache");
    create_test_file(&file_path, 10_000, 10);
    let reader = RandomAccessCacheReader::open_with_config(&file_path, ReaderConfig::default())
        .unwrap();

    c.bench_function("rt_window_10k", |b| {
        b.iter(|| black_box(reader.get_spectra_by_rt(black_box(2_500.0), 30.0).unwrap()))
    });
}

criterion_group!(benches, bench_random_access, bench_index_build, bench_rt_window);
criterion_main!(benches);
