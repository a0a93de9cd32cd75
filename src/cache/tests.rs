use std::io::Cursor;
use std::sync::Arc;

use super::header::HEADER_LEN;
use super::*;
use crate::metadata::{MetadataStore, RunInfo};
use crate::record::{ChromatogramRecord, SpectrumRecord};

fn sample_spectra() -> Vec<SpectrumRecord> {
    vec![
        SpectrumRecord::new("scan=1", 1, 1.0, vec![100.0, 150.5, 200.25], vec![1e3, 2e3, 3e3]).unwrap(),
        SpectrumRecord::new("scan=2", 2, 2.0, vec![], vec![]).unwrap(),
        SpectrumRecord::new("scan=3", 1, 3.0, vec![400.0], vec![7.5]).unwrap(),
    ]
}

fn sample_chromatograms() -> Vec<ChromatogramRecord> {
    vec![
        ChromatogramRecord::new("TIC", vec![1.0, 2.0, 3.0], vec![6e3, 0.0, 7.5]).unwrap(),
        ChromatogramRecord::new("SRM 1", vec![0.5, 1.5], vec![10.0, 20.0])
            .unwrap()
            .with_transition(500.0, 250.0),
    ]
}

fn write_cache(
    spectra: &[SpectrumRecord],
    chromatograms: &[ChromatogramRecord],
    config: WriterConfig,
) -> Vec<u8> {
    let mut writer = CacheWriter::new(
        Cursor::new(Vec::new()),
        spectra.len() as u64,
        chromatograms.len() as u64,
        config,
    );
    for spectrum in spectra {
        writer.consume_spectrum(spectrum).unwrap();
    }
    for chromatogram in chromatograms {
        writer.consume_chromatogram(chromatogram).unwrap();
    }
    let (sink, _) = writer.into_inner().unwrap();
    sink.into_inner()
}

fn open_bytes(
    bytes: Vec<u8>,
    mode: IndexMode,
) -> Result<RandomAccessCacheReader<Cursor<Vec<u8>>>, CacheError> {
    let config = ReaderConfig {
        index_mode: mode,
        ..Default::default()
    };
    RandomAccessCacheReader::from_reader(Cursor::new(bytes), config)
}

#[test]
fn test_point_reads_match_written_records() {
    let spectra = sample_spectra();
    let chromatograms = sample_chromatograms();
    let bytes = write_cache(&spectra, &chromatograms, WriterConfig::default());

    let mut reader = open_bytes(bytes, IndexMode::Auto).unwrap();
    assert_eq!(reader.index_source(), IndexSource::Footer);
    assert_eq!(reader.nr_spectra(), 3);
    assert_eq!(reader.nr_chromatograms(), 2);

    // reverse order exercises the seek on every read
    for id in (0..spectra.len()).rev() {
        let record = reader.get_spectrum_by_id(id).unwrap();
        assert_eq!(record.ms_level, spectra[id].ms_level);
        assert_eq!(record.retention_time, spectra[id].retention_time);
        assert_eq!(record.mz, spectra[id].mz);
        assert_eq!(record.intensity, spectra[id].intensity);
        assert!(record.native_id.is_empty());
    }
    for (id, expected) in chromatograms.iter().enumerate() {
        let record = reader.get_chromatogram_by_id(id).unwrap();
        assert_eq!(record.rt, expected.rt);
        assert_eq!(record.intensity, expected.intensity);
    }
}

#[test]
fn test_footer_and_full_scan_agree() {
    let bytes = write_cache(&sample_spectra(), &sample_chromatograms(), WriterConfig::default());

    let from_footer = build_index(&mut Cursor::new(bytes.clone()), IndexMode::Footer).unwrap();
    let from_scan = build_index(&mut Cursor::new(bytes), IndexMode::FullScan).unwrap();
    assert_eq!(from_footer, from_scan);
    assert_eq!(from_footer.spectrum_offset(0).unwrap(), HEADER_LEN);
    // 3 peaks: 20 + 48 bytes
    assert_eq!(from_footer.spectrum_offset(1).unwrap(), HEADER_LEN + 68);
}

#[test]
fn test_footerless_file() {
    let config = WriterConfig {
        write_footer: false,
        ..Default::default()
    };
    let bytes = write_cache(&sample_spectra(), &sample_chromatograms(), config);

    let mut reader = open_bytes(bytes.clone(), IndexMode::Auto).unwrap();
    assert_eq!(reader.index_source(), IndexSource::FullScan);
    assert_eq!(reader.get_spectrum_by_id(2).unwrap().mz, vec![400.0]);

    assert!(matches!(
        open_bytes(bytes, IndexMode::Footer),
        Err(CacheError::CorruptCache(_))
    ));
}

#[test]
fn test_empty_cache() {
    let bytes = write_cache(&[], &[], WriterConfig::default());
    for mode in [IndexMode::Auto, IndexMode::FullScan] {
        let mut reader = open_bytes(bytes.clone(), mode).unwrap();
        assert_eq!(reader.nr_spectra(), 0);
        assert_eq!(reader.nr_chromatograms(), 0);
        assert!(matches!(
            reader.get_spectrum_by_id(0),
            Err(CacheError::IndexOutOfRange { id: 0, len: 0 })
        ));
    }
}

#[test]
fn test_out_of_range_keeps_reader_usable() {
    let bytes = write_cache(&sample_spectra(), &sample_chromatograms(), WriterConfig::default());
    let mut reader = open_bytes(bytes, IndexMode::Auto).unwrap();

    let len = reader.nr_spectra();
    assert!(matches!(
        reader.get_spectrum_by_id(len),
        Err(CacheError::IndexOutOfRange { id: 3, len: 3 })
    ));
    assert!(matches!(
        reader.get_chromatogram_by_id(2),
        Err(CacheError::IndexOutOfRange { id: 2, len: 2 })
    ));
    assert_eq!(reader.get_spectrum_by_id(0).unwrap().mz.len(), 3);
}

#[test]
fn test_truncated_before_footer_is_corrupt() {
    let bytes = write_cache(&sample_spectra(), &sample_chromatograms(), WriterConfig::default());
    let footer_len = 16 + 8 * 5 + 16;

    for cut in [1, 10, footer_len] {
        let truncated = bytes[..bytes.len() - cut].to_vec();
        assert!(
            matches!(open_bytes(truncated, IndexMode::Auto), Err(CacheError::CorruptCache(_))),
            "cut of {} bytes was accepted",
            cut
        );
    }
}

#[test]
fn test_truncated_record_under_full_scan() {
    let bytes = write_cache(&sample_spectra(), &[], WriterConfig::default());
    // cut inside the payload of the first spectrum
    let truncated = bytes[..(HEADER_LEN + 30) as usize].to_vec();
    assert!(matches!(
        open_bytes(truncated, IndexMode::FullScan),
        Err(CacheError::TruncatedRecord {
            expected: 68,
            actual: 30
        })
    ));
}

#[test]
fn test_corrupt_footer_offsets_rejected() {
    let mut bytes = write_cache(&sample_spectra(), &[], WriterConfig::default());
    let len = bytes.len();
    // second spectrum offset lives after the count in the footer body
    let footer_start = u64::from_le_bytes(bytes[len - 16..len - 8].try_into().unwrap()) as usize;
    let second = footer_start + 16;
    bytes[second..second + 8].copy_from_slice(&(HEADER_LEN).to_le_bytes());

    // checksum catches it first
    assert!(matches!(
        open_bytes(bytes, IndexMode::Auto),
        Err(CacheError::CorruptCache(msg)) if msg.contains("checksum")
    ));
}

#[test]
fn test_declared_count_mismatch() {
    let mut bytes = write_cache(&sample_spectra(), &[], WriterConfig::default());
    // header claims four spectra
    bytes[16..24].copy_from_slice(&4u64.to_le_bytes());
    assert!(matches!(
        open_bytes(bytes, IndexMode::Footer),
        Err(CacheError::CorruptCache(_))
    ));
}

#[test]
fn test_metadata_attach_and_rt_query() {
    let spectra = sample_spectra();
    let chromatograms = sample_chromatograms();
    let bytes = write_cache(&spectra, &chromatograms, WriterConfig::default());
    let store = MetadataStore::from_records(RunInfo::new(), &spectra, &chromatograms).unwrap();

    let reader = open_bytes(bytes.clone(), IndexMode::Auto).unwrap();
    assert!(matches!(
        reader.get_spectra_by_rt(2.0, 0.5),
        Err(CacheError::MissingMetadata)
    ));

    let mut reader = reader.with_metadata(Arc::new(store)).unwrap();
    assert_eq!(reader.get_spectra_by_rt(2.0, 0.5).unwrap(), vec![1]);
    assert_eq!(reader.get_spectra_by_rt(2.0, 1.5).unwrap(), vec![0, 1, 2]);
    assert_eq!(reader.get_spectrum_by_id(1).unwrap().native_id, "scan=2");

    let srm = reader.get_chromatogram_by_id(1).unwrap();
    assert_eq!(srm.native_id, "SRM 1");
    assert_eq!(srm.precursor_mz, Some(500.0));
    assert_eq!(srm.product_mz, Some(250.0));
}

#[test]
fn test_metadata_count_mismatch_is_corrupt() {
    let spectra = sample_spectra();
    let bytes = write_cache(&spectra, &[], WriterConfig::default());
    let store = MetadataStore::from_records(RunInfo::new(), &spectra[..2], &[]).unwrap();

    let reader = open_bytes(bytes, IndexMode::Auto).unwrap();
    assert!(matches!(
        reader.with_metadata(Arc::new(store)),
        Err(CacheError::CorruptCache(_))
    ));
}

#[test]
fn test_derive_metadata_from_headers() {
    let bytes = write_cache(&sample_spectra(), &sample_chromatograms(), WriterConfig::default());
    let mut reader = open_bytes(bytes, IndexMode::Auto).unwrap();

    let store = reader.derive_metadata().unwrap();
    assert_eq!(store.nr_spectra(), 3);
    assert_eq!(store.nr_chromatograms(), 2);
    assert_eq!(store.spectrum(1).unwrap().ms_level, 2);
    assert_eq!(store.rt_range(), Some((1.0, 3.0)));
}

#[test]
fn test_file_roundtrip_with_companion() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.mzcache");
    let spectra = sample_spectra();
    let chromatograms = sample_chromatograms();

    let mut writer = CacheWriter::create(&path, 3, 2, WriterConfig::default())?;
    for spectrum in &spectra {
        writer.consume_spectrum(spectrum)?;
    }
    for chromatogram in &chromatograms {
        writer.consume_chromatogram(chromatogram)?;
    }
    let stats = writer.close()?;
    assert_eq!(stats.bytes_written, std::fs::metadata(&path)?.len());
    assert!(MetadataStore::companion_path(&path).exists());

    let mut reader = RandomAccessCacheReader::open(&path)?;
    assert_eq!(reader.get_spectrum_by_id(0)?, spectra[0]);
    assert_eq!(reader.get_chromatogram_by_id(1)?, chromatograms[1]);

    let mut clone = reader.try_clone()?;
    assert!(Arc::ptr_eq(clone.index(), reader.index()));
    assert_eq!(clone.get_spectrum_by_id(2)?, spectra[2]);
    Ok(())
}

#[test]
fn test_drop_finalizes_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("dropped.mzcache");
    let spectra = sample_spectra();

    {
        let mut writer = CacheWriter::create(&path, 3, 0, WriterConfig::default())?;
        for spectrum in &spectra {
            writer.consume_spectrum(spectrum)?;
        }
    }

    let mut reader = RandomAccessCacheReader::open(&path)?;
    assert_eq!(reader.index_source(), IndexSource::Footer);
    assert_eq!(reader.get_spectrum_by_id(1)?, spectra[1]);
    Ok(())
}

#[test]
fn test_short_write_is_rejected_by_reader() {
    let spectra = sample_spectra();
    let mut bytes = Vec::new();
    {
        let mut writer = CacheWriter::new(&mut bytes, 3, 0, WriterConfig::default());
        writer.consume_spectrum(&spectra[0]).unwrap();
        assert!(matches!(writer.finish(), Err(CacheError::IllegalState(_))));
    }

    // footer was still written
    assert_eq!(&bytes[bytes.len() - 4..], &footer::FOOTER_MAGIC);
    assert!(matches!(
        open_bytes(bytes, IndexMode::Auto),
        Err(CacheError::CorruptCache(_))
    ));
}

#[test]
fn test_corrupt_record_count_is_not_returned() {
    let spectra = vec![
        SpectrumRecord::new("scan=1", 1, 1.0, vec![1.0, 2.0], vec![4.0, 5.0]).unwrap(),
        SpectrumRecord::new("scan=2", 1, 2.0, vec![3.0, 6.0], vec![7.0, 8.0]).unwrap(),
    ];
    let mut bytes = write_cache(&spectra, &[], WriterConfig::default());
    // peak count of the first spectrum sits after ms_level and rt
    let count_at = (HEADER_LEN + 12) as usize;
    bytes[count_at..count_at + 8].copy_from_slice(&3u64.to_le_bytes());

    let mut reader = open_bytes(bytes.clone(), IndexMode::Auto).unwrap();
    assert!(matches!(
        reader.get_spectrum_by_id(0),
        Err(CacheError::TruncatedRecord {
            expected: 68,
            actual: 52
        })
    ));
    assert!(matches!(
        reader.read_spectrum_header(0),
        Err(CacheError::TruncatedRecord { .. })
    ));
    // neighbours stay readable
    assert_eq!(reader.get_spectrum_by_id(1).unwrap().mz, vec![3.0, 6.0]);

    bytes[count_at..count_at + 8].copy_from_slice(&1u64.to_le_bytes());
    let mut reader = open_bytes(bytes, IndexMode::Auto).unwrap();
    assert!(matches!(
        reader.get_spectrum_by_id(0),
        Err(CacheError::CorruptCache(msg)) if msg.contains("slot")
    ));
}

#[test]
fn test_corrupt_chromatogram_count_is_not_returned() {
    let chromatograms = sample_chromatograms();
    let bytes = write_cache(&sample_spectra(), &chromatograms, WriterConfig::default());
    let reader = open_bytes(bytes.clone(), IndexMode::Auto).unwrap();
    let offset = reader.index().chromatogram_offset(0).unwrap() as usize;

    let mut bytes = bytes;
    bytes[offset..offset + 8].copy_from_slice(&4u64.to_le_bytes());
    let mut reader = open_bytes(bytes, IndexMode::Auto).unwrap();
    assert!(matches!(
        reader.get_chromatogram_by_id(0),
        Err(CacheError::TruncatedRecord { .. })
    ));
    assert_eq!(reader.get_chromatogram_by_id(1).unwrap().rt, chromatograms[1].rt);
}

#[test]
fn test_rejected_spectrum_leaves_sections_intact() {
    let spectra = sample_spectra();
    let chromatograms = sample_chromatograms();
    let mut writer = CacheWriter::new(
        Cursor::new(Vec::new()),
        spectra.len() as u64,
        chromatograms.len() as u64,
        WriterConfig::default(),
    );
    for spectrum in &spectra {
        writer.consume_spectrum(spectrum).unwrap();
    }
    writer.consume_chromatogram(&chromatograms[0]).unwrap();
    assert!(matches!(
        writer.consume_spectrum(&spectra[0]),
        Err(CacheError::IllegalState(_))
    ));
    writer.consume_chromatogram(&chromatograms[1]).unwrap();
    let (sink, _) = writer.into_inner().unwrap();

    let mut reader = open_bytes(sink.into_inner(), IndexMode::Footer).unwrap();
    assert_eq!(reader.nr_spectra(), spectra.len());
    assert_eq!(reader.nr_chromatograms(), chromatograms.len());
    for (id, expected) in spectra.iter().enumerate() {
        let record = reader.get_spectrum_by_id(id).unwrap();
        assert_eq!(record.ms_level, expected.ms_level);
        assert_eq!(record.retention_time, expected.retention_time);
        assert_eq!(record.mz, expected.mz);
        assert_eq!(record.intensity, expected.intensity);
    }
    for (id, expected) in chromatograms.iter().enumerate() {
        let record = reader.get_chromatogram_by_id(id).unwrap();
        assert_eq!(record.rt, expected.rt);
        assert_eq!(record.intensity, expected.intensity);
    }
}
