#![no_main]

use libfuzzer_sys::fuzz_target;
use mzcache::cache::{IndexMode, RandomAccessCacheReader, ReaderConfig};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must be rejected with an error, never a panic or a huge allocation
    for index_mode in [IndexMode::Auto, IndexMode::FullScan] {
        let config = ReaderConfig {
            index_mode,
            ..Default::default()
        };
        let Ok(mut reader) = RandomAccessCacheReader::from_reader(Cursor::new(data), config) else {
            continue;
        };

        for id in 0..reader.nr_spectra().min(100) {
            let _ = reader.get_spectrum_by_id(id);
        }
        for id in 0..reader.nr_chromatograms().min(100) {
            let _ = reader.get_chromatogram_by_id(id);
        }
        if let Ok(store) = reader.derive_metadata() {
            let _ = store.spectra_by_rt(0.0, 1.0);
        }
    }
});
