//! Fixed-width record codec
//!
//! Every record is stored uncompressed so that decoding is a single bounded
//! read followed by a byte-order conversion:
//!
//! ```text
//! spectrum:     [ms_level: i32][rt: f64][count: u64][mz: count x f64][intensity: count x f64]
//! chromatogram: [count: u64][rt: count x f64][intensity: count x f64]
//! ```
//!
//! All values are little-endian.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use super::CacheError;
use crate::record::{ChromatogramRecord, SpectrumRecord};

/// Size of the fixed spectrum record header (ms_level, rt, count)
pub const SPECTRUM_HEADER_LEN: u64 = 4 + 8 + 8;

/// Size of the fixed chromatogram record header (count)
pub const CHROMATOGRAM_HEADER_LEN: u64 = 8;

/// Bytes per stored value
const VALUE_LEN: u64 = 8;

/// Upper bound for buffer preallocation; larger payloads grow while reading so
/// that a corrupt count cannot trigger a huge allocation up front
pub(crate) const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Total encoded length of a spectrum record with `count` peaks
pub fn spectrum_record_len(count: u64) -> Option<u64> {
    payload_len(count)?.checked_add(SPECTRUM_HEADER_LEN)
}

/// Total encoded length of a chromatogram record with `count` points
pub fn chromatogram_record_len(count: u64) -> Option<u64> {
    payload_len(count)?.checked_add(CHROMATOGRAM_HEADER_LEN)
}

fn payload_len(count: u64) -> Option<u64> {
    count.checked_mul(2 * VALUE_LEN)
}

/// Encode one spectrum record
///
/// # Panics
///
/// Panics if `mz` and `intensity` differ in length. Callers validate records
/// before they reach the codec.
pub fn encode_spectrum(ms_level: i32, rt: f64, mz: &[f64], intensity: &[f64]) -> Vec<u8> {
    assert_eq!(
        mz.len(),
        intensity.len(),
        "m/z and intensity arrays must have equal length"
    );
    let header_len = SPECTRUM_HEADER_LEN as usize;
    let mut buf = vec![0u8; header_len + 2 * 8 * mz.len()];

    LittleEndian::write_i32(&mut buf[0..4], ms_level);
    LittleEndian::write_f64(&mut buf[4..12], rt);
    LittleEndian::write_u64(&mut buf[12..20], mz.len() as u64);
    write_arrays(&mut buf[header_len..], mz, intensity);
    buf
}

/// Encode one chromatogram record
///
/// # Panics
///
/// Panics if `rt` and `intensity` differ in length.
pub fn encode_chromatogram(rt: &[f64], intensity: &[f64]) -> Vec<u8> {
    assert_eq!(
        rt.len(),
        intensity.len(),
        "RT and intensity arrays must have equal length"
    );
    let header_len = CHROMATOGRAM_HEADER_LEN as usize;
    let mut buf = vec![0u8; header_len + 2 * 8 * rt.len()];

    LittleEndian::write_u64(&mut buf[0..8], rt.len() as u64);
    write_arrays(&mut buf[header_len..], rt, intensity);
    buf
}

fn write_arrays(dst: &mut [u8], axis: &[f64], intensity: &[f64]) {
    let (axis_bytes, intensity_bytes) = dst.split_at_mut(8 * axis.len());
    LittleEndian::write_f64_into(axis, axis_bytes);
    LittleEndian::write_f64_into(intensity, intensity_bytes);
}

/// Fixed header fields of a spectrum record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumHeader {
    /// MS level
    pub ms_level: i32,
    /// Retention time in seconds
    pub retention_time: f64,
    /// Number of peaks that follow
    pub count: u64,
}

/// Read only the fixed header of a spectrum record
pub fn read_spectrum_header<R: Read>(reader: &mut R) -> Result<SpectrumHeader, CacheError> {
    let mut header = [0u8; SPECTRUM_HEADER_LEN as usize];
    read_fixed(reader, &mut header)?;
    Ok(SpectrumHeader {
        ms_level: LittleEndian::read_i32(&header[0..4]),
        retention_time: LittleEndian::read_f64(&header[4..12]),
        count: LittleEndian::read_u64(&header[12..20]),
    })
}

fn read_chromatogram_count<R: Read>(reader: &mut R) -> Result<u64, CacheError> {
    let mut header = [0u8; CHROMATOGRAM_HEADER_LEN as usize];
    read_fixed(reader, &mut header)?;
    Ok(LittleEndian::read_u64(&header))
}

/// Decode one spectrum record from a reader positioned at its first byte
///
/// The returned record has an empty `native_id`; identifiers live in the
/// companion metadata.
pub fn decode_spectrum<R: Read>(reader: &mut R) -> Result<SpectrumRecord, CacheError> {
    let header = read_spectrum_header(reader)?;
    spectrum_body(reader, header)
}

/// Decode a spectrum record that must occupy exactly `span` bytes
///
/// A record declaring more bytes than its slot holds is `TruncatedRecord`;
/// one declaring fewer is `CorruptCache`. Nothing past the slot is read.
pub fn decode_spectrum_exact<R: Read>(
    reader: &mut R,
    span: u64,
) -> Result<SpectrumRecord, CacheError> {
    let header = read_spectrum_header_exact(reader, span)?;
    spectrum_body(reader, header)
}

/// Read the fixed header of a spectrum record that must occupy exactly `span` bytes
pub fn read_spectrum_header_exact<R: Read>(
    reader: &mut R,
    span: u64,
) -> Result<SpectrumHeader, CacheError> {
    let header = read_spectrum_header(&mut reader.by_ref().take(span))?;
    let len = spectrum_record_len(header.count).ok_or_else(|| oversized(header.count))?;
    check_span(len, span)?;
    Ok(header)
}

fn spectrum_body<R: Read>(
    reader: &mut R,
    header: SpectrumHeader,
) -> Result<SpectrumRecord, CacheError> {
    let (mz, intensity) = read_arrays(reader, header.count)?;
    Ok(SpectrumRecord {
        native_id: String::new(),
        ms_level: header.ms_level,
        retention_time: header.retention_time,
        mz,
        intensity,
    })
}

/// Decode one chromatogram record from a reader positioned at its first byte
pub fn decode_chromatogram<R: Read>(reader: &mut R) -> Result<ChromatogramRecord, CacheError> {
    let count = read_chromatogram_count(reader)?;
    chromatogram_body(reader, count)
}

/// Decode a chromatogram record that must occupy exactly `span` bytes
pub fn decode_chromatogram_exact<R: Read>(
    reader: &mut R,
    span: u64,
) -> Result<ChromatogramRecord, CacheError> {
    let count = read_chromatogram_count(&mut reader.by_ref().take(span))?;
    let len = chromatogram_record_len(count).ok_or_else(|| oversized(count))?;
    check_span(len, span)?;
    chromatogram_body(reader, count)
}

fn chromatogram_body<R: Read>(reader: &mut R, count: u64) -> Result<ChromatogramRecord, CacheError> {
    let (rt, intensity) = read_arrays(reader, count)?;
    Ok(ChromatogramRecord {
        native_id: String::new(),
        precursor_mz: None,
        product_mz: None,
        rt,
        intensity,
    })
}

fn check_span(len: u64, span: u64) -> Result<(), CacheError> {
    if len > span {
        return Err(CacheError::TruncatedRecord {
            expected: len,
            actual: span,
        });
    }
    if len < span {
        return Err(CacheError::CorruptCache(format!(
            "record declares {} bytes but its slot holds {}",
            len, span
        )));
    }
    Ok(())
}

/// Skip over a spectrum record without decoding its payload
///
/// `end` is the first byte past the record region. Returns the record length.
pub fn skip_spectrum<R: Read + Seek>(reader: &mut R, end: u64) -> Result<u64, CacheError> {
    let start = reader.stream_position()?;
    let header = read_spectrum_header(reader)?;
    let len = spectrum_record_len(header.count).ok_or_else(|| oversized(header.count))?;
    skip_to(reader, start, len, end)
}

/// Skip over a chromatogram record without decoding its payload
pub fn skip_chromatogram<R: Read + Seek>(reader: &mut R, end: u64) -> Result<u64, CacheError> {
    let start = reader.stream_position()?;
    let count = read_chromatogram_count(reader)?;
    let len = chromatogram_record_len(count).ok_or_else(|| oversized(count))?;
    skip_to(reader, start, len, end)
}

fn skip_to<R: Seek>(reader: &mut R, start: u64, len: u64, end: u64) -> Result<u64, CacheError> {
    let available = end.saturating_sub(start);
    if len > available {
        return Err(CacheError::TruncatedRecord {
            expected: len,
            actual: available,
        });
    }
    reader.seek(SeekFrom::Start(start + len))?;
    Ok(len)
}

fn oversized(count: u64) -> CacheError {
    CacheError::CorruptCache(format!("record declares an impossible element count {}", count))
}

fn read_arrays<R: Read>(reader: &mut R, count: u64) -> Result<(Vec<f64>, Vec<f64>), CacheError> {
    let byte_len = payload_len(count).ok_or_else(|| oversized(count))?;
    let n = usize::try_from(count).map_err(|_| oversized(count))?;

    let mut bytes = Vec::with_capacity(byte_len.min(MAX_PREALLOC) as usize);
    let read = reader.by_ref().take(byte_len).read_to_end(&mut bytes)? as u64;
    if read < byte_len {
        return Err(CacheError::TruncatedRecord {
            expected: byte_len,
            actual: read,
        });
    }

    let (axis_bytes, intensity_bytes) = bytes.split_at(8 * n);
    let mut axis = vec![0.0; n];
    let mut intensity = vec![0.0; n];
    LittleEndian::read_f64_into(axis_bytes, &mut axis);
    LittleEndian::read_f64_into(intensity_bytes, &mut intensity);
    Ok((axis, intensity))
}

fn read_fixed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), CacheError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(CacheError::TruncatedRecord {
                    expected: buf.len() as u64,
                    actual: filled as u64,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
