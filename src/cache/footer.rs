//! Trailing offset footer
//!
//! ```text
//! [spectra_offset_count: u64][spectra_offsets: u64 x N]
//! [chrom_offset_count: u64][chrom_offsets: u64 x M]
//! [footer_start: u64][crc32: u32][magic: "MZCF"]      <- 16 byte trailer
//! ```
//!
//! The CRC covers the footer body (everything before the trailer). Readers
//! locate the footer through the trailer at the very end of the file.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::{CrcReader, CrcWriter};

use super::header::HEADER_LEN;
use super::CacheError;

/// Magic bytes closing every footer
pub const FOOTER_MAGIC: [u8; 4] = *b"MZCF";

/// Length of the fixed trailer after the footer body
pub const TRAILER_LEN: u64 = 8 + 4 + 4;

/// Smallest possible footer body: two zero counts
const MIN_BODY_LEN: u64 = 16;

/// Offsets read back from a footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterTable {
    /// Byte position where the footer body starts (end of the record region)
    pub footer_start: u64,
    /// Spectrum record offsets as written
    pub spectra_offsets: Vec<u64>,
    /// Chromatogram record offsets as written
    pub chrom_offsets: Vec<u64>,
}

/// Write footer body and trailer, returning the number of bytes written
///
/// `footer_start` is the byte position of the writer when the footer begins.
pub fn write_footer<W: Write>(
    writer: &mut W,
    footer_start: u64,
    spectra_offsets: &[u64],
    chrom_offsets: &[u64],
) -> std::io::Result<u64> {
    let mut body = CrcWriter::new(&mut *writer);
    write_offsets(&mut body, spectra_offsets)?;
    write_offsets(&mut body, chrom_offsets)?;
    let crc = body.crc().sum();
    drop(body);
    let body_len = MIN_BODY_LEN + 8 * (spectra_offsets.len() + chrom_offsets.len()) as u64;

    writer.write_u64::<LittleEndian>(footer_start)?;
    writer.write_u32::<LittleEndian>(crc)?;
    writer.write_all(&FOOTER_MAGIC)?;
    Ok(body_len + TRAILER_LEN)
}

fn write_offsets<W: Write>(writer: &mut W, offsets: &[u64]) -> std::io::Result<()> {
    writer.write_u64::<LittleEndian>(offsets.len() as u64)?;
    for &offset in offsets {
        writer.write_u64::<LittleEndian>(offset)?;
    }
    Ok(())
}

/// Locate, verify and decode the footer at the end of `reader`
///
/// Offsets are returned as stored; monotonicity and count checks are the
/// index builder's job.
pub fn read_footer<R: Read + Seek>(reader: &mut R) -> Result<FooterTable, CacheError> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    if file_len < HEADER_LEN + MIN_BODY_LEN + TRAILER_LEN {
        return Err(CacheError::CorruptCache(format!(
            "file of {} bytes is too short to contain a footer; it may be incomplete",
            file_len
        )));
    }

    let trailer_start = file_len - TRAILER_LEN;
    reader.seek(SeekFrom::Start(trailer_start))?;
    let footer_start = reader.read_u64::<LittleEndian>()?;
    let stored_crc = reader.read_u32::<LittleEndian>()?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;

    if magic != FOOTER_MAGIC {
        return Err(CacheError::CorruptCache(
            "footer magic not found; the file is incomplete or was not closed".to_string(),
        ));
    }
    if footer_start < HEADER_LEN || footer_start > trailer_start - MIN_BODY_LEN {
        return Err(CacheError::CorruptCache(format!(
            "footer start {} lies outside the file",
            footer_start
        )));
    }

    let body_len = trailer_start - footer_start;
    reader.seek(SeekFrom::Start(footer_start))?;
    let mut body = CrcReader::new(reader.by_ref().take(body_len));

    let spectra_offsets = read_offsets(&mut body, body_len - MIN_BODY_LEN)?;
    let remaining = body_len - MIN_BODY_LEN - 8 * spectra_offsets.len() as u64;
    let chrom_offsets = read_offsets(&mut body, remaining)?;

    if 8 * chrom_offsets.len() as u64 != remaining {
        return Err(CacheError::CorruptCache(format!(
            "footer body has {} unexplained trailing bytes",
            remaining - 8 * chrom_offsets.len() as u64
        )));
    }
    if body.crc().sum() != stored_crc {
        return Err(CacheError::CorruptCache("footer checksum mismatch".to_string()));
    }

    Ok(FooterTable {
        footer_start,
        spectra_offsets,
        chrom_offsets,
    })
}

/// Read one length-prefixed offset list whose entries may use at most
/// `budget` bytes
fn read_offsets<R: Read>(reader: &mut R, budget: u64) -> Result<Vec<u64>, CacheError> {
    let count = reader.read_u64::<LittleEndian>()?;
    if count > budget / 8 {
        return Err(CacheError::CorruptCache(format!(
            "footer declares {} offsets but only has room for {}",
            count,
            budget / 8
        )));
    }
    let mut offsets = vec![0u64; count as usize];
    reader.read_u64_into::<LittleEndian>(&mut offsets)?;
    Ok(offsets)
}
