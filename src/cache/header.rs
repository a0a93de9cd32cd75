//! Versioned file header written at byte 0 of every cache file

use std::io::{ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::CacheError;

/// Magic bytes identifying a cache file
pub const CACHE_MAGIC: [u8; 8] = *b"MZCACHE\0";

/// Current on-disk format version
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Encoded header length; the first record starts here
pub const HEADER_LEN: u64 = 32;

/// Header flag: the file ends with an offset footer
pub const FLAG_HAS_FOOTER: u32 = 0x1;

const KNOWN_FLAGS: u32 = FLAG_HAS_FOOTER;

/// Decoded cache file header
///
/// ```text
/// [magic: 8 bytes][version: u32][flags: u32][spectrum_count: u64][chromatogram_count: u64]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version
    pub version: u32,
    /// Flag bits
    pub flags: u32,
    /// Declared number of spectrum records
    pub spectrum_count: u64,
    /// Declared number of chromatogram records
    pub chromatogram_count: u64,
}

impl FileHeader {
    /// Header for a new file in the current format version
    pub fn new(spectrum_count: u64, chromatogram_count: u64, has_footer: bool) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            flags: if has_footer { FLAG_HAS_FOOTER } else { 0 },
            spectrum_count,
            chromatogram_count,
        }
    }

    /// Whether the writer promised a trailing footer
    pub fn has_footer(&self) -> bool {
        self.flags & FLAG_HAS_FOOTER != 0
    }

    /// Write the header
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&CACHE_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u64::<LittleEndian>(self.spectrum_count)?;
        writer.write_u64::<LittleEndian>(self.chromatogram_count)?;
        Ok(())
    }

    /// Read and validate a header
    ///
    /// Anything that is not a header of a known version is `CorruptCache`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CacheError> {
        let mut buf = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                CacheError::CorruptCache("file is too short to hold a cache header".to_string())
            }
            _ => CacheError::IoError(e),
        })?;

        if buf[0..8] != CACHE_MAGIC {
            return Err(CacheError::CorruptCache(
                "missing cache header magic; not an mzcache file".to_string(),
            ));
        }

        let mut fields = &buf[8..];
        let header = Self {
            version: fields.read_u32::<LittleEndian>()?,
            flags: fields.read_u32::<LittleEndian>()?,
            spectrum_count: fields.read_u64::<LittleEndian>()?,
            chromatogram_count: fields.read_u64::<LittleEndian>()?,
        };

        if header.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::CorruptCache(format!(
                "unsupported cache format version {} (expected {})",
                header.version, CACHE_FORMAT_VERSION
            )));
        }
        if header.flags & !KNOWN_FLAGS != 0 {
            return Err(CacheError::CorruptCache(format!(
                "unknown header flags {:#x}",
                header.flags
            )));
        }
        Ok(header)
    }
}
