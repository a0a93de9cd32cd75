use crate::metadata::MetadataError;

/// Errors that can occur while writing, indexing or reading a cache file
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not a valid cache: bad header or footer, checksum mismatch,
    /// non-monotonic offsets or record counts that disagree
    #[error("Corrupt cache: {0}")]
    CorruptCache(String),

    /// The stream ended before a record's declared payload was read
    #[error("Truncated record: expected {expected} bytes, only {actual} available")]
    TruncatedRecord {
        /// Bytes the record declares
        expected: u64,
        /// Bytes that could actually be read
        actual: u64,
    },

    /// Writer protocol violation
    #[error("Illegal writer state: {0}")]
    IllegalState(String),

    /// Record id beyond the number of records in the file
    #[error("Index out of range: id {id} but only {len} records")]
    IndexOutOfRange {
        /// Requested id
        id: usize,
        /// Number of records available
        len: usize,
    },

    /// Axis and intensity arrays differ in length
    #[error("Array length mismatch: axis array has {axis_len} elements, intensity array has {intensity_len} elements")]
    ArrayLengthMismatch {
        /// Length of the m/z or RT array
        axis_len: usize,
        /// Length of the intensity array
        intensity_len: usize,
    },

    /// Record violates a data model invariant
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Query argument out of its domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metadata query issued against a reader without a metadata store
    #[error("No metadata store attached to this reader")]
    MissingMetadata,

    /// Companion metadata could not be loaded or saved
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),
}
