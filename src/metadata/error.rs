/// Errors that can occur while loading or saving companion metadata
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// I/O error reading or writing the companion file
    #[error("Failed to access metadata file: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Companion file content is structurally invalid
    #[error("Invalid metadata: {0}")]
    InvalidFormat(String),
}
