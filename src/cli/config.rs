//! TOML configuration file support.
//!
//! Writer and reader settings can be kept in a config file instead of being
//! passed on every invocation:
//!
//! ```toml
//! # mzcache.toml
//! [writer]
//! write_footer = true
//! write_companion = true
//! buffer_size = 262144
//!
//! [reader]
//! index_mode = "auto"        # auto | footer | full-scan
//! read_mode = "cached"       # cached | cached-in-memory
//! buffer_size = 65536
//! derive_missing_metadata = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use mzcache::access::ReadMode;
use mzcache::cache::{IndexMode, ReaderConfig, WriterConfig};

/// Root configuration structure for mzcache.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Settings for commands that write caches.
    #[serde(default)]
    pub writer: WriterSection,

    /// Settings for commands that read caches.
    #[serde(default)]
    pub reader: ReaderSection,
}

/// `[writer]` section; unset keys keep the library defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterSection {
    pub write_footer: Option<bool>,
    pub write_companion: Option<bool>,
    pub buffer_size: Option<usize>,
}

/// `[reader]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderSection {
    pub index_mode: Option<IndexMode>,
    pub read_mode: Option<ReadMode>,
    pub buffer_size: Option<usize>,
    pub derive_missing_metadata: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Load the file if one was given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Writer configuration with file overrides applied.
    pub fn writer_config(&self) -> WriterConfig {
        let defaults = WriterConfig::default();
        WriterConfig {
            write_footer: self.writer.write_footer.unwrap_or(defaults.write_footer),
            write_companion: self.writer.write_companion.unwrap_or(defaults.write_companion),
            buffer_size: self.writer.buffer_size.unwrap_or(defaults.buffer_size),
        }
    }

    /// Reader configuration with file overrides applied.
    ///
    /// `index_mode` from the command line wins over the file.
    pub fn reader_config(&self, index_mode: Option<IndexMode>) -> ReaderConfig {
        let defaults = ReaderConfig::default();
        ReaderConfig {
            index_mode: index_mode
                .or(self.reader.index_mode)
                .unwrap_or(defaults.index_mode),
            buffer_size: self.reader.buffer_size.unwrap_or(defaults.buffer_size),
            derive_missing_metadata: self
                .reader
                .derive_missing_metadata
                .unwrap_or(defaults.derive_missing_metadata),
        }
    }

    /// Read mode, command line first.
    pub fn read_mode(&self, read_mode: Option<ReadMode>) -> ReadMode {
        read_mode.or(self.reader.read_mode).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [writer]
            write_footer = false
            buffer_size = 1024

            [reader]
            index_mode = "full-scan"
            read_mode = "cached-in-memory"
            derive_missing_metadata = false
        "#;

        let config = Config::from_str(toml).unwrap();
        let writer = config.writer_config();
        assert!(!writer.write_footer);
        assert!(writer.write_companion);
        assert_eq!(writer.buffer_size, 1024);

        let reader = config.reader_config(None);
        assert_eq!(reader.index_mode, IndexMode::FullScan);
        assert!(!reader.derive_missing_metadata);
        assert_eq!(config.read_mode(None), ReadMode::CachedInMemory);
    }

    #[test]
    fn test_command_line_wins() {
        let config = Config::from_str("[reader]\nindex_mode = \"footer\"\n").unwrap();
        assert_eq!(
            config.reader_config(Some(IndexMode::Auto)).index_mode,
            IndexMode::Auto
        );
        assert_eq!(config.read_mode(Some(ReadMode::Cached)), ReadMode::Cached);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.reader_config(None).index_mode, IndexMode::Auto);
        assert!(config.writer_config().write_footer);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_str("[writer]\ncompression = 3\n").is_err());
    }
}
