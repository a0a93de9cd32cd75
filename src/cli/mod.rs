use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mzcache::access::ReadMode;
use mzcache::cache::IndexMode;

mod config;
mod demo;
mod extract;
mod info;
mod validate;

pub use config::Config;

/// mzcache - random-access binary cache for mass spectrometry runs
#[derive(Parser)]
#[command(name = "mzcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// How the offset index is obtained.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum IndexModeArg {
    /// Footer when present, full scan otherwise
    Auto,
    /// Require the footer
    Footer,
    /// Scan every record
    FullScan,
}

impl From<IndexModeArg> for IndexMode {
    fn from(arg: IndexModeArg) -> Self {
        match arg {
            IndexModeArg::Auto => IndexMode::Auto,
            IndexModeArg::Footer => IndexMode::Footer,
            IndexModeArg::FullScan => IndexMode::FullScan,
        }
    }
}

/// Where extracted records are served from.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReadModeArg {
    /// Read each record from the cache file
    Cached,
    /// Load the whole run into memory first
    CachedInMemory,
}

impl From<ReadModeArg> for ReadMode {
    fn from(arg: ReadModeArg) -> Self {
        match arg {
            ReadModeArg::Cached => ReadMode::Cached,
            ReadModeArg::CachedInMemory => ReadMode::CachedInMemory,
        }
    }
}

/// Records selected by `extract`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Selection {
    /// Spectrum id
    #[arg(long)]
    pub id: Option<usize>,

    /// Spectrum native id, e.g. "scan=42"
    #[arg(long, value_name = "NATIVE_ID")]
    pub native_id: Option<String>,

    /// Centre of a retention time window in seconds (see --delta)
    #[arg(long, value_name = "RT")]
    pub rt: Option<f64>,

    /// Chromatogram id
    #[arg(long, value_name = "ID")]
    pub chromatogram: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic LC-MS run as a cache file
    Demo {
        /// Output cache file path
        #[arg(value_name = "OUTPUT", default_value = "demo_lcms_run.mzcache")]
        output: PathBuf,

        /// Gradient length in minutes
        #[arg(short = 'd', long, default_value = "10")]
        duration_min: f64,

        /// MS2 scans per duty cycle
        #[arg(long, default_value = "10")]
        ms2_per_cycle: usize,
    },

    /// Display information about a cache file
    Info {
        /// Input cache file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Override how the offset index is obtained
        #[arg(long, value_enum)]
        index_mode: Option<IndexModeArg>,
    },

    /// Validate cache file integrity
    Validate {
        /// Input cache file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also rebuild the index by full scan and compare it with the footer
        #[arg(long)]
        full_scan: bool,

        /// Skip decoding every record
        #[arg(long)]
        headers_only: bool,
    },

    /// Print spectra or chromatograms as JSON
    Extract {
        /// Input cache file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        selection: Selection,

        /// Half-width of the retention time window in seconds
        #[arg(long, default_value = "0", requires = "rt")]
        delta: f64,

        /// Serve records from the file or from memory
        #[arg(long, value_enum)]
        read_mode: Option<ReadModeArg>,

        /// Write JSON here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Demo {
            output,
            duration_min,
            ms2_per_cycle,
        } => demo::run(output, duration_min, ms2_per_cycle, config.writer_config()),
        Commands::Info { file, index_mode } => {
            info::run(file, config.reader_config(index_mode.map(IndexMode::from)))
        }
        Commands::Validate {
            file,
            full_scan,
            headers_only,
        } => validate::run(file, full_scan, !headers_only),
        Commands::Extract {
            file,
            selection,
            delta,
            read_mode,
            output,
        } => extract::run(
            file,
            selection,
            delta,
            config.read_mode(read_mode.map(ReadMode::from)),
            config.reader_config(None),
            output,
        ),
    }
}
