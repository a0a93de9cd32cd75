//! # mzcache
//!
//! Command-line front end for the binary spectrum cache.
//!
//! ```bash
//! # Generate a synthetic run
//! mzcache demo run.mzcache
//!
//! # Inspect and check it
//! mzcache info run.mzcache
//! mzcache validate run.mzcache --full-scan
//!
//! # Pull spectra out as JSON
//! mzcache extract run.mzcache --rt 300 --delta 1.5
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
