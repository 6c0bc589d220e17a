//! # Option Limit CLI
//!
//! This is the binary entry point for the `option-limit` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging from `--log-level` and `RUST_LOG`.
//! - Executing the appropriate command and turning errors into a non-zero exit.
//!
//! The option limiting engine itself lives in the `option_limit` library
//! crate; the binary drives it against YAML site files.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
