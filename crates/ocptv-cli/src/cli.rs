//! CLI argument definitions for `ocptv-demo`.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `list` | Print the names of the bundled demos |
//! | `run <name>...` | Run the named demos in order |
//! | `all` | Run every demo, each preceded by a banner |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--utc-offset` | `0` | Display timezone as whole hours east of UTC |
//! | `--local-time` | `false` | Use the system's local offset for timestamps |
//! | `--no-runtime-checks` | `false` | Skip type checks before serialization |
//! | `--output` | stdout | Write the NDJSON stream to a file (truncated first) |
//! | `--validate` | `false` | Validate each demo's stream before writing it |
//!
//! # Examples
//!
//! ```bash
//! ocptv-demo list
//! ocptv-demo run measurement_series --utc-offset -2
//! ocptv-demo all --validate --output /tmp/ocptv.ndjson
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Runs demo programs producing OCP Test & Validation output.
#[derive(Debug, Parser)]
#[command(
    name = "ocptv-demo",
    version,
    about = "Demo programs for OCP Test & Validation structured output"
)]
pub struct Cli {
    /// Display timezone as whole hours east of UTC (e.g. -2).
    #[arg(
        long,
        global = true,
        allow_negative_numbers = true,
        conflicts_with = "local_time"
    )]
    pub utc_offset: Option<i8>,

    /// Render timestamps in the local system offset.
    #[arg(long, global = true, default_value_t = false)]
    pub local_time: bool,

    /// Disable runtime type checks.
    #[arg(long, global = true, default_value_t = false)]
    pub no_runtime_checks: bool,

    /// Write output to this file instead of stdout.
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Capture each demo's output and validate the stream before writing it.
    #[arg(long, global = true, default_value_t = false)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the bundled demos.
    List,
    /// Run the named demos.
    Run {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Run every demo.
    All,
}
