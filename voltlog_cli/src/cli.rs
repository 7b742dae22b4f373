//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

use voltlog_config::{FileFormat, FilterStrategy, Mode};

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "voltlog", version, about = "Serial ADC voltage logger")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/voltlog_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Operating mode, mirroring `voltlog_config::Mode`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    /// Persist to disk only
    Acquire,
    /// Console plot handoff only, nothing written
    Visualize,
    /// Persist and visualize on one cadence
    Both,
    /// Print each accepted sample
    Print,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Acquire => Mode::Acquire,
            ModeArg::Visualize => Mode::Visualize,
            ModeArg::Both => Mode::Both,
            ModeArg::Print => Mode::Print,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FormatArg {
    /// `timestamp,value` lines
    Text,
    /// Packed little-endian f64 pairs
    Binary,
}

impl From<FormatArg> for FileFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Text => FileFormat::Text,
            FormatArg::Binary => FileFormat::Binary,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FilterArg {
    Savgol,
    Kalman,
}

impl From<FilterArg> for FilterStrategy {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::Savgol => FilterStrategy::Savgol,
            FilterArg::Kalman => FilterStrategy::Kalman,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire, filter, and persist the voltage stream
    Run {
        /// Operating mode (overrides config)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// On-disk format (overrides config)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Seconds between batch flushes (overrides config)
        #[arg(long, value_name = "SECS")]
        flush_interval: Option<u64>,
        /// Serial port (overrides config)
        #[arg(long, value_name = "PORT")]
        port: Option<String>,
        /// Disable filtering regardless of config
        #[arg(long, action = ArgAction::SetTrue)]
        no_filter: bool,
        /// Enable filtering with this strategy (overrides config)
        #[arg(long, value_enum, conflicts_with = "no_filter")]
        filter: Option<FilterArg>,
        /// Stop after this many accepted samples (0 = run until Ctrl-C)
        #[arg(long, value_name = "N", default_value_t = 0)]
        frames: u64,
        /// Directory for day files (overrides config)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Quick health check (transport presence / sim ok)
    SelfCheck,
}
