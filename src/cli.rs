//! CLI argument parsing for cycletrace

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::modulo::RetryPolicy;

/// Output format for replayed reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// Compact ASCII JSON, one report per line
    Json,
    /// Hex-encoded MessagePack, one report per line
    Packed,
}

#[derive(Parser, Debug)]
#[command(name = "cycletrace")]
#[command(version)]
#[command(about = "Replay recorded hook streams into section timing reports", long_about = None)]
pub struct Cli {
    /// Recorded hook stream (JSON Lines)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// TOML file with hook bindings and lookup tables
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Override how divisions from retried sections are reported
    #[arg(long = "retry-policy", value_enum)]
    pub retry_policy: Option<RetryPolicy>,

    /// Override the number of section indices per path
    #[arg(long = "section-count", value_name = "N")]
    pub section_count: Option<u8>,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}
