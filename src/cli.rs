//! CLI argument parsing for Huella

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::cacheline::DEFAULT_LINE_BYTES;
use crate::capacity::{DEFAULT_MAX_INSTRUCTIONS, DEFAULT_MAX_RECORDS};

/// Ranking key for the report table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RankBy {
    /// Combined unique working-set size (default)
    Wss,
    /// Raw access count (reads + writes)
    Accesses,
}

#[derive(Parser, Debug)]
#[command(name = "huella")]
#[command(version)]
#[command(about = "Pure Rust working set size estimator for memory access traces", long_about = None)]
pub struct Cli {
    /// Trace file to replay ("-" reads from standard input)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Write the report to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Cache line size in bytes (must be a power of two)
    #[arg(long = "line-bytes", value_name = "BYTES", default_value_t = DEFAULT_LINE_BYTES)]
    pub line_bytes: u64,

    /// Capacity of each access record store
    #[arg(long = "max-records", value_name = "N", default_value_t = DEFAULT_MAX_RECORDS)]
    pub max_records: usize,

    /// Instruction ceiling before early exit
    #[arg(long = "max-instructions", value_name = "N", default_value_t = DEFAULT_MAX_INSTRUCTIONS)]
    pub max_instructions: u64,

    /// Ranking key for the report table
    #[arg(long = "rank-by", value_enum, default_value = "wss")]
    pub rank_by: RankBy,

    /// Report only functions whose name matches REGEX
    #[arg(long = "filter", value_name = "REGEX")]
    pub filter: Option<String>,

    /// Attribute the whole program to a single unit, ignoring routine records
    #[arg(long = "flat")]
    pub flat: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
