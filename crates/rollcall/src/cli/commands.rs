//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// File of decoded symbols, one frame per line, symbols separated by TAB
    /// (reads stdin when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Tag written in the source column of new records
    #[arg(short, long)]
    pub source: Option<String>,

    /// Ring the terminal bell when a student is marked
    #[arg(long)]
    pub beep: bool,

    /// Print each decision as a JSON line
    #[arg(short, long)]
    pub json: bool,
}

/// Mark command arguments.
#[derive(Debug, Args)]
pub struct MarkCommand {
    /// Decoded QR payload, e.g. "student_id=101|name=Arun Kumar"
    pub payload: String,

    /// Tag written in the source column of a new record
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Encode command arguments.
#[derive(Debug, Args)]
pub struct EncodeCommand {
    /// Student identifier
    pub student_id: String,

    /// Student name
    pub name: String,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Decoded QR payload
    pub payload: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Day to list, as YYYY-MM-DD (defaults to today)
    #[arg(short, long, conflicts_with = "all")]
    pub date: Option<NaiveDate>,

    /// List every record in the ledger
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Roster command arguments.
#[derive(Debug, Args)]
pub struct RosterCommand {
    /// Roster CSV with student_id and name columns
    pub roster: PathBuf,

    /// Write the file,payload manifest here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
