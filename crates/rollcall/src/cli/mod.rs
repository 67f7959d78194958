//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    ConfigCommand, DecodeCommand, EncodeCommand, ListCommand, MarkCommand, OutputFormat,
    RosterCommand, ScanCommand, StatusCommand,
};

/// rollcall - QR code attendance, once per student per day
///
/// Reads decoded badge payloads, records each student at most once per
/// calendar day, and keeps the attendance ledger safe across restarts.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the attendance ledger (overrides configuration)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mark attendance from a stream of decoded frames
    Scan(ScanCommand),

    /// Mark attendance from a single payload
    Mark(MarkCommand),

    /// Print the badge payload for a student
    Encode(EncodeCommand),

    /// Check a payload and show who it identifies
    Decode(DecodeCommand),

    /// List attendance records
    List(ListCommand),

    /// Show ledger status
    Status(StatusCommand),

    /// Generate badge payloads from a roster
    Roster(RosterCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
