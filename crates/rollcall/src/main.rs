//! `rollcall` - CLI for rollcall
//!
//! This binary marks attendance from decoded QR payloads and lets you inspect
//! the attendance ledger.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rollcall::cli::{
    Cli, Command, ConfigCommand, DecodeCommand, ListCommand, MarkCommand, OutputFormat,
    RosterCommand, ScanCommand,
};
use rollcall::ledger::schema::{DATE_FORMAT, TIME_FORMAT};
use rollcall::session::{LineSource, TabSeparatedDecoder};
use rollcall::{
    init_logging, roster, AttendanceRecord, Clock, Config, Decoded, Error, Ledger, ScanOutcome,
    ScanProcessor, ScanSession, SystemClock, TerminalBell,
};

/// Exit status when the frame source cannot be opened.
const EXIT_DEVICE_UNAVAILABLE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            match e.downcast_ref::<Error>() {
                Some(err) if err.is_device_unavailable() => {
                    ExitCode::from(EXIT_DEVICE_UNAVAILABLE)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;
    if let Some(ledger) = cli.ledger {
        config.ledger.path = Some(ledger);
    }

    // Execute the command
    match cli.command {
        Command::Scan(cmd) => handle_scan(&config, &cmd),
        Command::Mark(cmd) => handle_mark(&config, &cmd),
        Command::Encode(cmd) => {
            println!("{}", rollcall::encode(&cmd.student_id, &cmd.name)?);
            Ok(())
        }
        Command::Decode(cmd) => handle_decode(&cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Roster(cmd) => handle_roster(&cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn build_processor(config: &Config, source: Option<&String>, beep: bool) -> ScanProcessor<SystemClock> {
    let tag = source.unwrap_or(&config.scan.source_tag);
    let processor = ScanProcessor::new(SystemClock).with_source(tag.as_str());
    if beep || config.scan.beep {
        processor.with_notifier(Box::new(TerminalBell))
    } else {
        processor
    }
}

fn print_outcome(outcome: &ScanOutcome, json: bool) {
    if json {
        match serde_json::to_string(outcome) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    } else {
        println!("[{}] {}", outcome.status, outcome.label);
    }
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> anyhow::Result<()> {
    // Open the frame source first: without it there is no session
    let mut file_source = match &cmd.input {
        Some(path) => Some(LineSource::open(path)?),
        None => None,
    };

    let ledger_path = config.ledger_path();
    let mut ledger = Ledger::load(&ledger_path)
        .with_context(|| format!("loading ledger {}", ledger_path.display()))?;
    info!(
        "Scanning into {} ({} records on file)",
        ledger_path.display(),
        ledger.len()
    );

    let mut processor = build_processor(config, cmd.source.as_ref(), cmd.beep);
    let session = ScanSession::new()
        .with_max_frames(cmd.max_frames.or(config.max_frames()).unwrap_or(0));
    let on_outcome = |outcome: &ScanOutcome| print_outcome(outcome, cmd.json);

    let summary = match file_source.as_mut() {
        Some(source) => session.run(
            source,
            &TabSeparatedDecoder,
            &mut processor,
            &mut ledger,
            on_outcome,
        )?,
        None => session.run(
            &mut LineSource::stdin(),
            &TabSeparatedDecoder,
            &mut processor,
            &mut ledger,
            on_outcome,
        )?,
    };

    if cmd.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("Frames:          {}", summary.frames);
        println!("Newly marked:    {}", summary.newly_marked);
        println!("Already marked:  {}", summary.already_marked);
        println!("Invalid:         {}", summary.invalid);
        println!("Write failures:  {}", summary.failures);
        println!("Saved attendance to {}", ledger.path().display());
    }
    Ok(())
}

fn handle_mark(config: &Config, cmd: &MarkCommand) -> anyhow::Result<()> {
    let mut ledger = Ledger::load(config.ledger_path())?;
    let mut processor = build_processor(config, cmd.source.as_ref(), false);
    let outcome = processor.process(&mut ledger, &cmd.payload)?;
    print_outcome(&outcome, cmd.json);
    Ok(())
}

fn handle_decode(cmd: &DecodeCommand) -> anyhow::Result<()> {
    let decoded = rollcall::decode(&cmd.payload);
    if cmd.json {
        let value = match &decoded {
            Decoded::Valid(identity) => serde_json::json!({
                "valid": true,
                "student_id": identity.student_id,
                "name": identity.name,
            }),
            Decoded::Invalid => serde_json::json!({ "valid": false }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match decoded {
            Decoded::Valid(identity) => {
                println!("Student ID:  {}", identity.student_id);
                println!("Name:        {}", identity.name);
            }
            Decoded::Invalid => println!("{}", rollcall::processor::INVALID_LABEL),
        }
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let ledger = Ledger::load(config.ledger_path())?;
    let records: Vec<&AttendanceRecord> = if cmd.all {
        ledger.records().iter().collect()
    } else {
        ledger
            .records_on(cmd.date.unwrap_or_else(|| SystemClock.today()))
            .collect()
    };

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Plain => {
            for r in &records {
                println!(
                    "{} {} {} - {} ({})",
                    r.date.format(DATE_FORMAT),
                    r.time.format(TIME_FORMAT),
                    r.student_id,
                    r.name,
                    r.source
                );
            }
        }
        OutputFormat::Table => {
            let id_width = records
                .iter()
                .map(|r| r.student_id.chars().count())
                .max()
                .unwrap_or(0)
                .max("STUDENT ID".len());
            let name_width = records
                .iter()
                .map(|r| r.name.chars().count())
                .max()
                .unwrap_or(0)
                .max("NAME".len());

            println!(
                "{:<10}  {:<8}  {:<id_width$}  {:<name_width$}  SOURCE",
                "DATE", "TIME", "STUDENT ID", "NAME"
            );
            for r in &records {
                println!(
                    "{:<10}  {:<8}  {:<id_width$}  {:<name_width$}  {}",
                    r.date.format(DATE_FORMAT).to_string(),
                    r.time.format(TIME_FORMAT).to_string(),
                    r.student_id,
                    r.name,
                    r.source
                );
            }
            println!();
            println!("{} record(s)", records.len());
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let ledger = Ledger::load(config.ledger_path())?;
    let stats = ledger.stats();
    let today = SystemClock.today();
    let marked_today = ledger.records_on(today).count();

    if json {
        let status = serde_json::json!({
            "ledger_path": ledger.path(),
            "ledger_exists": ledger.path().exists(),
            "marked_today": marked_today,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let date_or_dash = |d: Option<chrono::NaiveDate>| {
            d.map_or_else(|| "-".to_string(), |d| d.format(DATE_FORMAT).to_string())
        };
        println!("rollcall status");
        println!("---------------");
        println!("Ledger:            {}", ledger.path().display());
        println!("Records:           {}", stats.total_records);
        println!("Students:          {}", stats.distinct_students);
        println!("Days:              {}", stats.distinct_days);
        println!("First day:         {}", date_or_dash(stats.first_date));
        println!("Last day:          {}", date_or_dash(stats.last_date));
        println!("Marked today:      {marked_today}");
    }
    Ok(())
}

fn handle_roster(cmd: &RosterCommand) -> anyhow::Result<()> {
    let roster = roster::load_roster(&cmd.roster)?;

    match &cmd.manifest {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating manifest {}", path.display()))?;
            roster::write_manifest(&roster.jobs, BufWriter::new(file))?;
            info!("Wrote manifest to {}", path.display());
        }
        None => roster::write_manifest(&roster.jobs, io::stdout().lock())?,
    }

    info!(
        "{} badge(s) ready, {} row(s) skipped",
        roster.jobs.len(),
        roster.skipped
    );
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Ledger]");
                println!("  Path:          {}", config.ledger_path().display());
                println!();
                println!("[Scan]");
                println!("  Source tag:    {}", config.scan.source_tag);
                println!("  Beep:          {}", config.scan.beep);
                println!(
                    "  Max frames:    {}",
                    config
                        .max_frames()
                        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            validate_config_file(&path)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn validate_config_file(path: &Path) -> anyhow::Result<Config> {
    Config::load_from(Some(path.to_path_buf()))
        .with_context(|| format!("configuration {} is invalid", path.display()))
}
