//! Badge payloads from a class roster.
//!
//! The roster is a CSV file with `student_id` and `name` columns. Each row
//! becomes a [`BadgeJob`]: the payload to put in the QR code and a file name
//! that is safe on every filesystem. Rendering the QR image is left to an
//! external encoder, which reads the manifest written by
//! [`write_manifest`].

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::payload;

/// Extension of the image files the encoder is asked to produce.
pub const BADGE_EXTENSION: &str = "png";

#[derive(Debug, Deserialize)]
struct RosterRow {
    student_id: String,
    name: String,
}

/// One badge to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeJob {
    /// Trimmed student identifier.
    pub student_id: String,
    /// Trimmed display name.
    pub name: String,
    /// Text to encode in the QR symbol.
    pub payload: String,
    /// File name without extension.
    pub file_stem: String,
}

impl BadgeJob {
    /// File name for the rendered badge.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{BADGE_EXTENSION}", self.file_stem)
    }
}

/// Badges generated from a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Badges to render, in roster order.
    pub jobs: Vec<BadgeJob>,
    /// Rows that could not become badges.
    pub skipped: usize,
}

/// Read a roster file.
///
/// # Errors
///
/// Returns [`Error::Roster`] if the file cannot be opened, lacks a required
/// column, or has a malformed row.
pub fn load_roster(path: impl AsRef<Path>) -> Result<Roster> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| roster_error(path, e))?;
    read_roster(file, path)
}

/// Read a roster from any reader. `origin` is used in messages only.
///
/// # Errors
///
/// See [`load_roster`].
pub fn read_roster<R: Read>(reader: R, origin: &Path) -> Result<Roster> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers().map_err(|e| roster_error(origin, e))?;
    for column in ["student_id", "name"] {
        if !headers.iter().any(|h| h == column) {
            return Err(roster_error(origin, format!("missing column {column:?}")));
        }
    }

    let mut roster = Roster::default();
    let mut seen = HashSet::new();

    for (index, row) in reader.deserialize::<RosterRow>().enumerate() {
        let line = index + 2;
        let row = row.map_err(|e| roster_error(origin, format!("row {line}: {e}")))?;

        let payload = match payload::encode(&row.student_id, &row.name) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping roster row {}: {}", line, e);
                roster.skipped += 1;
                continue;
            }
        };

        let student_id = row.student_id.trim().to_string();
        if !seen.insert(student_id.clone()) {
            warn!(
                "Skipping roster row {}: student {} appears more than once",
                line, student_id
            );
            roster.skipped += 1;
            continue;
        }

        let name = row.name.trim().to_string();
        let file_stem = format!("{}_{}", safe_file_stem(&student_id), safe_file_stem(&name));
        debug!("Badge {} -> {}", file_stem, payload);

        roster.jobs.push(BadgeJob {
            student_id,
            name,
            payload,
            file_stem,
        });
    }

    Ok(roster)
}

fn roster_error(path: &Path, message: impl ToString) -> Error {
    Error::Roster {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Replace everything but letters, digits, `-` and `_` with `_`.
#[must_use]
pub fn safe_file_stem(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write a `file,payload` manifest for the external QR encoder.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_manifest<W: Write>(jobs: &[BadgeJob], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["file", "payload"])?;
    for job in jobs {
        writer.write_record([job.file_name().as_str(), job.payload.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
