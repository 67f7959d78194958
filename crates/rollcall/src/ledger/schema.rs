//! On-disk layout of the attendance ledger.
//!
//! The ledger is a CSV file with a fixed header. Every column is text;
//! `student_id` in particular is never treated as a number so leading zeros
//! survive.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::record::AttendanceRecord;

/// Column names, in file order.
pub const COLUMNS: [&str; 6] = ["timestamp", "date", "time", "student_id", "name", "source"];

/// Format of the `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of the `time` column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One ledger row as it appears in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    /// Student identifier.
    pub student_id: String,
    /// Display name.
    pub name: String,
    /// Capture method tag.
    pub source: String,
}

impl From<&AttendanceRecord> for LedgerRow {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            date: record.date.format(DATE_FORMAT).to_string(),
            time: record.time.format(TIME_FORMAT).to_string(),
            student_id: record.student_id.clone(),
            name: record.name.clone(),
            source: record.source.clone(),
        }
    }
}

impl From<AttendanceRecord> for LedgerRow {
    fn from(record: AttendanceRecord) -> Self {
        Self::from(&record)
    }
}

impl TryFrom<LedgerRow> for AttendanceRecord {
    type Error = String;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp {:?}: {e}", row.timestamp))?;
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|e| format!("bad date {:?}: {e}", row.date))?;
        let time = NaiveTime::parse_from_str(&row.time, TIME_FORMAT)
            .map_err(|e| format!("bad time {:?}: {e}", row.time))?;

        if timestamp.date() != date || timestamp.time() != time {
            return Err(format!(
                "date {:?} and time {:?} disagree with timestamp {:?}",
                row.date, row.time, row.timestamp
            ));
        }
        if row.student_id.trim().is_empty() {
            return Err("empty student_id".to_string());
        }

        Ok(Self {
            timestamp,
            date,
            time,
            student_id: row.student_id,
            name: row.name,
            source: row.source,
        })
    }
}
