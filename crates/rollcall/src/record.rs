//! Attendance records.
//!
//! One record says a student was present on a calendar day. The ledger holds
//! at most one record per `(student_id, date)`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::ledger::schema::LedgerRow;
use crate::payload::Identity;

/// Source tag written for marks captured from a camera.
pub const DEFAULT_SOURCE: &str = "QR Webcam";

/// A single attendance mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "LedgerRow")]
pub struct AttendanceRecord {
    /// When the mark was made, second precision.
    pub timestamp: NaiveDateTime,
    /// Calendar day of the mark. This is the dedup key.
    pub date: NaiveDate,
    /// Time of day of the mark, for display.
    pub time: NaiveTime,
    /// The student identifier, exactly as scanned.
    pub student_id: String,
    /// The student's display name.
    pub name: String,
    /// How the mark was captured.
    pub source: String,
}

impl AttendanceRecord {
    /// Create a record for `identity` marked at `at`.
    ///
    /// Sub-second precision is dropped so the record matches what the ledger
    /// file stores.
    #[must_use]
    pub fn new(identity: &Identity, at: NaiveDateTime, source: impl Into<String>) -> Self {
        let timestamp = at.with_nanosecond(0).unwrap_or(at);
        Self {
            timestamp,
            date: timestamp.date(),
            time: timestamp.time(),
            student_id: identity.student_id.clone(),
            name: identity.name.clone(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            student_id: "101".to_string(),
            name: "Arun Kumar".to_string(),
        }
    }

    #[test]
    fn test_new_derives_date_and_time() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_milli_opt(9, 30, 5, 750)
            .unwrap();
        let record = AttendanceRecord::new(&identity(), at, DEFAULT_SOURCE);

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(record.time, NaiveTime::from_hms_opt(9, 30, 5).unwrap());
        assert_eq!(record.timestamp.nanosecond(), 0);
        assert_eq!(record.source, "QR Webcam");
    }

    #[test]
    fn test_serializes_in_ledger_format() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        let record = AttendanceRecord::new(&identity(), at, DEFAULT_SOURCE);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["timestamp"], "2024-01-15 09:30:05");
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["time"], "09:30:05");
        assert_eq!(json["student_id"], "101");
    }
}
