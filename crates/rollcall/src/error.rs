//! Error types for rollcall.
//!
//! This module defines all error types used throughout the rollcall crate,
//! providing detailed context for debugging and user-friendly error messages.
//!
//! Malformed QR content is not an error: it is the ordinary
//! [`Decoded::Invalid`](crate::payload::Decoded::Invalid) branch.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Ledger Errors ===
    /// The ledger artifact exists but could not be parsed.
    #[error("ledger at {path} is unreadable: {message}")]
    LedgerCorrupt {
        /// Path to the ledger file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// An unreadable ledger could not be moved aside to its backup name.
    #[error("failed to back up unreadable ledger {path} to {backup}: {source}")]
    LedgerBackup {
        /// Path to the ledger file.
        path: PathBuf,
        /// Intended backup path.
        backup: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be written. The append was rolled back.
    #[error("failed to persist ledger to {path}: {source}")]
    PersistenceFailure {
        /// Path to the ledger file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record for this student and day is already in the ledger.
    #[error("student {student_id} is already marked on {date}")]
    DuplicateRecord {
        /// The student identifier.
        student_id: String,
        /// The calendar day.
        date: NaiveDate,
    },

    // === Payload Errors ===
    /// A value cannot be carried in a QR payload.
    #[error("cannot encode {field} {value:?}: {reason}")]
    PayloadField {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    // === Scanning Errors ===
    /// The frame source could not be opened.
    #[error("could not open frame source {device}: {message}")]
    DeviceUnavailable {
        /// Name or path of the device.
        device: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Roster Errors ===
    /// The roster file could not be read.
    #[error("failed to read roster {path}: {message}")]
    Roster {
        /// Path to the roster file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV output failed outside of the ledger.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a ledger corruption error.
    #[must_use]
    pub fn ledger_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LedgerCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a device unavailable error.
    #[must_use]
    pub fn device_unavailable(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a failed ledger write.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::PersistenceFailure { .. })
    }

    /// Check if this error means the frame source is gone.
    #[must_use]
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, Self::DeviceUnavailable { .. })
    }
}
