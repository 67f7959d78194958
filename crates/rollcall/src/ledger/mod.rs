//! The attendance ledger.
//!
//! The ledger is loaded fully into memory and rewritten in full on every
//! append. Writes go to a temporary file in the same directory which is then
//! renamed over the ledger, so readers only ever see a complete file.
//!
//! A ledger that cannot be parsed is moved aside to
//! `<stem>_backup_<unix-epoch-seconds>.<ext>` and replaced by an empty one.

pub mod schema;

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::record::AttendanceRecord;

use schema::{LedgerRow, COLUMNS};

/// In-memory view of the attendance ledger, bound to its file.
#[derive(Debug)]
pub struct Ledger {
    /// Path to the ledger file.
    path: PathBuf,
    /// Records in file order.
    records: Vec<AttendanceRecord>,
    /// `(student_id, date)` pairs present in `records`.
    marked: HashSet<(String, NaiveDate)>,
}

impl Ledger {
    /// Create an empty ledger bound to `path` without touching the disk.
    ///
    /// The file is created on the first append.
    #[must_use]
    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
            marked: HashSet::new(),
        }
    }

    /// Load the ledger at `path`.
    ///
    /// A missing or zero-length file gives an empty ledger. A file that
    /// cannot be parsed is renamed to a timestamped backup and an empty
    /// ledger is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be opened, or if an
    /// unreadable file cannot be moved to its backup name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut ledger = Self::empty(path);

        match Self::read(path) {
            Ok(records) => {
                for record in records {
                    ledger
                        .marked
                        .insert((record.student_id.clone(), record.date));
                    ledger.records.push(record);
                }
                debug!(
                    "Loaded {} attendance records from {}",
                    ledger.records.len(),
                    path.display()
                );
            }
            Err(Error::LedgerCorrupt { message, .. }) => {
                let backup = Self::move_aside(path)?;
                warn!(
                    "Ledger {} is unreadable ({}); moved it to {} and started a new one",
                    path.display(),
                    message,
                    backup.display()
                );
            }
            Err(e) => return Err(e),
        }

        Ok(ledger)
    }

    /// Parse the ledger file.
    fn read(path: &Path) -> Result<Vec<AttendanceRecord>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| Error::ledger_corrupt(path, e.to_string()))?
            .clone();
        if headers.iter().ne(COLUMNS) {
            return Err(Error::ledger_corrupt(
                path,
                format!("unexpected header {:?}", headers.iter().collect::<Vec<_>>()),
            ));
        }

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<LedgerRow>().enumerate() {
            let line = index + 2;
            let row = row.map_err(|e| Error::ledger_corrupt(path, format!("row {line}: {e}")))?;
            let record = AttendanceRecord::try_from(row)
                .map_err(|message| Error::ledger_corrupt(path, format!("row {line}: {message}")))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rename an unreadable ledger out of the way.
    fn move_aside(path: &Path) -> Result<PathBuf> {
        let epoch = Utc::now().timestamp();
        let mut backup = backup_path(path, epoch, 0);
        let mut attempt = 0;
        while backup.exists() {
            attempt += 1;
            backup = backup_path(path, epoch, attempt);
        }

        std::fs::rename(path, &backup).map_err(|source| Error::LedgerBackup {
            path: path.to_path_buf(),
            backup: backup.clone(),
            source,
        })?;
        Ok(backup)
    }

    /// Get the path to the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if `student_id` already has a record on `date`.
    #[must_use]
    pub fn is_marked(&self, student_id: &str, date: NaiveDate) -> bool {
        self.marked.contains(&(student_id.to_string(), date))
    }

    /// Append a record and rewrite the ledger file.
    ///
    /// If the write fails the record is dropped again, so the in-memory view
    /// always matches the last successful write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] if the student is already marked on
    /// that day, or [`Error::PersistenceFailure`] if the file cannot be
    /// written.
    pub fn append(&mut self, record: AttendanceRecord) -> Result<()> {
        if self.is_marked(&record.student_id, record.date) {
            return Err(Error::DuplicateRecord {
                student_id: record.student_id,
                date: record.date,
            });
        }

        let key = (record.student_id.clone(), record.date);
        self.records.push(record);

        if let Err(source) = self.persist() {
            self.records.pop();
            error!(
                "Failed to write ledger {}: {}; append rolled back",
                self.path.display(),
                source
            );
            return Err(Error::PersistenceFailure {
                path: self.path.clone(),
                source,
            });
        }

        debug!(
            "Ledger {} now holds {} records",
            self.path.display(),
            self.records.len()
        );
        self.marked.insert(key);
        Ok(())
    }

    /// Write every record to a temporary file, then rename it over the ledger.
    fn persist(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer.write_record(COLUMNS)?;
            for record in &self.records {
                writer.serialize(LedgerRow::from(record))?;
            }
            writer.flush()?;
        }
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        sync_dir(dir)
    }

    /// All records, in the order they were marked.
    #[must_use]
    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Records marked on `date`.
    pub fn records_on(&self, date: NaiveDate) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.iter().filter(move |r| r.date == date)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Summary figures for the ledger.
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        let students: BTreeSet<&str> = self.records.iter().map(|r| r.student_id.as_str()).collect();
        let days: BTreeSet<NaiveDate> = self.records.iter().map(|r| r.date).collect();

        LedgerStats {
            total_records: self.records.len(),
            distinct_students: students.len(),
            distinct_days: days.len(),
            first_date: days.first().copied(),
            last_date: days.last().copied(),
        }
    }
}

/// Statistics about the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Total number of records.
    pub total_records: usize,
    /// Number of different students ever marked.
    pub distinct_students: usize,
    /// Number of different days with at least one mark.
    pub distinct_days: usize,
    /// Earliest day with a mark.
    pub first_date: Option<NaiveDate>,
    /// Latest day with a mark.
    pub last_date: Option<NaiveDate>,
}

/// Flush a rename in `dir` to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Backup name for an unreadable ledger: `<stem>_backup_<epoch>[_<n>].<ext>`.
#[must_use]
pub fn backup_path(path: &Path, epoch: i64, attempt: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "ledger".into(), |s| s.to_string_lossy());
    let mut name = if attempt > 0 {
        format!("{stem}_backup_{epoch}_{attempt}")
    } else {
        format!("{stem}_backup_{epoch}")
    };
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}
