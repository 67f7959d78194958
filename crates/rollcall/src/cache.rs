//! In-run memory of students already handled today.
//!
//! The same badge stays in view for many consecutive frames. The cache lets
//! the processor skip the ledger lookup for those frames. It is never
//! persisted and never overrides the ledger.

use std::collections::HashSet;

use chrono::NaiveDate;

/// Set of `(student_id, date)` pairs seen during one scanning session.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    seen: HashSet<(String, NaiveDate)>,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the student was already handled on `date` in this session.
    #[must_use]
    pub fn contains(&self, student_id: &str, date: NaiveDate) -> bool {
        // Tuple keys can't borrow, so build the owned key for the lookup.
        self.seen.contains(&(student_id.to_string(), date))
    }

    /// Remember that the student was handled on `date`.
    pub fn insert(&mut self, student_id: &str, date: NaiveDate) {
        self.seen.insert((student_id.to_string(), date));
    }

    /// Number of remembered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been remembered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
