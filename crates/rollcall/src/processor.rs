//! Per-symbol attendance decisions.
//!
//! For every decoded symbol in a frame the processor decides whether the
//! payload is invalid, already marked today, or a new mark. New marks are
//! appended to the ledger before the session cache learns about them, so a
//! failed write leaves the student eligible for a retry on a later frame.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::SessionCache;
use crate::clock::Clock;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::notify::{Notifier, SilentNotifier};
use crate::payload::{self, Decoded, Identity};
use crate::record::{AttendanceRecord, DEFAULT_SOURCE};

/// Label shown for a symbol that is not a student badge.
pub const INVALID_LABEL: &str = "Invalid QR";

/// A corner of a decoded symbol, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// One symbol found in a frame by the external decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    /// The decoded text.
    pub data: String,
    /// Corner geometry, used only for display.
    pub corners: Option<Vec<Point>>,
}

impl DecodedSymbol {
    /// A symbol without geometry.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            corners: None,
        }
    }

    /// A symbol with its corner points.
    #[must_use]
    pub fn with_corners(data: impl Into<String>, corners: Vec<Point>) -> Self {
        Self {
            data: data.into(),
            corners: Some(corners),
        }
    }
}

/// What happened to a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Not a well-formed payload.
    Invalid,
    /// The student was already marked today.
    AlreadyMarked,
    /// The student was marked just now.
    NewlyMarked,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid"),
            Self::AlreadyMarked => write!(f, "already_marked"),
            Self::NewlyMarked => write!(f, "newly_marked"),
        }
    }
}

/// The decision for one symbol, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// Decision.
    pub status: ScanStatus,
    /// Human-readable label.
    pub label: String,
    /// The scanned identity, if the payload was well-formed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Corner geometry passed through from the decoder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners: Option<Vec<Point>>,
}

impl ScanOutcome {
    /// Outcome for a symbol that is not a badge.
    #[must_use]
    pub fn invalid(corners: Option<Vec<Point>>) -> Self {
        Self {
            status: ScanStatus::Invalid,
            label: INVALID_LABEL.to_string(),
            identity: None,
            corners,
        }
    }

    /// Outcome for a student that already has a mark today.
    #[must_use]
    pub fn already_marked(identity: Identity, corners: Option<Vec<Point>>) -> Self {
        Self {
            status: ScanStatus::AlreadyMarked,
            label: format!(
                "{} - {} (Already Marked Today)",
                identity.student_id, identity.name
            ),
            identity: Some(identity),
            corners,
        }
    }

    /// Outcome for a student marked just now.
    #[must_use]
    pub fn newly_marked(identity: Identity, corners: Option<Vec<Point>>) -> Self {
        Self {
            status: ScanStatus::NewlyMarked,
            label: format!("Marked: {} - {}", identity.student_id, identity.name),
            identity: Some(identity),
            corners,
        }
    }

    /// Where a display should draw the label: just above the first corner,
    /// or the top-left of the frame when there is no geometry.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn label_origin(&self) -> (i32, i32) {
        match self.corners.as_deref().and_then(|c| c.first()) {
            Some(p) => (p.x as i32, (p.y as i32).saturating_sub(10)),
            None => (10, 30),
        }
    }
}

/// Turns decoded symbols into attendance decisions.
///
/// The processor owns the session cache and the clock. The ledger is passed
/// in on every call.
#[derive(Debug)]
pub struct ScanProcessor<C: Clock> {
    cache: SessionCache,
    clock: C,
    source: String,
    notifier: Box<dyn Notifier>,
}

impl<C: Clock> ScanProcessor<C> {
    /// Create a processor with an empty session cache, the default source
    /// tag and no notifier.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self {
            cache: SessionCache::new(),
            clock,
            source: DEFAULT_SOURCE.to_string(),
            notifier: Box::new(SilentNotifier),
        }
    }

    /// Set the source tag written on new records.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the notifier fired on new marks.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The session cache.
    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Process a decoded string that has no geometry.
    ///
    /// # Errors
    ///
    /// See [`ScanProcessor::process_symbol`].
    pub fn process(&mut self, ledger: &mut Ledger, data: &str) -> Result<ScanOutcome> {
        self.process_symbol(ledger, &DecodedSymbol::new(data))
    }

    /// Decide what a symbol means and record a new mark if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceFailure`](crate::Error::PersistenceFailure)
    /// if a new mark could not be written. Neither the ledger nor the session
    /// cache change in that case.
    pub fn process_symbol(
        &mut self,
        ledger: &mut Ledger,
        symbol: &DecodedSymbol,
    ) -> Result<ScanOutcome> {
        let corners = symbol.corners.clone();
        let identity = match payload::decode(&symbol.data) {
            Decoded::Valid(identity) => identity,
            Decoded::Invalid => {
                debug!("Ignoring invalid payload {:?}", symbol.data);
                return Ok(ScanOutcome::invalid(corners));
            }
        };

        let now = self.clock.now();
        let today = now.date();

        if self.cache.contains(&identity.student_id, today)
            || ledger.is_marked(&identity.student_id, today)
        {
            self.cache.insert(&identity.student_id, today);
            debug!(
                "Student {} already marked on {}",
                identity.student_id, today
            );
            return Ok(ScanOutcome::already_marked(identity, corners));
        }

        ledger.append(AttendanceRecord::new(&identity, now, self.source.as_str()))?;
        self.cache.insert(&identity.student_id, today);
        info!(
            "Marked {} ({}) present on {}",
            identity.student_id, identity.name, today
        );

        let outcome = ScanOutcome::newly_marked(identity, corners);
        self.notifier.notify(&outcome);
        Ok(outcome)
    }

    /// Process every symbol of one frame, in order.
    ///
    /// A failure on one symbol does not stop the others.
    pub fn process_frame(
        &mut self,
        ledger: &mut Ledger,
        symbols: &[DecodedSymbol],
    ) -> Vec<Result<ScanOutcome>> {
        symbols
            .iter()
            .map(|symbol| self.process_symbol(ledger, symbol))
            .collect()
    }
}
