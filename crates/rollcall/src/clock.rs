//! Time sources.
//!
//! The processor never samples the wall clock directly; it asks a [`Clock`],
//! so tests and replays can pin "today".

use std::cell::Cell;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

/// Supplies the current local date and time.
pub trait Clock {
    /// Current local timestamp, second precision.
    fn now(&self) -> NaiveDateTime;

    /// Current calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Create a clock frozen at midday on `date`.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
