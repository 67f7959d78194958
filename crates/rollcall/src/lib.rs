//! `rollcall` - QR code attendance with per-day deduplication
//!
//! This library decodes student badge payloads, decides whether each scan is
//! a new attendance mark, and keeps the attendance ledger durable across
//! restarts and recoverable when the file is damaged.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod payload;
pub mod processor;
pub mod record;
pub mod roster;
pub mod session;

pub use cache::SessionCache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerStats};
pub use logging::init_logging;
pub use notify::{Notifier, SilentNotifier, TerminalBell};
pub use payload::{decode, encode, Decoded, Identity};
pub use processor::{DecodedSymbol, Point, ScanOutcome, ScanProcessor, ScanStatus};
pub use record::AttendanceRecord;
pub use session::{FrameSource, ScanSession, SessionSummary, SymbolDecoder};
