//! Side effects fired when a student is newly marked.

use std::io::Write;

use crate::processor::ScanOutcome;

/// Something to do when a new mark lands in the ledger.
///
/// Notifiers are best effort: they cannot fail the mark.
pub trait Notifier: std::fmt::Debug {
    /// Called once per newly marked student.
    fn notify(&self, outcome: &ScanOutcome);
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _outcome: &ScanOutcome) {}
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn notify(&self, _outcome: &ScanOutcome) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}
