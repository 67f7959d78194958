//! The scanning loop.
//!
//! A session pulls frames from a [`FrameSource`], asks a [`SymbolDecoder`]
//! for the symbols in each frame, and feeds them through a
//! [`ScanProcessor`]. Each frame is finished before the next one is read, so
//! the loop can stop at any frame boundary.
//!
//! Camera capture and QR decoding live outside this crate. The line-based
//! source and tab-separated decoder here let a session replay decoded text,
//! one frame per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, StdinLock};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::processor::{DecodedSymbol, ScanOutcome, ScanProcessor, ScanStatus};

/// Produces frames until it runs dry.
pub trait FrameSource {
    /// What a frame looks like.
    type Frame;

    /// Read the next frame, or `None` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails mid-stream.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// Finds symbols in a frame.
pub trait SymbolDecoder<F> {
    /// All symbols found in `frame`; possibly none.
    fn decode(&self, frame: &F) -> Vec<DecodedSymbol>;
}

/// Reads one frame per text line.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl LineSource<BufReader<File>> {
    /// Open a file of decoded lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::device_unavailable(path.display().to_string(), e.to_string()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl LineSource<StdinLock<'static>> {
    /// Read decoded lines from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> FrameSource for LineSource<R> {
    type Frame = String;

    fn next_frame(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        // Bytes that are not UTF-8 still make a frame; they just never decode.
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Treats each TAB-separated piece of a line as one symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabSeparatedDecoder;

impl SymbolDecoder<String> for TabSeparatedDecoder {
    fn decode(&self, frame: &String) -> Vec<DecodedSymbol> {
        frame
            .split('\t')
            .filter(|piece| !piece.trim().is_empty())
            .map(DecodedSymbol::new)
            .collect()
    }
}

/// Counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Frames read.
    pub frames: u64,
    /// Symbols decoded across all frames.
    pub symbols: u64,
    /// Students marked during the session.
    pub newly_marked: u64,
    /// Symbols for students already marked today.
    pub already_marked: u64,
    /// Symbols that were not badges.
    pub invalid: u64,
    /// New marks that could not be written.
    pub failures: u64,
}

impl SessionSummary {
    fn count(&mut self, status: ScanStatus) {
        match status {
            ScanStatus::Invalid => self.invalid += 1,
            ScanStatus::AlreadyMarked => self.already_marked += 1,
            ScanStatus::NewlyMarked => self.newly_marked += 1,
        }
    }
}

/// Drives frames through a processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSession {
    max_frames: Option<u64>,
}

impl ScanSession {
    /// A session that runs until the source is exhausted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `max_frames` frames. Zero means no limit.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = (max_frames > 0).then_some(max_frames);
        self
    }

    /// Run the loop.
    ///
    /// `on_outcome` sees every decision, in order. A failed ledger write is
    /// logged and counted, and the loop carries on so the student can be
    /// marked on a later frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame source fails.
    pub fn run<S, D, C, F>(
        &self,
        source: &mut S,
        decoder: &D,
        processor: &mut ScanProcessor<C>,
        ledger: &mut Ledger,
        mut on_outcome: F,
    ) -> Result<SessionSummary>
    where
        S: FrameSource,
        D: SymbolDecoder<S::Frame>,
        C: Clock,
        F: FnMut(&ScanOutcome),
    {
        let mut summary = SessionSummary::default();

        while self.max_frames.map_or(true, |max| summary.frames < max) {
            let Some(frame) = source.next_frame()? else {
                debug!("Frame source exhausted");
                break;
            };
            summary.frames += 1;

            let symbols = decoder.decode(&frame);
            summary.symbols += symbols.len() as u64;

            for result in processor.process_frame(ledger, &symbols) {
                match result {
                    Ok(outcome) => {
                        summary.count(outcome.status);
                        on_outcome(&outcome);
                    }
                    Err(e) => {
                        summary.failures += 1;
                        error!("Could not record attendance: {}", e);
                    }
                }
            }
        }

        info!(
            "Session ended after {} frames: {} marked, {} already marked, {} invalid, {} failed",
            summary.frames,
            summary.newly_marked,
            summary.already_marked,
            summary.invalid,
            summary.failures
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;

    fn processor() -> ScanProcessor<FixedClock> {
        ScanProcessor::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
    }

    fn source(text: &str) -> LineSource<Cursor<Vec<u8>>> {
        LineSource::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[derive(Debug)]
    struct BrokenSource;

    impl FrameSource for BrokenSource {
        type Frame = String;

        fn next_frame(&mut self) -> Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "camera unplugged").into())
        }
    }

    #[test]
    fn test_line_source_frames() {
        let mut src = source("a\r\n\nb");
        assert_eq!(src.next_frame().unwrap().as_deref(), Some("a"));
        assert_eq!(src.next_frame().unwrap().as_deref(), Some(""));
        assert_eq!(src.next_frame().unwrap().as_deref(), Some("b"));
        assert_eq!(src.next_frame().unwrap(), None);
    }

    #[test]
    fn test_line_source_keeps_non_utf8_lines() {
        let mut src = LineSource::new(Cursor::new(b"\xff\xfe x\nok\n".to_vec()));
        let frame = src.next_frame().unwrap().unwrap();
        assert!(frame.ends_with(" x"));
        assert_eq!(src.next_frame().unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_line_source_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LineSource::open(dir.path().join("nope.txt")).unwrap_err();
        assert!(err.is_device_unavailable());
    }

    #[test]
    fn test_tab_separated_decoder() {
        let symbols = TabSeparatedDecoder.decode(&"x\t\t y \t".to_string());
        assert_eq!(
            symbols,
            vec![DecodedSymbol::new("x"), DecodedSymbol::new(" y ")]
        );
        assert!(TabSeparatedDecoder.decode(&String::new()).is_empty());
    }

    #[test]
    fn test_session_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("attendance.csv")).unwrap();
        let mut processor = processor();
        let mut src = source(
            "student_id=101|name=Arun Kumar\n\
             student_id=101|name=Arun Kumar\tstudent_id=102|name=Mei Lin\n\
             \n\
             hello world\n",
        );

        let mut labels = Vec::new();
        let summary = ScanSession::new()
            .run(
                &mut src,
                &TabSeparatedDecoder,
                &mut processor,
                &mut ledger,
                |outcome| labels.push(outcome.label.clone()),
            )
            .unwrap();

        assert_eq!(
            summary,
            SessionSummary {
                frames: 4,
                symbols: 4,
                newly_marked: 2,
                already_marked: 1,
                invalid: 1,
                failures: 0,
            }
        );
        assert_eq!(
            labels,
            [
                "Marked: 101 - Arun Kumar",
                "101 - Arun Kumar (Already Marked Today)",
                "Marked: 102 - Mei Lin",
                "Invalid QR",
            ]
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_session_non_utf8_frame_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("attendance.csv")).unwrap();
        let mut processor = processor();
        let mut bytes = b"\xff\xfe garbage\n".to_vec();
        bytes.extend_from_slice(b"student_id=101|name=Arun Kumar\n");
        let mut src = LineSource::new(Cursor::new(bytes));

        let summary = ScanSession::new()
            .run(&mut src, &TabSeparatedDecoder, &mut processor, &mut ledger, |_| {})
            .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.newly_marked, 1);
        assert!(ledger.is_marked("101", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
    }

    #[test]
    fn test_session_max_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("attendance.csv")).unwrap();
        let mut processor = processor();
        let mut src = source("student_id=1|name=A\nstudent_id=2|name=B\nstudent_id=3|name=C\n");

        let summary = ScanSession::new()
            .with_max_frames(2)
            .run(&mut src, &TabSeparatedDecoder, &mut processor, &mut ledger, |_| {})
            .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.is_marked("3", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
    }

    #[test]
    fn test_session_counts_write_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut ledger = Ledger::empty(blocker.join("attendance.csv"));
        let mut processor = processor();
        let mut src = source("student_id=1|name=A\nstudent_id=1|name=A\n");

        let summary = ScanSession::new()
            .run(&mut src, &TabSeparatedDecoder, &mut processor, &mut ledger, |_| {})
            .unwrap();

        assert_eq!(summary.failures, 2);
        assert_eq!(summary.newly_marked, 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_session_source_error_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("attendance.csv")).unwrap();
        let mut processor = processor();

        let result = ScanSession::new().run(
            &mut BrokenSource,
            &TabSeparatedDecoder,
            &mut processor,
            &mut ledger,
            |_| {},
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
