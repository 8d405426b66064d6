//! Engine message log: append-only, sequence-numbered, drained by a display.
//!
//! The controller writes one entry per engine message. The writer retains
//! the full history for the session; a paired reader receives the same
//! entries over a channel so a log view can print them as they arrive.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

#[derive(Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Monotonically increasing sequence number.
    pub seq: u64,
    pub message: String,
}

/// Controller-side writer. History is never trimmed.
pub struct LogWriter {
    tx: Sender<Arc<LogEntry>>,
    history: Vec<Arc<LogEntry>>,
    next_seq: u64,
}

impl LogWriter {
    /// Create a paired (writer, reader).
    pub fn new() -> (Self, LogReader) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let writer = Self {
            tx,
            history: Vec::new(),
            next_seq: 0,
        };
        (writer, LogReader { rx })
    }

    pub fn append(&mut self, message: impl Into<String>) -> Arc<LogEntry> {
        let entry = Arc::new(LogEntry {
            seq: self.next_seq,
            message: message.into(),
        });
        self.next_seq += 1;

        // The display may have gone away; history still keeps the entry.
        if self.tx.send(Arc::clone(&entry)).is_err() {
            log::trace!(target: "playback", "log reader gone (seq {})", entry.seq);
        }

        self.history.push(Arc::clone(&entry));
        entry
    }

    pub fn history(&self) -> &[Arc<LogEntry>] {
        &self.history
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

/// Display-side reader.
pub struct LogReader {
    rx: Receiver<Arc<LogEntry>>,
}

impl LogReader {
    /// Every entry appended since the last drain, oldest first.
    pub fn drain(&self) -> Vec<Arc<LogEntry>> {
        self.rx.try_iter().collect()
    }
}
