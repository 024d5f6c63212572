// src/gps/tokenizer.rs
//! Splits a raw serial byte stream into candidate sentence lines

use std::collections::VecDeque;
use std::str::Utf8Error;

/// Default upper bound on a single line. NMEA itself caps sentences at 82
/// characters; the extra room tolerates receivers that run long.
pub const DEFAULT_MAX_LINE_LEN: usize = 128;

/// One terminated line of input with the terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(Vec<u8>);

impl RawLine {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the line as text. Sentences are ASCII, so anything that is not
    /// valid UTF-8 is line noise.
    pub fn as_str(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

/// Incremental line splitter.
///
/// Bytes are appended with [`LineSplitter::push`]; completed lines are then
/// pulled out through the `Iterator` impl. Both `\r` and `\n` terminate a
/// line and empty lines are dropped, so CRLF, LF and bare CR all work.
///
/// A line that grows past `max_len` without a terminator is thrown away
/// together with everything up to the next terminator.
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    ready: VecDeque<RawLine>,
    max_len: usize,
    discarding: bool,
    overflows: u64,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_len),
            ready: VecDeque::new(),
            max_len: max_len.max(1),
            discarding: false,
            overflows: 0,
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.terminate();
            } else if self.discarding {
                continue;
            } else if self.pending.len() >= self.max_len {
                self.pending.clear();
                self.discarding = true;
                self.overflows += 1;
            } else {
                self.pending.push(byte);
            }
        }
    }

    fn terminate(&mut self) {
        if self.discarding {
            self.discarding = false;
        } else if !self.pending.is_empty() {
            let line = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_len));
            self.ready.push_back(RawLine(line));
        }
    }

    /// Number of bytes buffered for the current, unterminated line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of over-long lines discarded so far.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for LineSplitter {
    type Item = RawLine;

    fn next(&mut self) -> Option<RawLine> {
        self.ready.pop_front()
    }
}
