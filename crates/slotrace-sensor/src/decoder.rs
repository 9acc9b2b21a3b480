//! Line decoder for the sensor protocol
//!
//! The sensor writes one line per start/finish crossing containing `1`.
//! Anything else (noise, partial lines, invalid UTF-8) is ignored. A line
//! split across reads is reassembled before it is judged.

/// Lines longer than this are noise and are dropped up to the next newline
pub const MAX_LINE_LEN: usize = 64;

/// Incremental decoder turning raw bytes into queued pulses
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of the current, unterminated line
    pending: Vec<u8>,
    /// Pulses decoded but not yet taken
    queued: u32,
    /// Current line overflowed and is being skipped
    discarding: bool,
    /// Complete lines that were not pulses
    ignored: u64,
}

impl LineDecoder {
    pub fn new() -> Self {
        LineDecoder::default()
    }

    /// Feed raw bytes; returns the number of new pulses decoded
    pub fn push(&mut self, bytes: &[u8]) -> u32 {
        let before = self.queued;
        for &b in bytes {
            if b == b'\n' {
                if !self.discarding {
                    self.finish_line();
                }
                self.pending.clear();
                self.discarding = false;
            } else if self.discarding {
                continue;
            } else if self.pending.len() >= MAX_LINE_LEN {
                self.pending.clear();
                self.discarding = true;
                self.ignored += 1;
            } else {
                self.pending.push(b);
            }
        }
        self.queued - before
    }

    fn finish_line(&mut self) {
        match std::str::from_utf8(&self.pending) {
            Ok(line) if line.trim() == "1" => self.queued += 1,
            _ => self.ignored += 1,
        }
    }

    /// Take one decoded pulse, if any
    pub fn take_pulse(&mut self) -> bool {
        if self.queued > 0 {
            self.queued -= 1;
            true
        } else {
            false
        }
    }

    pub fn queued_pulses(&self) -> u32 {
        self.queued
    }

    pub fn ignored_lines(&self) -> u64 {
        self.ignored
    }

    pub fn has_partial_line(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop queued pulses and any partial line
    pub fn clear(&mut self) {
        self.pending.clear();
        self.queued = 0;
        self.discarding = false;
    }
}
