//! Newline framing for the serial read side.
//!
//! Bytes arrive in arbitrary chunks; a line is complete once `\n` is seen.
//! A trailing `\r` is stripped and a partial line is kept for the next chunk.
//! The device does not always terminate its replies, so the reader also
//! flushes a partial line when the port goes quiet.

use std::collections::VecDeque;

/// A partial line longer than this is emitted as is.
pub const MAX_LINE_LEN: usize = 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
    complete: VecDeque<String>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the port.
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                self.complete_partial();
            } else {
                self.partial.push(b);
                if self.partial.len() >= MAX_LINE_LEN {
                    self.complete_partial();
                }
            }
        }
    }

    /// Emit the unterminated tail as a line, if there is one.
    pub fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            self.complete_partial();
        }
    }

    /// Next complete line, oldest first.
    pub fn pop_line(&mut self) -> Option<String> {
        self.complete.pop_front()
    }

    fn complete_partial(&mut self) {
        let mut line = std::mem::take(&mut self.partial);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.complete
            .push_back(String::from_utf8_lossy(&line).into_owned());
    }
}
