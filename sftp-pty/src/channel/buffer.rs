//! Accumulation buffer for terminal output.
//!
//! Output is cleaned of ANSI escape sequences on the way in. The escape
//! parser keeps its state between calls, so a sequence that is split
//! across two reads is still removed.
//!
//! Prompt detection only ever needs the trailing, unterminated line of the
//! buffer, so that is what the buffer exposes for matching.

use std::borrow::Cow;

use memchr::memrchr2;

/// Buffer for accumulating terminal output since the last prompt.
pub struct PatternBuffer {
    /// The accumulated, escape-free output.
    buffer: Vec<u8>,

    /// Escape sequence parser, kept across chunks.
    parser: vte::Parser,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            parser: vte::Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable(&mut self.buffer);
        self.parser.advance(&mut printable, data);
    }

    /// Byte offset where the trailing (unterminated) line starts.
    pub fn tail_line_start(&self) -> usize {
        memrchr2(b'\r', b'\n', &self.buffer).map_or(0, |pos| pos + 1)
    }

    /// The trailing line: everything after the last line terminator.
    pub fn tail_line(&self) -> &[u8] {
        &self.buffer[self.tail_line_start()..]
    }

    /// Drop the trailing line, keeping every terminated line before it.
    pub fn discard_tail_line(&mut self) {
        let start = self.tail_line_start();
        self.buffer.truncate(start);
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("buffer", &self.as_str_lossy())
            .finish_non_exhaustive()
    }
}

/// `vte` performer that keeps printable text and line structure.
struct Printable<'a>(&'a mut Vec<u8>);

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\r' | b'\n' | b'\t') {
            self.0.push(byte);
        }
    }
}
