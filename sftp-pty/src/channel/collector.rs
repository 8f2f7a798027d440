//! Turns raw terminal output into discrete response events.
//!
//! The sftp client writes whatever it likes, in chunks of arbitrary size.
//! The collector accumulates those chunks and reports two things:
//!
//! - a password prompt sitting on the trailing line, and
//! - a completed command, once the trailing line is exactly the prompt
//!   marker. The accumulated output is then cleaned, split into lines and
//!   handed out as one batch, and the buffer starts over empty.
//!
//! A chunk boundary can fall anywhere, including inside the prompt or an
//! escape sequence. Both checks only look at the trailing line after the
//! chunk has been appended, so split prompts are recognised once complete.

use log::trace;

use super::buffer::PatternBuffer;
use super::patterns::PromptPatterns;

/// Event produced by [`Collector::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorEvent {
    /// The client is asking for a password.
    PasswordPrompt,

    /// The client printed its prompt; these are the cleaned output lines
    /// since the previous prompt, in order.
    Response(Vec<String>),
}

/// Stateful accumulator bound to one client's output.
#[derive(Debug)]
pub struct Collector {
    buffer: PatternBuffer,
    patterns: PromptPatterns,
}

impl Collector {
    /// Create a collector using the given prompt grammar.
    pub fn new(patterns: PromptPatterns) -> Self {
        Self {
            buffer: PatternBuffer::new(),
            patterns,
        }
    }

    /// The grammar this collector matches against.
    pub fn patterns(&self) -> &PromptPatterns {
        &self.patterns
    }

    /// Text accumulated since the last response.
    pub fn pending(&self) -> std::borrow::Cow<'_, str> {
        self.buffer.as_str_lossy()
    }

    /// Feed one chunk of raw output.
    ///
    /// Returns at most one event. Password detection wins over prompt
    /// detection; the password prompt line is dropped from the buffer and
    /// everything accumulated before it is kept for the next response.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<CollectorEvent> {
        trace!("collector: got {:?}", String::from_utf8_lossy(chunk));
        self.buffer.extend(chunk);

        if self.patterns.password.is_match(self.buffer.tail_line()) {
            trace!("collector: password prompt");
            self.buffer.discard_tail_line();
            return Some(CollectorEvent::PasswordPrompt);
        }

        if !self.patterns.prompt.is_match(self.buffer.tail_line()) {
            return None;
        }

        let raw = self.buffer.take();
        let lines = self.clean(&String::from_utf8_lossy(&raw));
        trace!("collector: response {:?}", lines);
        Some(CollectorEvent::Response(lines))
    }

    /// Remove noise and prompt markers, then split into non-blank lines.
    fn clean(&self, raw: &str) -> Vec<String> {
        let mut text = raw.to_string();
        for noise in &self.patterns.noise {
            if let std::borrow::Cow::Owned(replaced) = noise.replace_all(&text, "") {
                text = replaced;
            }
        }

        let marker = self.patterns.marker.trim_end();
        text.split(['\r', '\n'])
            .map(|line| strip_marker(line, marker))
            .filter(|line| !line.trim().is_empty())
            .collect()
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(PromptPatterns::sftp())
    }
}

/// Remove every occurrence of the prompt marker (and the single space that
/// follows it, if any) from a line.
fn strip_marker(line: &str, marker: &str) -> String {
    if marker.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(marker) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + marker.len()..];
        rest = rest.strip_prefix(' ').unwrap_or(rest);
    }
    out.push_str(rest);
    out
}
