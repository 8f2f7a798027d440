//! Textual patterns recognised at the terminal boundary.
//!
//! The sftp client has no framing; everything the session knows about its
//! state comes from these strings. They are collected here so a different
//! client build (or locale) only needs new constants.

use regex::Regex;
use regex::bytes::Regex as BytesRegex;

/// Trailing text of a password prompt (`tim@host's password: `, or
/// `(tim@host) Password: ` from keyboard-interactive authentication).
pub const PASSWORD_PROMPT: &str = r"(?i)password: $";

/// The interactive prompt printed when the client is ready for a command.
pub const PROMPT_MARKER: &str = "sftp> ";

/// Banner noise emitted when the terminal type is not recognised.
pub const BANNER_NOISE: &[&str] = &[
    r"(?i)warning: [^\r\n]*terminal[^\r\n]*",
    r"(?i)[^\r\n]*using dumb terminal settings\.?",
];

/// Listing error for a missing path (`Can't ls: "/x" not found`).
pub const NOT_FOUND: &str = r"(?i)not found|no such file|no entry";

/// Banner printed by `pwd`.
pub const REMOTE_CWD: &str = r"^Remote working directory: (.+?)\s*$";

/// Compiled prompt grammar used by the collector and the session.
///
/// A line of output is one of: a password prompt, the prompt marker,
/// banner noise, or data.
#[derive(Debug, Clone)]
pub struct PromptPatterns {
    /// Matches the trailing line when it is a password prompt.
    pub password: BytesRegex,

    /// Literal prompt marker, removed from responses wherever it appears.
    pub marker: String,

    /// Matches the trailing line when it consists solely of the marker.
    pub prompt: BytesRegex,

    /// Noise removed from responses before they are split into lines.
    pub noise: Vec<Regex>,

    /// Matches listing lines that report a missing path.
    pub not_found: Regex,

    /// Captures the path in the `pwd` banner.
    pub remote_cwd: Regex,
}

impl PromptPatterns {
    /// Build the grammar from custom strings.
    ///
    /// `marker` is a literal; the others are regular expressions.
    pub fn new(
        password: &str,
        marker: &str,
        noise: &[&str],
        not_found: &str,
        remote_cwd: &str,
    ) -> Result<Self, regex::Error> {
        let prompt = format!(r"^{}\s*$", regex::escape(marker.trim_end()));
        Ok(Self {
            password: BytesRegex::new(password)?,
            marker: marker.to_string(),
            prompt: BytesRegex::new(&prompt)?,
            noise: noise
                .iter()
                .map(|pattern| Regex::new(pattern))
                .collect::<Result<_, _>>()?,
            not_found: Regex::new(not_found)?,
            remote_cwd: Regex::new(remote_cwd)?,
        })
    }

    /// The patterns for OpenSSH's `sftp` client.
    pub fn sftp() -> Self {
        Self::new(
            PASSWORD_PROMPT,
            PROMPT_MARKER,
            BANNER_NOISE,
            NOT_FOUND,
            REMOTE_CWD,
        )
        .unwrap_or_else(|e| unreachable!("built-in sftp patterns must compile: {e}"))
    }

    /// Check if a line reports a missing path.
    pub fn is_not_found(&self, line: &str) -> bool {
        self.not_found.is_match(line)
    }

    /// Extract the directory from a `pwd` banner line.
    pub fn remote_cwd<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.remote_cwd
            .captures(line.trim_start())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for PromptPatterns {
    fn default() -> Self {
        Self::sftp()
    }
}
