//! Channel layer: the terminal output of the sftp client.
//!
//! This module turns the unframed byte stream of an interactive client
//! into prompt-delimited responses.

mod buffer;
mod collector;
pub mod patterns;

pub use buffer::PatternBuffer;
pub use collector::{Collector, CollectorEvent};
pub use patterns::PromptPatterns;
