//! Transport layer: the spawned sftp client.
//!
//! The session never touches a terminal directly. It asks a [`Spawner`]
//! for a [`Process`], writes lines to it and reads [`ProcessEvent`]s
//! back. [`PtySpawner`] runs the real client in a pseudo-terminal; tests
//! plug in scripted processes.

pub mod config;
mod pty;

use std::future::Future;

use bytes::Bytes;

pub use config::{ConnectConfig, ConnectConfigBuilder, DebugSink, PrivateKey};
pub use pty::{PtyProcess, PtySpawner};

use crate::error::ProcessError;

/// Everything needed to start the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Program to run.
    pub program: String,

    /// Arguments, not including the program name.
    pub args: Vec<String>,

    /// Terminal width.
    pub cols: u16,

    /// Terminal height.
    pub rows: u16,
}

impl SpawnRequest {
    /// Build the request for a connection configuration.
    pub fn from_config(config: &ConnectConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args(),
            cols: config.terminal_width,
            rows: config.terminal_height,
        }
    }
}

/// Something that happened on the client's side of the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A chunk of raw terminal output.
    Output(Bytes),

    /// The process exited.
    Exited { code: u32 },

    /// Reading from the terminal failed.
    Error(String),
}

/// A running interactive client.
pub trait Process: Send {
    /// Write raw bytes to the client's terminal.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), ProcessError>> + Send;

    /// Wait for the next event. `None` once no more events can arrive.
    fn next_event(&mut self) -> impl Future<Output = Option<ProcessEvent>> + Send;

    /// Forcibly stop the client.
    fn terminate(&mut self) -> Result<(), ProcessError>;
}

/// Starts clients.
pub trait Spawner: Send + Sync {
    /// The process type produced.
    type Process: Process;

    /// Start the program described by `request`.
    fn spawn(&self, request: &SpawnRequest) -> Result<Self::Process, ProcessError>;
}
