//! Pseudo-terminal transport using portable-pty.

use std::io::{Read, Write};

use bytes::Bytes;
use log::{debug, warn};
use portable_pty::{ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::{Process, ProcessEvent, SpawnRequest, Spawner};
use crate::error::ProcessError;

/// Spawns the client in a native pseudo-terminal.
#[derive(Debug, Clone, Default)]
pub struct PtySpawner;

impl Spawner for PtySpawner {
    type Process = PtyProcess;

    fn spawn(&self, request: &SpawnRequest) -> Result<PtyProcess, ProcessError> {
        let spawn_error = |message: String| ProcessError::Spawn {
            program: request.program.clone(),
            message,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: request.rows,
                cols: request.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_error(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&request.program);
        cmd.args(&request.args);
        cmd.env("TERM", "dumb");

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_error(e.to_string()))?;
        drop(pair.slave);
        debug!(
            "spawned {} (pid {:?}) with {:?}",
            request.program,
            child.process_id(),
            request.args
        );

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_error(e.to_string()))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_error(e.to_string()))?;
        let killer = child.clone_killer();

        let (tx, events) = mpsc::unbounded_channel();

        let output_tx = tx.clone();
        tokio::task::spawn_blocking(move || read_loop(reader, output_tx));

        tokio::task::spawn_blocking(move || {
            let event = match child.wait() {
                Ok(status) => ProcessEvent::Exited {
                    code: status.exit_code(),
                },
                Err(e) => ProcessEvent::Error(e.to_string()),
            };
            let _ = tx.send(event);
        });

        Ok(PtyProcess {
            writer,
            killer,
            events,
            _master: pair.master,
        })
    }
}

/// Blocking read loop forwarding terminal output as events.
fn read_loop(mut reader: Box<dyn Read + Send>, tx: mpsc::UnboundedSender<ProcessEvent>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx
                    .send(ProcessEvent::Output(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                // EIO is how Linux reports the slave side closing.
                if e.raw_os_error() != Some(5) {
                    warn!("pty read error: {}", e);
                    let _ = tx.send(ProcessEvent::Error(e.to_string()));
                }
                break;
            }
        }
    }
}

/// A client running in a pseudo-terminal.
pub struct PtyProcess {
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
    // Dropping the master closes the terminal.
    _master: Box<dyn MasterPty + Send>,
}

impl Process for PtyProcess {
    async fn write(&mut self, data: &[u8]) -> Result<(), ProcessError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        self.killer.kill()?;
        Ok(())
    }
}
