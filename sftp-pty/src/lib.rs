//! # sftp-pty
//!
//! Async wrapper around the interactive `sftp` command line client.
//!
//! The client is started in a pseudo-terminal and driven the way a person
//! would drive it: a command is typed, and the output is read back until
//! the `sftp> ` prompt reappears. The output between two prompts is turned
//! into structured results.
//!
//! ## Features
//!
//! - Password answering at the client's password prompt
//! - `cwd`, `list`, `exists` and `real_path` on the remote side
//! - `ls -l` parsing into [`DirEntry`] records, including symlink targets
//! - Prompt grammar kept in [`PromptPatterns`] so other client builds can
//!   be supported without touching the collector
//!
//! File transfer is not supported.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sftp_pty::{ConnectConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sftp_pty::Error> {
//!     let mut session = Session::new();
//!     session
//!         .connect(
//!             ConnectConfig::builder("192.168.1.1")
//!                 .username("admin")
//!                 .password("secret")
//!                 .build(),
//!         )
//!         .await?;
//!
//!     println!("{}", session.cwd().await?);
//!     if let Some(kind) = session.exists("/etc/hosts").await? {
//!         println!("/etc/hosts is a '{}'", kind);
//!     }
//!
//!     session.end().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{Collector, CollectorEvent, PromptPatterns};
pub use error::{Error, ProcessError};
pub use session::{DirEntry, FileType, Permissions, Session, SessionState};
pub use transport::{ConnectConfig, PrivateKey, PtySpawner};
