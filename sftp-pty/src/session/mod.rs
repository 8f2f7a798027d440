//! Session layer: one sftp client process and the operations built on it.
//!
//! Every operation is "write a line, wait for exactly one response". The
//! methods take `&mut self`, so a session can only have one command in
//! flight; callers that share a session must serialise access themselves
//! (for example behind a `tokio::sync::Mutex`).

mod listing;
pub mod path;
mod timestamp;

pub use listing::{DirEntry, FileType, Permissions, parse_listing, parse_listing_line};
pub use timestamp::{listing_timestamp, month_number};

use std::fmt;

use chrono::Utc;
use log::{debug, trace, warn};
use secrecy::ExposeSecret;

use crate::channel::{Collector, CollectorEvent, PromptPatterns};
use crate::error::{Error, ProcessError, Result};
use crate::transport::{
    ConnectConfig, Process, ProcessEvent, PtySpawner, SpawnRequest, Spawner,
};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No process has been started yet.
    Unconnected,
    /// The client is running and has printed its first prompt.
    Connected,
    /// The client has been stopped or died; the session cannot be reused.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An interactive sftp client driven through a terminal.
///
/// # Example
///
/// ```rust,no_run
/// use sftp_pty::{ConnectConfig, Session};
///
/// # async fn example() -> Result<(), sftp_pty::Error> {
/// let mut session = Session::new();
/// session
///     .connect(
///         ConnectConfig::builder("sftp.example.com")
///             .username("tim")
///             .password("secret")
///             .build(),
///     )
///     .await?;
///
/// let home = session.cwd().await?;
/// for entry in session.list(&home).await? {
///     println!("{} {}", entry.file_type, entry.name);
/// }
///
/// session.end().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<S: Spawner = PtySpawner> {
    spawner: S,

    /// The running client (None when unconnected or closed).
    process: Option<S::Process>,

    collector: Collector,

    config: Option<ConnectConfig>,

    state: SessionState,

    /// A command was written but its response has not been read.
    in_flight: bool,
}

impl Session<PtySpawner> {
    /// Create a session that runs the client in a native PTY.
    pub fn new() -> Self {
        Self::with_spawner(PtySpawner)
    }
}

impl Default for Session<PtySpawner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spawner> Session<S> {
    /// Create a session that starts its client through `spawner`.
    pub fn with_spawner(spawner: S) -> Self {
        Self {
            spawner,
            process: None,
            collector: Collector::default(),
            config: None,
            state: SessionState::Unconnected,
            in_flight: false,
        }
    }

    /// Use a different prompt grammar (for a differently configured client).
    pub fn with_patterns(mut self, patterns: PromptPatterns) -> Self {
        self.collector = Collector::new(patterns);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if the session can accept commands.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.process.is_some()
    }

    /// The configuration the session was connected with.
    pub fn config(&self) -> Option<&ConnectConfig> {
        self.config.as_ref()
    }

    /// Start the client and wait for its first prompt.
    ///
    /// Password prompts seen before that prompt are answered with the
    /// configured password.
    pub async fn connect(&mut self, config: ConnectConfig) -> Result<()> {
        const OP: &str = "connect";

        if self.state != SessionState::Unconnected {
            return Err(Error::InvalidState {
                op: OP,
                state: self.state.to_string(),
            });
        }
        config
            .validate()
            .map_err(|message| Error::Configuration { op: OP, message })?;

        let request = SpawnRequest::from_config(&config);
        self.config = Some(config);
        self.note(&format!("Config: {:?}", self.config));
        self.note(&format!("Args: {:?}", request.args));

        let process = self
            .spawner
            .spawn(&request)
            .map_err(|source| Error::Connection { op: OP, source })?;
        self.process = Some(process);
        self.collector = Collector::new(self.collector.patterns().clone());

        match self.await_response(OP, true).await {
            Ok(banner) => {
                self.note(&format!("{}: connected {:?}", OP, banner));
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.close_process();
                Err(e)
            }
        }
    }

    /// Stop the client.
    ///
    /// Succeeds when nothing is running, and never fails because the
    /// process already exited on its own.
    pub async fn end(&mut self) -> Result<()> {
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };

        self.note("end: sending exit");
        if let Err(e) = process.write(b"exit\r").await {
            debug!("end: exit not delivered: {}", e);
        }
        if let Err(e) = process.terminate() {
            debug!("end: terminate: {}", e);
        }

        self.state = SessionState::Closed;
        self.in_flight = false;
        Ok(())
    }

    /// The remote working directory.
    pub async fn cwd(&mut self) -> Result<String> {
        const OP: &str = "cwd";

        let lines = self.command(OP, "pwd").await?;
        let patterns = self.collector.patterns();
        lines
            .iter()
            .find_map(|line| patterns.remote_cwd(line))
            .map(str::to_string)
            .ok_or_else(|| Error::Parse {
                op: OP,
                message: format!("no remote working directory in {:?}", lines),
            })
    }

    /// List a remote directory.
    ///
    /// Entries come back in listing order. A missing path fails with
    /// [`Error::NotFound`].
    pub async fn list(&mut self, remote_path: &str) -> Result<Vec<DirEntry>> {
        self.list_with("list", "-l", remote_path).await
    }

    /// Check whether a remote path exists.
    ///
    /// Returns the entry's type when it does and `None` when it does not.
    /// Relative paths are resolved against the working directory.
    pub async fn exists(&mut self, remote_path: &str) -> Result<Option<FileType>> {
        const OP: &str = "exists";

        let absolute = self.absolute(OP, remote_path).await?;
        self.lookup(OP, &absolute).await
    }

    /// Resolve a path to an existing absolute path.
    ///
    /// Absolute paths are returned unchanged when they exist. Relative ones
    /// are joined onto the working directory.
    pub async fn real_path(&mut self, remote_path: &str) -> Result<String> {
        const OP: &str = "real_path";

        let absolute = if path::is_absolute(remote_path) {
            remote_path.to_string()
        } else {
            self.absolute(OP, remote_path).await?
        };
        match self.lookup(OP, &absolute).await? {
            Some(_) => Ok(absolute),
            None => Err(Error::PathResolution {
                op: OP,
                path: remote_path.to_string(),
            }),
        }
    }

    async fn absolute(&mut self, op: &'static str, remote_path: &str) -> Result<String> {
        if path::is_absolute(remote_path) {
            return Ok(path::normalize(remote_path));
        }
        let cwd = self.cwd().await?;
        trace!("{}: resolving {:?} against {}", op, remote_path, cwd);
        Ok(path::join(&cwd, remote_path))
    }

    /// Find an absolute path's entry in its parent's listing.
    async fn lookup(&mut self, op: &'static str, absolute: &str) -> Result<Option<FileType>> {
        let Some((parent, name)) = path::split_parent(absolute) else {
            return Ok(Some(FileType::Directory));
        };
        match self.list_with(op, "-la", &parent).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .find(|entry| entry.name == name)
                .map(|entry| entry.file_type)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_with(
        &mut self,
        op: &'static str,
        flags: &str,
        remote_path: &str,
    ) -> Result<Vec<DirEntry>> {
        let command = if remote_path.is_empty() {
            format!("ls {}", flags)
        } else {
            format!("ls {} {}", flags, path::quote(remote_path))
        };
        let lines = self.command(op, &command).await?;

        let today = Utc::now().date_naive();
        let patterns = self.collector.patterns();
        let mut entries = Vec::new();
        for line in lines.iter().filter(|line| line.trim() != command) {
            match parse_listing_line(line, today) {
                Some(entry) => entries.push(entry),
                None if patterns.is_not_found(line) => {
                    return Err(Error::NotFound {
                        op,
                        path: remote_path.to_string(),
                    });
                }
                None => trace!("{}: skipping {:?}", op, line),
            }
        }
        Ok(entries)
    }

    /// Send one command line and wait for its response batch.
    async fn command(&mut self, op: &'static str, command: &str) -> Result<Vec<String>> {
        if !self.is_connected() {
            return Err(Error::NoConnection { op });
        }

        if self.in_flight {
            warn!("{}: discarding the response of an abandoned command", op);
            self.await_response(op, false).await?;
            self.in_flight = false;
        }

        self.note(&format!("{}: sending {:?}", op, command));
        self.in_flight = true;
        self.write_line(op, command).await?;
        let lines = self.await_response(op, false).await?;
        self.in_flight = false;

        self.note(&format!("{}: response {:?}", op, lines));
        Ok(lines)
    }

    async fn write_line(&mut self, op: &'static str, line: &str) -> Result<()> {
        let process = self.process.as_mut().ok_or(Error::NoConnection { op })?;

        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\r');

        if let Err(source) = process.write(&data).await {
            self.close_process();
            return Err(Error::Connection { op, source });
        }
        Ok(())
    }

    /// Wait for the next response batch, honouring the configured timeout.
    ///
    /// A timeout leaves the process running; any process failure closes it.
    async fn await_response(
        &mut self,
        op: &'static str,
        answer_password: bool,
    ) -> Result<Vec<String>> {
        let timeout = self.config.as_ref().and_then(|config| config.timeout);
        let result = match timeout {
            Some(duration) => tokio::time::timeout(duration, self.pump(answer_password))
                .await
                .map_err(|_| Error::Timeout { op, duration })?,
            None => self.pump(answer_password).await,
        };

        match result {
            Ok(lines) => Ok(lines),
            Err(source) => {
                self.note(&format!("{}: {}", op, source));
                self.close_process();
                Err(Error::Connection { op, source })
            }
        }
    }

    /// Feed process output to the collector until it yields a response.
    async fn pump(&mut self, answer_password: bool) -> std::result::Result<Vec<String>, ProcessError> {
        let process = self.process.as_mut().ok_or(ProcessError::Closed)?;

        loop {
            match process.next_event().await.ok_or(ProcessError::Closed)? {
                ProcessEvent::Output(chunk) => match self.collector.feed(&chunk) {
                    Some(CollectorEvent::Response(lines)) => return Ok(lines),
                    Some(CollectorEvent::PasswordPrompt) if answer_password => {
                        let password = self
                            .config
                            .as_ref()
                            .and_then(|config| config.password.as_ref())
                            .ok_or(ProcessError::PasswordRequired)?;
                        emit(&self.config, "Send password");
                        process.write(password.expose_secret().as_bytes()).await?;
                        process.write(b"\r").await?;
                    }
                    Some(CollectorEvent::PasswordPrompt) => {
                        warn!("ignoring password prompt outside of connect");
                    }
                    None => {}
                },
                ProcessEvent::Exited { code } => {
                    return Err(ProcessError::Exited { code });
                }
                ProcessEvent::Error(message) => {
                    return Err(ProcessError::Failed(message));
                }
            }
        }
    }

    /// Stop and forget the process after a failure.
    fn close_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.terminate() {
                debug!("terminate after failure: {}", e);
            }
        }
        self.state = SessionState::Closed;
        self.in_flight = false;
    }

    fn note(&self, message: &str) {
        emit(&self.config, message);
    }
}

impl<S: Spawner> Drop for Session<S> {
    fn drop(&mut self) {
        if let Some(process) = self.process.as_mut() {
            let _ = process.terminate();
        }
    }
}

/// Log a diagnostic and pass it to the configured debug sink.
fn emit(config: &Option<ConnectConfig>, message: &str) {
    debug!("{}", message);
    if let Some(sink) = config.as_ref().and_then(|config| config.debug.as_ref()) {
        sink(message);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::time::Instant;
    use tokio_test::{assert_pending, task};

    use super::*;
    use crate::transport::PrivateKey;

    type Script = Arc<dyn Fn(&str) -> (Duration, Vec<ProcessEvent>) + Send + Sync>;

    fn out(text: &str) -> ProcessEvent {
        ProcessEvent::Output(Bytes::copy_from_slice(text.as_bytes()))
    }

    fn now(events: Vec<ProcessEvent>) -> (Duration, Vec<ProcessEvent>) {
        (Duration::ZERO, events)
    }

    fn listing(dir: &str) -> Option<&'static [&'static str]> {
        match dir {
            "/" => Some(&["drwxr-xr-x    5 root     root         4096 Jan  1  2024 home"]),
            "/home" => Some(&["drwxr-x---   12 tim      tim          4096 Oct 16 09:12 tim"]),
            "/home/tim" => Some(&[
                "drwxr-xr-x    4 tim      tim          4096 Mar  3 14:02 testServer",
                "-rw-r--r--    1 tim      tim          1523 Dec  1  2020 notes.txt",
                "drwxr-xr-x    2 tim      tim          4096 Jan  5 10:30 my docs",
                "lrwxrwxrwx    1 tim      tim            11 Jan  5 10:30 latest -> testServer",
            ]),
            _ => None,
        }
    }

    /// A server whose home directory is /home/tim and password is "secret".
    fn home_server(line: &str) -> (Duration, Vec<ProcessEvent>) {
        if line == "secret" {
            return now(vec![
                out("\r\n"),
                out("Connected to sftp.example.com.\r\n"),
                out("sftp> "),
            ]);
        }
        if line == "pwd" {
            return now(vec![
                out("pwd\r\nRemote working directory: /home/tim\r\n"),
                out("sft"),
                out("p> "),
            ]);
        }
        if line == "exit" {
            return now(vec![ProcessEvent::Exited { code: 0 }]);
        }
        let target = line
            .strip_prefix("ls -la ")
            .or_else(|| line.strip_prefix("ls -l "))
            .map(|arg| arg.trim_matches('"'));
        if let Some(target) = target {
            let mut text = format!("{}\r\n", line);
            match listing(target) {
                Some(entries) => {
                    if line.starts_with("ls -la") {
                        text.push_str("drwxr-xr-x    3 tim tim 4096 Jan  5 10:30 .\r\n");
                        text.push_str("drwxr-xr-x    3 tim tim 4096 Jan  5 10:30 ..\r\n");
                    }
                    for entry in entries {
                        text.push_str(entry);
                        text.push_str("\r\n");
                    }
                }
                None => text.push_str(&format!("Can't ls: \"{}\" not found\r\n", target)),
            }
            text.push_str("sftp> ");
            return now(vec![out(&text)]);
        }
        now(vec![out(&format!("{}\r\nInvalid command.\r\nsftp> ", line))])
    }

    #[derive(Clone)]
    struct FakeSpawner {
        banner: Vec<ProcessEvent>,
        script: Script,
        written: Arc<Mutex<Vec<String>>>,
        requests: Arc<Mutex<Vec<SpawnRequest>>>,
        terminated: Arc<AtomicBool>,
        /// Once set, the process behaves as if it already exited.
        dead: Arc<AtomicBool>,
        spawn_error: Option<String>,
    }

    impl FakeSpawner {
        fn new(script: Script) -> Self {
            Self {
                banner: vec![out("tim@sftp.example.com's password: ")],
                script,
                written: Arc::default(),
                requests: Arc::default(),
                terminated: Arc::default(),
                dead: Arc::default(),
                spawn_error: None,
            }
        }

        fn home() -> Self {
            Self::new(Arc::new(home_server))
        }

        fn with_banner(mut self, banner: Vec<ProcessEvent>) -> Self {
            self.banner = banner;
            self
        }

        fn failing(mut self, message: &str) -> Self {
            self.spawn_error = Some(message.to_string());
            self
        }

        fn written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }
    }

    impl Spawner for FakeSpawner {
        type Process = FakeProcess;

        fn spawn(&self, request: &SpawnRequest) -> std::result::Result<FakeProcess, ProcessError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(message) = &self.spawn_error {
                return Err(ProcessError::Spawn {
                    program: request.program.clone(),
                    message: message.clone(),
                });
            }
            Ok(FakeProcess {
                queue: self.banner.iter().cloned().map(|e| (None, e)).collect(),
                line: Vec::new(),
                script: self.script.clone(),
                written: self.written.clone(),
                terminated: self.terminated.clone(),
                dead: self.dead.clone(),
            })
        }
    }

    struct FakeProcess {
        queue: VecDeque<(Option<Instant>, ProcessEvent)>,
        line: Vec<u8>,
        script: Script,
        written: Arc<Mutex<Vec<String>>>,
        terminated: Arc<AtomicBool>,
        dead: Arc<AtomicBool>,
    }

    impl Process for FakeProcess {
        async fn write(&mut self, data: &[u8]) -> std::result::Result<(), ProcessError> {
            if self.dead.load(Ordering::SeqCst) {
                // EIO, as a terminal whose slave side has gone away reports it.
                return Err(ProcessError::Io(std::io::Error::from_raw_os_error(5)));
            }
            for &byte in data {
                if byte != b'\r' {
                    self.line.push(byte);
                    continue;
                }
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                self.written.lock().unwrap().push(line.clone());

                let (delay, events) = (self.script)(&line);
                let ready = (!delay.is_zero()).then(|| Instant::now() + delay);
                self.queue.extend(events.into_iter().map(|e| (ready, e)));
            }
            Ok(())
        }

        async fn next_event(&mut self) -> Option<ProcessEvent> {
            let ready = match self.queue.front() {
                Some((ready, _)) => *ready,
                None => std::future::pending().await,
            };
            if let Some(at) = ready {
                tokio::time::sleep_until(at).await;
            }
            self.queue.pop_front().map(|(_, event)| event)
        }

        fn terminate(&mut self) -> std::result::Result<(), ProcessError> {
            if self.dead.load(Ordering::SeqCst) {
                return Err(ProcessError::Failed("no such process".to_string()));
            }
            self.terminated.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> ConnectConfig {
        ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .password("secret")
            .build()
    }

    async fn connected(spawner: FakeSpawner) -> Session<FakeSpawner> {
        let mut session = Session::with_spawner(spawner);
        session.connect(config()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_connect_answers_password() {
        let spawner = FakeSpawner::home();
        let session = connected(spawner.clone()).await;

        assert!(session.is_connected());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(spawner.written(), ["secret"]);

        let requests = spawner.requests.lock().unwrap();
        assert_eq!(requests[0].program, "sftp");
        assert_eq!(requests[0].args, ["-q", "tim@sftp.example.com"]);
    }

    #[tokio::test]
    async fn test_connect_answers_keyboard_interactive_prompt() {
        let spawner = FakeSpawner::home()
            .with_banner(vec![out("(tim@sftp.example.com) Password: ")]);
        let session = connected(spawner.clone()).await;

        assert!(session.is_connected());
        assert_eq!(spawner.written(), ["secret"]);
    }

    #[tokio::test]
    async fn test_connect_with_key_and_no_prompt() {
        let spawner = FakeSpawner::home()
            .with_banner(vec![out("Connected to sftp.example.com.\r\n"), out("sftp> ")]);
        let mut session = Session::with_spawner(spawner.clone());
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .private_key("/home/me/.ssh/id_ed25519")
            .build();
        session.connect(config).await.unwrap();

        assert!(session.is_connected());
        assert!(spawner.written().is_empty());
        let requests = spawner.requests.lock().unwrap();
        assert!(requests[0].args.contains(&"-i".to_string()));
    }

    #[tokio::test]
    async fn test_connect_rejects_inline_key() {
        let spawner = FakeSpawner::home();
        let mut session = Session::with_spawner(spawner.clone());
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .private_key_source(PrivateKey::Inline(vec![1, 2, 3]))
            .build();

        let err = session.connect(config).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { op: "connect", .. }));
        assert!(spawner.requests.lock().unwrap().is_empty());
        assert_eq!(session.state(), SessionState::Unconnected);
    }

    #[tokio::test]
    async fn test_connect_without_password_fails() {
        let spawner = FakeSpawner::home();
        let mut session = Session::with_spawner(spawner.clone());
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .build();

        let err = session.connect(config).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                source: ProcessError::PasswordRequired,
                ..
            }
        ));
        assert!(spawner.terminated.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_fails_when_process_exits() {
        let spawner = FakeSpawner::home().with_banner(vec![
            out("ssh: connect to host sftp.example.com port 22: Connection refused\r\n"),
            ProcessEvent::Exited { code: 255 },
        ]);
        let mut session = Session::with_spawner(spawner);

        let err = session.connect(config()).await.unwrap_err();
        assert_eq!(err.to_string(), "connect: process exited with code 255");
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_spawn_failure_leaves_session_unconnected() {
        let spawner = FakeSpawner::home().failing("No such file or directory");
        let mut session = Session::with_spawner(spawner);

        let err = session.connect(config()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                op: "connect",
                source: ProcessError::Spawn { .. }
            }
        ));
        assert_eq!(
            err.to_string(),
            "connect: failed to start 'sftp': No such file or directory"
        );
        assert_eq!(session.state(), SessionState::Unconnected);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_fails_on_process_error() {
        let spawner = FakeSpawner::home()
            .with_banner(vec![ProcessEvent::Error("read failed".to_string())]);
        let mut session = Session::with_spawner(spawner.clone());

        let err = session.connect(config()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                op: "connect",
                source: ProcessError::Failed(_)
            }
        ));
        assert_eq!(err.to_string(), "connect: process error: read failed");
        assert_eq!(session.state(), SessionState::Closed);
        assert!(spawner.terminated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected() {
        let mut session = connected(FakeSpawner::home()).await;
        let err = session.connect(config()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { op: "connect", .. }));
    }

    #[tokio::test]
    async fn test_cwd() {
        let mut session = connected(FakeSpawner::home()).await;
        assert_eq!(session.cwd().await.unwrap(), "/home/tim");
        // A second command gets its own response.
        assert_eq!(session.cwd().await.unwrap(), "/home/tim");
    }

    #[tokio::test]
    async fn test_cwd_without_banner_is_parse_error() {
        let script: Script = Arc::new(|line| match line {
            "pwd" => now(vec![out("pwd\r\nsomething else\r\nsftp> ")]),
            other => home_server(other),
        });
        let mut session = connected(FakeSpawner::new(script)).await;

        let err = session.cwd().await.unwrap_err();
        assert!(matches!(err, Error::Parse { op: "cwd", .. }));
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_list() {
        let mut session = connected(FakeSpawner::home()).await;
        let entries = session.list("/home/tim").await.unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["testServer", "notes.txt", "my docs", "latest"]);
        assert_eq!(entries[0].file_type, FileType::Directory);
        assert_eq!(entries[1].size, 1523);
        assert_eq!(entries[3].link_target.as_deref(), Some("testServer"));
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let spawner = FakeSpawner::home();
        let mut session = connected(spawner.clone()).await;

        let err = session.list("/home/tim/does-not-exist").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref path, .. } if path == "/home/tim/does-not-exist"));
        assert!(err.to_string().contains("not found"));
        assert_eq!(
            spawner.written().last().map(String::as_str),
            Some(r#"ls -l "/home/tim/does-not-exist""#)
        );
        // The session stays usable.
        assert_eq!(session.cwd().await.unwrap(), "/home/tim");
    }

    #[tokio::test]
    async fn test_exists() {
        let mut session = connected(FakeSpawner::home()).await;

        assert_eq!(
            session.exists("/home/tim/testServer").await.unwrap(),
            Some(FileType::Directory)
        );
        assert_eq!(
            session.exists("/home/tim/notes.txt").await.unwrap().map(FileType::as_char),
            Some('-')
        );
        assert_eq!(session.exists("/home/tim/my docs").await.unwrap(), Some(FileType::Directory));
        assert_eq!(session.exists("/home/tim/not-exist").await.unwrap(), None);
        assert_eq!(session.exists("/nowhere/at/all").await.unwrap(), None);
        assert_eq!(session.exists("/").await.unwrap(), Some(FileType::Directory));
    }

    #[tokio::test]
    async fn test_exists_relative() {
        let spawner = FakeSpawner::home();
        let mut session = connected(spawner.clone()).await;

        assert_eq!(session.exists("testServer").await.unwrap(), Some(FileType::Directory));
        assert_eq!(session.exists("../tim/notes.txt").await.unwrap().map(FileType::as_char), Some('-'));
        assert_eq!(session.exists("missing").await.unwrap(), None);
        assert!(spawner.written().contains(&"pwd".to_string()));
    }

    #[tokio::test]
    async fn test_real_path() {
        let mut session = connected(FakeSpawner::home()).await;

        assert_eq!(
            session.real_path("testServer").await.unwrap(),
            "/home/tim/testServer"
        );
        let once = session.real_path("/home/tim/testServer").await.unwrap();
        let twice = session.real_path(&once).await.unwrap();
        assert_eq!(once, "/home/tim/testServer");
        assert_eq!(once, twice);
        assert_eq!(session.real_path(".").await.unwrap(), "/home/tim");
    }

    #[tokio::test]
    async fn test_real_path_missing() {
        let mut session = connected(FakeSpawner::home()).await;

        let err = session.real_path("missing").await.unwrap_err();
        assert!(matches!(err, Error::PathResolution { .. }));
        assert_eq!(err.to_string(), "real_path: missing does not exist");

        let err = session.real_path("/home/tim/missing").await.unwrap_err();
        assert!(matches!(err, Error::PathResolution { .. }));
    }

    #[tokio::test]
    async fn test_commands_need_connection() {
        let mut session = Session::with_spawner(FakeSpawner::home());

        assert!(matches!(session.cwd().await, Err(Error::NoConnection { op: "cwd" })));
        assert!(matches!(session.list("/").await, Err(Error::NoConnection { op: "list" })));
        assert!(matches!(session.exists("/x").await, Err(Error::NoConnection { .. })));
        assert!(matches!(session.real_path("x").await, Err(Error::NoConnection { .. })));
    }

    #[tokio::test]
    async fn test_end_without_connect() {
        let mut session = Session::with_spawner(FakeSpawner::home());
        assert!(session.end().await.is_ok());
        assert_eq!(session.state(), SessionState::Unconnected);
    }

    #[tokio::test]
    async fn test_end() {
        let spawner = FakeSpawner::home();
        let mut session = connected(spawner.clone()).await;

        session.end().await.unwrap();
        assert_eq!(spawner.written().last().map(String::as_str), Some("exit"));
        assert!(spawner.terminated.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Closed);

        // Idempotent, and the session refuses further commands.
        session.end().await.unwrap();
        assert!(matches!(session.cwd().await, Err(Error::NoConnection { .. })));
    }

    #[tokio::test]
    async fn test_end_after_process_exited() {
        let spawner = FakeSpawner::home();
        let mut session = connected(spawner.clone()).await;

        // The client went away on its own; writing and killing both fail.
        spawner.dead.store(true, Ordering::SeqCst);

        assert!(session.end().await.is_ok());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_connected());
        assert!(!spawner.terminated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_process_exit_closes_session() {
        let script: Script = Arc::new(|line| match line {
            "pwd" => now(vec![out("pwd\r\n"), ProcessEvent::Exited { code: 1 }]),
            other => home_server(other),
        });
        let spawner = FakeSpawner::new(script);
        let mut session = connected(spawner.clone()).await;

        let err = session.cwd().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                op: "cwd",
                source: ProcessError::Exited { code: 1 }
            }
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(spawner.terminated.load(Ordering::SeqCst));
        assert!(matches!(session.cwd().await, Err(Error::NoConnection { .. })));
    }

    #[tokio::test]
    async fn test_command_without_prompt_stays_pending() {
        let script: Script = Arc::new(|line| match line {
            "pwd" => now(vec![out("pwd\r\nRemote working directory: /home/tim\r\n")]),
            other => home_server(other),
        });
        let mut session = connected(FakeSpawner::new(script)).await;

        let mut cwd = task::spawn(session.cwd());
        assert_pending!(cwd.poll());
        assert_pending!(cwd.poll());
    }

    #[tokio::test]
    async fn test_timeout() {
        let script: Script = Arc::new(|line| match line {
            "pwd" => now(vec![out("pwd\r\n")]),
            other => home_server(other),
        });
        let mut session = Session::with_spawner(FakeSpawner::new(script));
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .password("secret")
            .timeout(Duration::from_millis(50))
            .build();
        session.connect(config).await.unwrap();

        let err = session.cwd().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { op: "cwd", .. }));
        // The process is still there.
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_late_response_is_drained() {
        let script: Script = Arc::new(|line| match line {
            r#"ls -l "/slow""# => (
                Duration::from_millis(150),
                vec![out("ls -l \"/slow\"\r\n-rw-r--r-- 1 tim tim 1 Jan 1 2020 late.txt\r\nsftp> ")],
            ),
            other => home_server(other),
        });
        let mut session = Session::with_spawner(FakeSpawner::new(script));
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .password("secret")
            .timeout(Duration::from_millis(100))
            .build();
        session.connect(config).await.unwrap();

        let err = session.list("/slow").await.unwrap_err();
        assert!(matches!(err, Error::Timeout { op: "list", .. }));

        // The stale listing must not be taken as the pwd response.
        assert_eq!(session.cwd().await.unwrap(), "/home/tim");
    }

    #[tokio::test]
    async fn test_debug_sink_never_sees_password() {
        let messages = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = messages.clone();
        let mut session = Session::with_spawner(FakeSpawner::home());
        let config = ConnectConfig::builder("sftp.example.com")
            .username("tim")
            .password("secret")
            .debug(move |msg| sink.lock().unwrap().push(msg.to_string()))
            .build();
        session.connect(config).await.unwrap();
        session.cwd().await.unwrap();

        let messages = messages.lock().unwrap();
        assert!(messages.iter().any(|m| m == "Send password"));
        assert!(messages.iter().any(|m| m.starts_with("cwd: sending")));
        assert!(messages.iter().all(|m| !m.contains("secret")));
    }
}
