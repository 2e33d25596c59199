//! Process execution engine.
//!
//! `GitProcess` spawns the configured git binary either synchronously
//! (`exec`, blocks until exit or timeout) or asynchronously (`exec_async`,
//! returns an `AsyncHandle` immediately).
//!
//! Async threading model per invocation:
//! - one reader thread per stream, reading line by line in process order
//! - one waiter thread that joins both readers, reaps the child and fires
//!   `on_exited` exactly once, after all output has been delivered
//!
//! On Unix every child leads its own process group. Timeouts and `kill`
//! signal the whole group, so helpers git started (ssh, credential helpers,
//! hooks) go down with it and release the output pipes.
//!
//! A non-zero exit code is never an engine error; only spawn failures
//! (`GitError::Launch`) and sync timeouts (`GitError::Timeout`) are.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GitError, Result};
use crate::git::command::Command;
use crate::git::context::AccessConfig;

/// How often a waiting thread polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit code reported when the process was terminated by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Text encoding used to decode process output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Everything needed to run one command.
#[derive(Debug, Clone)]
pub struct ExecInput {
    /// Empty for repository-less commands.
    pub working_dir: PathBuf,
    pub command: Command,
    pub encoding: TextEncoding,
}

impl ExecInput {
    pub fn new(working_dir: impl Into<PathBuf>, command: Command, encoding: TextEncoding) -> Self {
        Self {
            working_dir: working_dir.into(),
            command,
            encoding,
        }
    }
}

/// Snapshot of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stderr when present, otherwise stdout.
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }

    /// Generic failure for any non-zero exit code.
    pub fn check(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.failure())
        }
    }

    pub(crate) fn failure(&self) -> GitError {
        GitError::Failed {
            exit_code: self.exit_code,
            message: self.message(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Notifications from a running process.
///
/// `on_line` receives `None` once per stream at end-of-stream. `on_exited`
/// runs on the waiter thread, not on the caller's thread.
pub trait ExecObserver: Send + Sync + 'static {
    fn on_line(&self, stream: StreamKind, line: Option<&str>) {
        let _ = (stream, line);
    }

    fn on_exited(&self, exit_code: i32) {
        let _ = exit_code;
    }
}

/// Observer that ignores everything; buffers are still accumulated.
pub struct NullObserver;

impl ExecObserver for NullObserver {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    Line {
        stream: StreamKind,
        line: Option<String>,
    },
    Exited(i32),
}

/// Forwards notifications into a channel for queue-style consumption.
pub struct ChannelObserver {
    tx: Sender<ExecEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<ExecEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl ExecObserver for ChannelObserver {
    fn on_line(&self, stream: StreamKind, line: Option<&str>) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(ExecEvent::Line {
            stream,
            line: line.map(str::to_string),
        });
    }

    fn on_exited(&self, exit_code: i32) {
        let _ = self.tx.send(ExecEvent::Exited(exit_code));
    }
}

/// Spawns the git binary described by an `AccessConfig`.
#[derive(Debug, Clone)]
pub struct GitProcess {
    config: Arc<AccessConfig>,
}

impl GitProcess {
    pub fn new(config: Arc<AccessConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    fn log_call(&self, input: &ExecInput) {
        if self.config.log_cli_calls {
            info!(dir = %input.working_dir.display(), "git {}", input.command);
        } else {
            debug!(dir = %input.working_dir.display(), "git {}", input.command);
        }
    }

    fn spawn(&self, input: &ExecInput) -> Result<Child> {
        let mut cmd = std::process::Command::new(&self.config.git_path);
        cmd.args(input.command.argv());
        if !input.working_dir.as_os_str().is_empty() {
            cmd.current_dir(&input.working_dir);
        }
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd.spawn().map_err(|source| GitError::Launch {
            program: self.config.git_path.display().to_string(),
            source,
        })
    }

    /// Run to completion and capture both streams.
    ///
    /// The timeout bounds the whole call: a process that has exited but whose
    /// pipes are still held open by a descendant also times out.
    pub fn exec(&self, input: &ExecInput) -> Result<ExecOutput> {
        self.log_call(input);
        let mut child = self.spawn(input)?;
        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);

        let stdout_reader = read_to_end(child.stdout.take());
        let stderr_reader = read_to_end(child.stderr.take());

        let status = match deadline {
            Some(deadline) => wait_with_deadline(&mut child, deadline)?
                .filter(|_| readers_finished(&[&stdout_reader, &stderr_reader], deadline)),
            None => Some(child.wait()?),
        };

        let Some(status) = status else {
            if let Err(e) = kill_group(&mut child) {
                warn!("Failed to kill timed out process: {}", e);
            }
            let _ = child.wait();
            // Readers are left detached; they end once the last pipe holder dies.
            return Err(GitError::Timeout {
                command: input.command.to_string(),
                timeout: self.config.timeout.unwrap_or_default(),
            });
        };

        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        let output = ExecOutput {
            exit_code: exit_code(status),
            stdout: input.encoding.decode(&stdout),
            stderr: input.encoding.decode(&stderr),
        };
        debug!(exit_code = output.exit_code, "git {} finished", input.command);
        Ok(output)
    }

    /// Start without blocking. Fails only if the process cannot be spawned.
    pub fn exec_async(
        &self,
        input: &ExecInput,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle> {
        self.log_call(input);
        let mut child = self.spawn(input)?;
        let pid = child.id();

        let shared = Arc::new(HandleShared::default());
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));

        let readers = [
            pump_lines(stdout, StreamKind::Stdout, input.encoding, &shared, &observer),
            pump_lines(stderr, StreamKind::Stderr, input.encoding, &shared, &observer),
        ];

        {
            let shared = shared.clone();
            let child = child.clone();
            let observer = observer.clone();
            thread::spawn(move || {
                for reader in readers.into_iter().flatten() {
                    if reader.join().is_err() {
                        warn!("Output reader thread panicked");
                    }
                }
                let code = reap(&child);
                {
                    let mut exit = shared.exit.lock().unwrap_or_else(PoisonError::into_inner);
                    *exit = Some(code);
                }
                shared.exited.notify_all();
                observer.on_exited(code);
            });
        }

        Ok(AsyncHandle {
            command: input.command.to_string(),
            pid,
            child,
            shared,
        })
    }
}

#[derive(Default)]
struct HandleShared {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
    exit: Mutex<Option<i32>>,
    exited: Condvar,
}

impl HandleShared {
    fn buffer(&self, stream: StreamKind) -> &Mutex<String> {
        match stream {
            StreamKind::Stdout => &self.stdout,
            StreamKind::Stderr => &self.stderr,
        }
    }
}

/// Live handle to a process started with `GitProcess::exec_async`.
///
/// Stays inspectable after exit: buffers and exit code remain readable.
pub struct AsyncHandle {
    command: String,
    pid: u32,
    child: Arc<Mutex<Child>>,
    shared: Arc<HandleShared>,
}

impl AsyncHandle {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Accumulated stdout, each line terminated by `\n`.
    pub fn stdout(&self) -> String {
        self.shared
            .stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stderr(&self) -> String {
        self.shared
            .stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_code().is_some()
    }

    /// `None` until the exited notification has fired.
    pub fn exit_code(&self) -> Option<i32> {
        *self
            .shared
            .exit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the process has exited and all output is delivered.
    pub fn wait(&self) -> i32 {
        let guard = self
            .shared
            .exit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let guard = self
            .shared
            .exited
            .wait_while(guard, |code| code.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.unwrap_or(SIGNALED_EXIT_CODE)
    }

    /// Returns whether the process had exited by the deadline.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self
            .shared
            .exit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .shared
            .exited
            .wait_timeout_while(guard, timeout, |code| code.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.is_some()
    }

    /// Best-effort forcible termination. Never fails.
    pub fn kill(&self) {
        if self.has_exited() {
            return;
        }
        match self.child.lock() {
            Ok(mut child) => {
                if let Err(e) = kill_group(&mut child) {
                    debug!("kill of git {} ignored: {}", self.command, e);
                }
            }
            Err(_) => warn!("Child lock poisoned, cannot kill git {}", self.command),
        }
    }

    /// Final output once the process has exited.
    pub fn output(&self) -> Option<ExecOutput> {
        self.exit_code().map(|exit_code| ExecOutput {
            exit_code,
            stdout: self.stdout(),
            stderr: self.stderr(),
        })
    }

    /// Generic failure when the finished process reported a non-zero code.
    pub fn check(&self) -> Result<()> {
        match self.output() {
            Some(output) => output.check(),
            None => Err(GitError::Internal(format!(
                "git {} has not exited yet",
                self.command
            ))),
        }
    }
}

fn pump_lines<R: Read + Send + 'static>(
    stream: Option<R>,
    kind: StreamKind,
    encoding: TextEncoding,
    shared: &Arc<HandleShared>,
    observer: &Arc<dyn ExecObserver>,
) -> Option<JoinHandle<()>> {
    let stream = stream?;
    let shared = shared.clone();
    let observer = observer.clone();
    Some(thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {
                    if raw.last() == Some(&b'\n') {
                        raw.pop();
                        if raw.last() == Some(&b'\r') {
                            raw.pop();
                        }
                    }
                    let line = encoding.decode(&raw);
                    {
                        let mut buffer = shared
                            .buffer(kind)
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        buffer.push_str(&line);
                        buffer.push('\n');
                    }
                    observer.on_line(kind, Some(&line));
                }
                Err(e) => {
                    warn!("Failed to read {:?}: {}", kind, e);
                    break;
                }
            }
        }
        observer.on_line(kind, None);
    }))
}

fn read_to_end<R: Read + Send + 'static>(
    stream: Option<R>,
) -> Option<JoinHandle<std::io::Result<Vec<u8>>>> {
    let mut stream = stream?;
    Some(thread::spawn(move || {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(bytes)
    }))
}

fn join_reader(reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| GitError::Internal("Output reader thread panicked".to_string()))?
            .map_err(GitError::from),
        None => Ok(Vec::new()),
    }
}

/// Poll until every reader has drained its pipe or the deadline passes.
fn readers_finished<T>(readers: &[&Option<JoinHandle<T>>], deadline: Instant) -> bool {
    loop {
        if readers
            .iter()
            .all(|&reader| reader.as_ref().is_none_or(JoinHandle::is_finished))
        {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the child's process group.
#[cfg(unix)]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| std::io::Error::other("process id out of range"))?;
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the group
    // this child leads since spawn.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Poll until the child exits, releasing the lock between polls so that
/// `kill` can get in.
fn reap(child: &Mutex<Child>) -> i32 {
    loop {
        let polled = match child.lock() {
            Ok(mut child) => child.try_wait(),
            Err(_) => return SIGNALED_EXIT_CODE,
        };
        match polled {
            Ok(Some(status)) => return exit_code(status),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!("Failed to wait for git process: {}", e);
                return SIGNALED_EXIT_CODE;
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALED_EXIT_CODE)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::git::command::CommandArgument;

    fn shell() -> GitProcess {
        GitProcess::new(Arc::new(AccessConfig {
            git_path: PathBuf::from("sh"),
            ..AccessConfig::default()
        }))
    }

    fn script(body: &str) -> ExecInput {
        let command = Command::new("-c", vec![CommandArgument::new(body)]).unwrap();
        ExecInput::new("", command, TextEncoding::Utf8)
    }

    #[test]
    fn sync_exec_captures_streams_and_exit_code() {
        let output = shell()
            .exec(&script("printf 'out'; printf 'err' >&2; exit 3"))
            .unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        assert_eq!(output.message(), "err");
    }

    #[test]
    fn sync_exec_preserves_nul_bytes() {
        let output = shell().exec(&script("printf 'a\\nb\\000'")).unwrap();
        assert_eq!(output.stdout, "a\nb\0");
    }

    #[test]
    fn sync_exec_times_out() {
        let process = GitProcess::new(Arc::new(AccessConfig {
            git_path: PathBuf::from("sh"),
            timeout: Some(Duration::from_millis(100)),
            ..AccessConfig::default()
        }));
        let err = process.exec(&script("exec sleep 5")).unwrap_err();
        assert!(matches!(err, GitError::Timeout { .. }));
    }

    #[test]
    fn sync_timeout_kills_background_jobs() {
        let process = GitProcess::new(Arc::new(AccessConfig {
            git_path: PathBuf::from("sh"),
            timeout: Some(Duration::from_millis(200)),
            ..AccessConfig::default()
        }));
        let started = Instant::now();
        let err = process.exec(&script("sleep 30 & sleep 30")).unwrap_err();
        assert!(matches!(err, GitError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn sync_timeout_covers_pipes_held_after_exit() {
        let process = GitProcess::new(Arc::new(AccessConfig {
            git_path: PathBuf::from("sh"),
            timeout: Some(Duration::from_millis(300)),
            ..AccessConfig::default()
        }));
        let started = Instant::now();
        let err = process.exec(&script("sleep 30 & echo done")).unwrap_err();
        assert!(matches!(err, GitError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn async_kill_reaches_background_jobs() {
        let handle = shell()
            .exec_async(&script("sleep 30 & sleep 30"), Arc::new(NullObserver))
            .unwrap();
        assert!(!handle.wait_timeout(Duration::from_millis(50)));
        handle.kill();
        assert!(handle.wait_timeout(Duration::from_secs(5)));
        assert_eq!(handle.exit_code(), Some(SIGNALED_EXIT_CODE));
    }

    #[test]
    fn missing_binary_is_a_launch_error() {
        let process = GitProcess::new(Arc::new(AccessConfig {
            git_path: PathBuf::from("/nonexistent/definitely-not-git"),
            ..AccessConfig::default()
        }));
        let command = Command::new("status", Vec::new()).unwrap();
        let input = ExecInput::new("", command, TextEncoding::Utf8);
        assert!(matches!(process.exec(&input), Err(GitError::Launch { .. })));
        assert!(matches!(
            process.exec_async(&input, Arc::new(NullObserver)),
            Err(GitError::Launch { .. })
        ));
    }

    #[test]
    fn async_kill_is_idempotent() {
        let handle = shell()
            .exec_async(&script("exec sleep 5"), Arc::new(NullObserver))
            .unwrap();
        assert!(!handle.wait_timeout(Duration::from_millis(50)));
        handle.kill();
        handle.kill();
        assert!(handle.wait_timeout(Duration::from_secs(5)));
        handle.kill();
        assert!(handle.has_exited());
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        assert_eq!(TextEncoding::Latin1.decode(&[0x63, 0x61, 0x66, 0xe9]), "café");
        assert_eq!(TextEncoding::Utf8.decode(b"caf\xc3\xa9"), "café");
    }
}
