//! Spot feed supervision: keeps the external feed process alive and exposes
//! its stdout as a non-blocking line queue.
//!
//! Each spawned child gets a dedicated OS thread that blocks on its stdout and
//! forwards complete lines into a bounded channel shared by every incarnation
//! of the process. Lines arriving while the channel is full are dropped, as
//! are lines longer than the configured byte limit.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use rbnbot_core::config::SourceConfig;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};

/// Longest feed line accepted, terminator included.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

/// Program and argv used to start the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SourceCommand {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<executable> <callsign> <max_wpm>`.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            config.executable.clone(),
            [config.callsign.clone(), config.max_wpm.to_string()],
        )
    }

    /// Locate the executable (through `PATH` for bare names).
    pub fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.program)
            .map_err(|e| FeedError::NotFound(format!("{}: {e}", self.program)))
    }
}

/// Lifecycle of the supervised feed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No process, or the last one exited or closed its stdout.
    Dead,
    /// Spawned, no output seen yet.
    Starting,
    /// Spawned and producing lines.
    Running,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceState::Dead => "dead",
            SourceState::Starting => "starting",
            SourceState::Running => "running",
        };
        f.write_str(s)
    }
}

/// One incarnation of the feed process.
struct LiveSource {
    child: Child,
    pid: u32,
    /// Set by the reader thread on stdout EOF or read error.
    closed: Arc<AtomicBool>,
    /// Set by the reader thread once the first line arrives.
    producing: Arc<AtomicBool>,
}

impl LiveSource {
    /// Non-blocking liveness check.
    fn is_alive(&mut self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(mut self) {
        if let Err(e) = self.child.kill() {
            debug!(pid = self.pid, error = %e, "feed kill failed (already exited?)");
        }
        if let Err(e) = self.child.wait() {
            warn!(pid = self.pid, error = %e, "failed to reap feed process");
        }
    }
}

/// Keeps the spot feed running and hands out its lines without blocking.
pub struct SourceSupervisor {
    command: SourceCommand,
    current: Option<LiveSource>,
    tx: mpsc::Sender<String>,
    rx: mpsc::Receiver<String>,
    spawn_count: u64,
    dropped: Arc<AtomicU64>,
    max_line_bytes: usize,
}

impl SourceSupervisor {
    /// Create a supervisor; nothing is spawned until [`ensure_running`](Self::ensure_running).
    pub fn new(command: SourceCommand, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        Self {
            command,
            current: None,
            tx,
            rx,
            spawn_count: 0,
            dropped: Arc::new(AtomicU64::new(0)),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Override the per-line byte limit.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    /// Spawn the feed unless a live instance already exists.
    ///
    /// Returns `Ok(true)` when a new process was started. A dead previous
    /// instance is reaped; its reader thread exits on its own once the closed
    /// pipe is drained, and lines it already queued stay in the queue.
    pub fn ensure_running(&mut self) -> Result<bool> {
        if let Some(live) = self.current.as_mut() {
            if live.is_alive() {
                return Ok(false);
            }
        }
        if let Some(dead) = self.current.take() {
            info!(pid = dead.pid, "feed process died, respawning");
            dead.terminate();
        }

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| FeedError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FeedError::NoStdout);
        };

        let pid = child.id();
        let closed = Arc::new(AtomicBool::new(false));
        let producing = Arc::new(AtomicBool::new(false));
        spawn_reader(
            ReaderHandles {
                pid,
                tx: self.tx.clone(),
                closed: Arc::clone(&closed),
                producing: Arc::clone(&producing),
                dropped: Arc::clone(&self.dropped),
                max_line_bytes: self.max_line_bytes,
            },
            stdout,
        );

        self.spawn_count += 1;
        info!(
            pid,
            spawn = self.spawn_count,
            program = %self.command.program,
            "feed process started"
        );

        self.current = Some(LiveSource {
            child,
            pid,
            closed,
            producing,
        });
        Ok(true)
    }

    /// Next queued line, if any. Never blocks.
    pub fn poll_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn state(&mut self) -> SourceState {
        match self.current.as_mut() {
            None => SourceState::Dead,
            Some(live) => {
                if !live.is_alive() {
                    SourceState::Dead
                } else if live.producing.load(Ordering::Acquire) {
                    SourceState::Running
                } else {
                    SourceState::Starting
                }
            }
        }
    }

    /// PID of the current incarnation, if one was spawned.
    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().map(|l| l.pid)
    }

    /// Number of processes spawned so far.
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    /// Lines discarded because the queue was full or they were too long.
    pub fn dropped_lines(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Kill the current process, if any.
    pub fn shutdown(&mut self) {
        if let Some(live) = self.current.take() {
            info!(pid = live.pid, "stopping feed process");
            live.terminate();
        }
    }
}

impl Drop for SourceSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Shared state a reader thread reports into.
struct ReaderHandles {
    pid: u32,
    tx: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
    producing: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    max_line_bytes: usize,
}

/// Blocking stdout reader; runs in a dedicated OS thread so it never blocks Tokio.
fn spawn_reader(handles: ReaderHandles, stdout: ChildStdout) {
    std::thread::spawn(move || {
        let ReaderHandles {
            pid,
            tx,
            closed,
            producing,
            dropped,
            max_line_bytes,
        } = handles;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::with_capacity(128);
        loop {
            buf.clear();
            let limit = max_line_bytes as u64;
            match (&mut reader).take(limit).read_until(b'\n', &mut buf) {
                Ok(0) => break, // EOF: process closed stdout
                Ok(n) => {
                    producing.store(true, Ordering::Release);
                    if n >= max_line_bytes && buf.last() != Some(&b'\n') {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(pid, limit = max_line_bytes, "overlong feed line dropped");
                        match discard_line(&mut reader) {
                            Ok(true) => continue,
                            Ok(false) => break,
                            Err(e) => {
                                warn!(pid, "feed reader error: {e}");
                                break;
                            }
                        }
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    match tx.try_send(line) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
                Err(e) => {
                    warn!(pid, "feed reader error: {e}");
                    break;
                }
            }
        }
        closed.store(true, Ordering::Release);
        debug!(pid, "feed reader thread exited");
    });
}

/// Skip input up to and including the next newline without buffering it.
/// Returns `false` if the stream ended first.
fn discard_line(reader: &mut impl BufRead) -> io::Result<bool> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(false);
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(true);
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn echo(line: &str) -> SourceCommand {
        SourceCommand::new("sh", ["-c".to_string(), format!("echo '{line}'")])
    }

    /// Poll until a line shows up or two seconds pass.
    fn wait_line(sup: &mut SourceSupervisor) -> Option<String> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(line) = sup.poll_line() {
                return Some(line);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    fn wait_dead(sup: &mut SourceSupervisor) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while sup.state() != SourceState::Dead && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn command_from_config_passes_callsign_and_rate() {
        let cfg = SourceConfig {
            executable: "./rbn_cw".into(),
            callsign: "IV3IFZ".into(),
            max_wpm: 18,
            queue_capacity: 16,
        };
        let cmd = SourceCommand::from_config(&cfg);
        assert_eq!(cmd.program, "./rbn_cw");
        assert_eq!(cmd.args, vec!["IV3IFZ", "18"]);
    }

    #[test]
    fn poll_without_process_is_empty() {
        let mut sup = SourceSupervisor::new(echo("x"), 4);
        assert_eq!(sup.state(), SourceState::Dead);
        assert!(sup.poll_line().is_none());
    }

    #[test]
    fn ensure_running_is_idempotent_while_alive() {
        let mut sup = SourceSupervisor::new(SourceCommand::new("sh", ["-c", "sleep 5"]), 4);
        assert!(sup.ensure_running().unwrap());
        assert!(!sup.ensure_running().unwrap());
        assert_eq!(sup.spawn_count(), 1);
        assert_eq!(sup.state(), SourceState::Starting);
        sup.shutdown();
        assert_eq!(sup.state(), SourceState::Dead);
    }

    #[test]
    fn respawns_after_stream_closes() {
        // Each incarnation prints its own pid.
        let mut sup = SourceSupervisor::new(SourceCommand::new("sh", ["-c", "echo $$"]), 16);
        assert!(sup.ensure_running().unwrap());
        let first_pid = sup.pid().unwrap();
        assert_eq!(wait_line(&mut sup), Some(format!("{first_pid}\n")));

        wait_dead(&mut sup);
        assert_eq!(sup.state(), SourceState::Dead);

        assert!(sup.ensure_running().unwrap());
        assert_eq!(sup.spawn_count(), 2);
        let second_pid = sup.pid().unwrap();
        assert_ne!(first_pid, second_pid);
        assert_eq!(wait_line(&mut sup), Some(format!("{second_pid}\n")));
        assert!(sup.poll_line().is_none());
    }

    #[test]
    fn overlong_line_is_dropped_and_reading_resumes() {
        let cmd = SourceCommand::new(
            "sh",
            ["-c", "head -c 5000 /dev/zero | tr '\\0' A; echo; echo A_B_7010.0_12"],
        );
        let mut sup = SourceSupervisor::new(cmd, 16).with_max_line_bytes(64);
        sup.ensure_running().unwrap();

        assert_eq!(wait_line(&mut sup).as_deref(), Some("A_B_7010.0_12\n"));
        assert_eq!(sup.dropped_lines(), 1);
        wait_dead(&mut sup);
        assert!(sup.poll_line().is_none());
    }

    #[test]
    fn line_at_limit_is_kept() {
        // 63 bytes + newline = 64.
        let body = "A".repeat(63);
        let mut sup = SourceSupervisor::new(echo(&body), 4).with_max_line_bytes(64);
        sup.ensure_running().unwrap();
        assert_eq!(wait_line(&mut sup), Some(format!("{body}\n")));
        assert_eq!(sup.dropped_lines(), 0);
    }

    #[test]
    fn full_queue_drops_lines() {
        let cmd = SourceCommand::new(
            "sh",
            ["-c", "for i in 1 2 3 4 5 6; do echo A_B_7010.0_$i; done"],
        );
        let mut sup = SourceSupervisor::new(cmd, 2);
        sup.ensure_running().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while sup.dropped_lines() < 4 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        let mut got = Vec::new();
        while let Some(line) = sup.poll_line() {
            got.push(line);
        }
        assert_eq!(got.len(), 2);
        assert_eq!(sup.dropped_lines(), 4);
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let cmd = SourceCommand::new("/nonexistent/rbn_cw_12345", ["X"]);
        assert!(cmd.resolve().is_err());

        let mut sup = SourceSupervisor::new(cmd, 4);
        assert!(matches!(sup.ensure_running(), Err(FeedError::Spawn { .. })));
        assert_eq!(sup.state(), SourceState::Dead);
    }
}
