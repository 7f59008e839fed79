//! One engine process attached to a pseudo-terminal.
//!
//! A reader thread forwards raw pty output over a channel; the owning thread
//! blocks on that channel with a deadline inside [`ProcessSession::await_pattern`],
//! which is the only place the crate ever waits on the engine.

use std::io::{Read, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use regex::bytes::Regex;

use super::output::OutputFilter;
use super::{
    EngineCommand, EngineError, SessionState, SessionStateMachine, SessionStats, SpawnError,
};

/// Interval between liveness polls while waiting for the process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Wide enough that engines never wrap long answers.
const PTY_COLUMNS: u16 = 1024;

/// Result of a successful [`ProcessSession::await_pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index of the matching pattern in the list passed in.
    pub index: usize,
    /// Output preceding the match.
    pub before: String,
    /// The matched text itself.
    pub matched: String,
    /// Capture groups 1.. of the matching pattern.
    pub groups: Vec<Option<String>>,
}

impl Match {
    /// Capture group `n` (1-based), if it participated in the match.
    #[must_use]
    pub fn group(&self, n: usize) -> Option<&str> {
        self.groups.get(n.checked_sub(1)?)?.as_deref()
    }
}

/// A running engine process and its terminal.
pub struct ProcessSession {
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    // Held so the terminal stays open for the lifetime of the session.
    _master: Box<dyn MasterPty + Send>,
    output_rx: mpsc::Receiver<Vec<u8>>,
    filter: OutputFilter,
    buffer: Vec<u8>,
    eof: bool,
    last_sent: Option<String>,
    settle: Duration,
    machine: SessionStateMachine,
}

impl std::fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSession")
            .field("pid", &self.child.process_id())
            .field("state", &self.machine.state())
            .field("buffered", &self.buffer.len())
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl ProcessSession {
    /// Spawn the engine on a fresh pseudo-terminal.
    ///
    /// The session starts in `Starting`; callers wait for the ready prompt.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the executable cannot be resolved or the
    /// terminal cannot be set up.
    pub fn spawn(command: &EngineCommand, settle: Duration) -> Result<Self, SpawnError> {
        let program = command.resolve_program()?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: PTY_COLUMNS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SpawnError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&program);
        cmd.args(command.get_args());
        if let Some(dir) = command.get_working_dir() {
            cmd.cwd(dir);
        }
        cmd.env("TERM", "dumb");
        for (key, value) in command.get_env() {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SpawnError::Pty(e.to_string()))?;
        // Only the child may hold the slave side, so its exit closes the pty.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SpawnError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SpawnError::Pty(e.to_string()))?;

        let (output_tx, output_rx) = mpsc::channel();
        let pid = child.process_id();
        thread::Builder::new()
            .name(format!("pty-reader-{}", pid.unwrap_or_default()))
            .spawn(move || read_loop(reader, &output_tx))?;

        tracing::debug!(program = %program.display(), pid = ?pid, "Spawned engine process");

        Ok(Self {
            child,
            writer,
            _master: pair.master,
            output_rx,
            filter: OutputFilter::new(),
            buffer: Vec::new(),
            eof: false,
            last_sent: None,
            settle,
            machine: SessionStateMachine::new(),
        })
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Move the state machine; see [`SessionStateMachine::transition`].
    pub fn transition(&mut self, to: SessionState) -> bool {
        self.machine.transition(to)
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.machine.stats()
    }

    pub(crate) fn machine_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.machine
    }

    /// Whether the child process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Write raw bytes to the engine.
    ///
    /// # Errors
    ///
    /// Returns `ProcessTerminated` if the terminal can no longer be written.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        if self.state() == SessionState::Terminated {
            return Err(EngineError::terminated("engine process is not running"));
        }
        tracing::trace!(bytes = %String::from_utf8_lossy(bytes).escape_debug(), "Sending to engine");
        let result = self
            .writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush());
        result.map_err(|e| {
            self.machine.transition(SessionState::Terminated);
            EngineError::terminated(format!("write to engine failed: {e}"))
        })
    }

    /// Write one line, remembering it so its echo can be stripped later.
    ///
    /// # Errors
    ///
    /// Returns `ProcessTerminated` if the terminal can no longer be written.
    pub fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        tracing::debug!(line, "Sending line");
        self.last_sent = Some(line.to_string());
        self.send(format!("{line}\n").as_bytes())
    }

    /// Remove the terminal's echo of the last sent line from the start of `text`.
    #[must_use]
    pub fn strip_echo<'t>(&self, text: &'t str) -> &'t str {
        let Some(sent) = self.last_sent.as_deref() else {
            return text;
        };
        match text.find(sent) {
            Some(pos) if text[..pos].trim().is_empty() => &text[pos + sent.len()..],
            _ => text,
        }
    }

    /// Block until one of `patterns` matches buffered output.
    ///
    /// The match starting earliest wins; ties go to the pattern listed first.
    /// Output up to the end of the match is consumed. A match that ends at
    /// the very end of the output received so far is only accepted once the
    /// engine has been quiet for the settle window.
    ///
    /// # Errors
    ///
    /// `Timeout` if nothing matched before `timeout` elapsed (the process is
    /// left running and unconsumed output stays buffered), or
    /// `ProcessTerminated` if the engine exited first.
    pub fn await_pattern(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<Match, EngineError> {
        if self.state() == SessionState::Terminated {
            return Err(EngineError::terminated("engine process is not running"));
        }
        let deadline = Instant::now() + timeout;

        loop {
            if let Some((index, start, end, groups)) = earliest_match(patterns, &self.buffer) {
                let at_end = end == self.buffer.len();
                if !at_end || self.eof || Instant::now() >= deadline {
                    return Ok(self.consume(index, start, end, groups));
                }
                match self.output_rx.recv_timeout(self.settle) {
                    Ok(chunk) => {
                        self.append(&chunk);
                        continue;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        return Ok(self.consume(index, start, end, groups));
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        self.eof = true;
                        continue;
                    }
                }
            }

            if self.eof {
                return Err(self.terminated_error());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error(timeout));
            }
            match self.output_rx.recv_timeout(remaining) {
                Ok(chunk) => self.append(&chunk),
                Err(mpsc::RecvTimeoutError::Timeout) => return Err(self.timeout_error(timeout)),
                Err(mpsc::RecvTimeoutError::Disconnected) => self.eof = true,
            }
        }
    }

    /// Output received but not yet consumed by a match.
    #[must_use]
    pub fn pending_output(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Terminate the process: SIGTERM, then a forced kill once `grace` runs out.
    ///
    /// The child is always reaped, and the session ends in `Terminated`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forced kill or the final wait fails.
    pub fn terminate(&mut self, grace: Duration) -> std::io::Result<()> {
        self.machine.transition(SessionState::Terminated);
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        self.signal_terminate();

        if self.wait_for_exit(grace) {
            return Ok(());
        }
        tracing::debug!(pid = ?self.pid(), "Grace period elapsed, killing engine");
        self.child.kill()?;
        self.child.wait().map(|_| ())
    }

    /// Wait up to `grace` for the process to exit on its own.
    pub(crate) fn wait_for_exit(&mut self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(pid = ?self.pid(), ?status, "Engine exited");
                    return true;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to poll engine process");
                    return false;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    #[cfg(unix)]
    fn signal_terminate(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.pid() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            if let Err(e) = kill(nix_pid, Signal::SIGTERM) {
                tracing::debug!(pid, error = %e, "SIGTERM failed");
            }
        }
    }

    fn append(&mut self, chunk: &[u8]) {
        tracing::trace!(chunk = %String::from_utf8_lossy(chunk).escape_debug(), "Engine output");
        self.filter.push(chunk, &mut self.buffer);
    }

    fn consume(&mut self, index: usize, start: usize, end: usize, groups: Vec<Option<String>>) -> Match {
        let before = String::from_utf8_lossy(&self.buffer[..start]).into_owned();
        let matched = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
        self.buffer.drain(..end);
        Match {
            index,
            before,
            matched,
            groups,
        }
    }

    fn timeout_error(&self, timeout: Duration) -> EngineError {
        EngineError::timeout(format!(
            "no expected output within {}ms; pending output: {:?}",
            timeout.as_millis(),
            self.pending_output()
        ))
    }

    fn terminated_error(&mut self) -> EngineError {
        let status = self.child.try_wait().ok().flatten();
        self.machine.transition(SessionState::Terminated);
        let pending = self.pending_output();
        match status {
            Some(status) => EngineError::terminated(format!(
                "engine exited ({status:?}); last output: {:?}",
                pending.trim()
            )),
            None => EngineError::terminated(format!(
                "engine closed its terminal; last output: {:?}",
                pending.trim()
            )),
        }
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            if let Err(e) = self.terminate(Duration::ZERO) {
                tracing::warn!(pid = ?self.pid(), error = %e, "Failed to kill engine process");
            }
        }
    }
}

type Found = (usize, usize, usize, Vec<Option<String>>);

fn earliest_match(patterns: &[&Regex], haystack: &[u8]) -> Option<Found> {
    let mut best: Option<Found> = None;
    for (index, pattern) in patterns.iter().enumerate() {
        let Some(caps) = pattern.captures(haystack) else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if best.as_ref().is_some_and(|b| b.1 <= whole.start()) {
            continue;
        }
        let groups = caps
            .iter()
            .skip(1)
            .map(|g| g.map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned()))
            .collect();
        best = Some((index, whole.start(), whole.end(), groups));
    }
    best
}

fn read_loop(mut reader: Box<dyn Read + Send>, tx: &mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                // Linux reports EIO once the last slave descriptor closes.
                tracing::trace!(error = %e, "Terminal reader finished");
                break;
            }
        }
    }
}
