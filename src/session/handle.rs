use std::path::Path;
use std::time::Instant;

use crate::backend::{Backend, PatternTable};
use crate::config::SessionOptions;
use crate::process::{EngineError, ProcessSession, SessionState, SessionStats};
use crate::protocol::{drain, encode_query, normalize_goal, run_directive, Solutions, Timeouts};
use crate::term::Solution;

use super::SessionError;

/// A live connection to one engine process.
///
/// All operations take `&mut self`; a query's [`Solutions`] borrows the
/// session until it is exhausted or dropped. The engine is shut down by
/// [`Session::close`] or, failing that, when the session is dropped.
pub struct Session {
    backend: Backend,
    options: SessionOptions,
    table: PatternTable,
    process: ProcessSession,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("process", &self.process)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Spawn the engine for `backend` and wait until it accepts goals.
    ///
    /// # Errors
    ///
    /// `Pattern` for an invalid pattern override, `Spawn` if the executable
    /// cannot be started, or `Engine` if the ready prompt does not appear
    /// within the start-up timeout.
    pub fn open(backend: Backend, options: SessionOptions) -> Result<Self, SessionError> {
        let table = PatternTable::with_overrides(backend, &options.patterns)?;
        let process = start(&table, &options)?;
        Ok(Self {
            backend,
            options,
            table,
            process,
            closed: false,
        })
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.process.state()
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    pub fn is_alive(&mut self) -> bool {
        self.process.is_alive()
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.process.stats()
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn patterns(&self) -> &PatternTable {
        &self.table
    }

    /// Load a source file into the engine.
    ///
    /// # Errors
    ///
    /// Returns the engine's diagnostic if it reports an error while loading.
    pub fn consult_file(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let path = path.as_ref();
        tracing::info!(backend = %self.backend, path = %path.display(), "Consulting file");
        let line = self.table.load_directive(&path.to_string_lossy());
        run_directive(
            &mut self.process,
            &self.table,
            &line,
            self.options.query_timeout_duration(),
        )?;
        Ok(())
    }

    /// Add facts to the engine's database, one directive per fact.
    ///
    /// # Errors
    ///
    /// Stops at the first fact the engine rejects.
    pub fn add_facts<I, S>(&mut self, facts: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for fact in facts {
            self.ensure_ready()?;
            let line = self.table.assert_directive(fact.as_ref());
            run_directive(
                &mut self.process,
                &self.table,
                &line,
                self.options.query_timeout_duration(),
            )?;
        }
        Ok(())
    }

    /// Submit a goal and return its solutions, pulled lazily.
    ///
    /// # Errors
    ///
    /// Fails fast if the goal is empty, the session is not ready, or the
    /// goal cannot be written to the engine.
    pub fn query(&mut self, text: &str) -> Result<Solutions<'_>, SessionError> {
        if normalize_goal(text, self.table.query_terminator()).is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        self.ensure_ready()?;

        let encoded = encode_query(&self.table, text, self.options.module.as_deref());
        tracing::debug!(backend = %self.backend, query = text, "Submitting query");
        self.process.transition(SessionState::QueryPending);
        self.process.machine_mut().record_query();
        self.process.send_line(&encoded.line)?;

        let timeouts = Timeouts {
            first: self.options.query_timeout_duration(),
            next: self.options.continuation_timeout_duration(),
        };
        Ok(Solutions::new(
            &mut self.process,
            &self.table,
            timeouts,
            encoded.variables,
        ))
    }

    /// Whether the goal has at least one solution.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the goal fails with one.
    pub fn ask(&mut self, text: &str) -> Result<bool, SessionError> {
        let mut solutions = self.query(text)?;
        let first = solutions.next();
        let stopped = solutions.stop();
        match first {
            None => stopped.map(|()| false),
            Some(Ok(_)) => stopped.map(|()| true),
            Some(Err(e)) => Err(e),
        }
    }

    /// Collect every solution of a finite goal.
    ///
    /// # Errors
    ///
    /// Returns the first error met while enumerating.
    pub fn query_all(&mut self, text: &str) -> Result<Vec<Solution>, SessionError> {
        self.query(text)?.collect()
    }

    /// Replace the engine process with a fresh one.
    ///
    /// The only way out of `Error` and `Terminated`.
    ///
    /// # Errors
    ///
    /// Same as [`Session::open`]; the session is left `Terminated` on failure.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        tracing::info!(backend = %self.backend, pid = ?self.pid(), "Restarting engine");
        self.shutdown();
        self.process = start(&self.table, &self.options)?;
        self.closed = false;
        Ok(())
    }

    /// Quit the engine and release the process.
    ///
    /// The process is gone when this returns: a quit directive is tried
    /// first, then SIGTERM, then a forced kill once the close grace period
    /// runs out. Failures along the way are logged.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let grace = self.options.close_grace_duration();
        let deadline = Instant::now() + grace;
        tracing::debug!(backend = %self.backend, pid = ?self.pid(), "Closing engine session");

        if self.process.state() == SessionState::Ready {
            match self.process.send_line(self.table.quit_directive()) {
                Ok(()) => {
                    self.process.wait_for_exit(grace);
                }
                Err(e) => tracing::debug!(error = %e, "Quit directive not delivered"),
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(e) = self.process.terminate(remaining) {
            tracing::warn!(
                backend = %self.backend,
                pid = ?self.pid(),
                error = %e,
                "Failed to terminate engine process"
            );
        }
    }

    /// Bring the session to `Ready` before a new operation.
    fn ensure_ready(&mut self) -> Result<(), SessionError> {
        if self.process.state() != SessionState::Terminated && !self.process.is_alive() {
            self.process.transition(SessionState::Terminated);
        }

        match self.process.state() {
            SessionState::Ready => Ok(()),
            SessionState::Terminated => {
                Err(EngineError::terminated("engine process is not running").into())
            }
            state @ (SessionState::Starting | SessionState::Error) => {
                Err(SessionError::NotReady { state })
            }
            state @ (SessionState::QueryPending | SessionState::EnumeratingSolutions) => {
                // Left behind by an earlier timeout.
                tracing::debug!(backend = %self.backend, ?state, "Resynchronizing with engine");
                let timeout = self.options.continuation_timeout_duration();
                let stopped = if state == SessionState::EnumeratingSolutions {
                    self.process.send(self.table.stop_enumeration().as_bytes())
                } else {
                    Ok(())
                };
                let result =
                    stopped.and_then(|()| drain(&mut self.process, &self.table, timeout));
                if let Err(e) = result {
                    if self.process.state() != SessionState::Terminated {
                        self.process.transition(SessionState::Error);
                    }
                    return Err(e.into());
                }
                Ok(())
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the engine and wait for its first ready prompt.
fn start(table: &PatternTable, options: &SessionOptions) -> Result<ProcessSession, SessionError> {
    let command = options.command(table);
    let mut process = ProcessSession::spawn(&command, table.settle())?;
    tracing::info!(
        backend = %table.backend(),
        program = %command.program().display(),
        pid = ?process.pid(),
        "Starting engine session"
    );

    process.await_pattern(&[table.ready_prompt()], options.startup_timeout_duration())?;
    process.transition(SessionState::Ready);

    if options.flora_expert {
        if let Some(directive) = table.expert_directive() {
            run_directive(
                &mut process,
                table,
                &directive,
                options.query_timeout_duration(),
            )?;
        }
    }
    Ok(process)
}
