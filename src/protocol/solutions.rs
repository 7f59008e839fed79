//! Lazy enumeration of the solutions of one query.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::time::Duration;

use crate::backend::{PatternTable, ReplyMode};
use crate::process::{EngineError, EngineErrorKind, Match, ProcessSession, SessionState};
use crate::session::SessionError;
use crate::term::{parse_bindings, ParseError, Solution};

use super::reply::{collect_error, drain, error_kind, parse_batch_reply};

/// Wait limits for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Until the first reply to the query.
    pub first: Duration,
    /// Until each further solution, and for winding down.
    pub next: Duration,
}

#[derive(Debug)]
enum Phase {
    /// Query sent; nothing seen yet.
    AwaitFirst,
    /// A record was read; waiting to learn whether the engine offers more.
    AwaitMore(Result<Solution, ParseError>),
    /// The engine is waiting at its "more?" prompt.
    Enumerating,
    /// The next-solution sequence was sent.
    AwaitNext,
    /// End of solutions seen; waiting for the ready prompt.
    Draining,
    /// Batch reply decoded; yielding from memory.
    Buffered(VecDeque<Result<Solution, ParseError>>),
    Done,
}

/// The solutions of one query, pulled from the engine on demand.
///
/// At most one `Solutions` exists per session at a time since it holds the
/// session mutably. Dropping it before exhaustion tells the engine to stop
/// and waits for the ready prompt; use [`Solutions::stop`] to observe
/// failures of that step.
///
/// A pull that times out yields `Err` and leaves the sequence where it was,
/// so pulling again retries the same wait. Once exhausted, or after the
/// engine process is lost, every pull yields `None`.
pub struct Solutions<'a> {
    process: &'a mut ProcessSession,
    table: &'a PatternTable,
    timeouts: Timeouts,
    variables: Vec<String>,
    phase: Phase,
}

impl std::fmt::Debug for Solutions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solutions")
            .field("backend", &self.table.backend())
            .field("variables", &self.variables)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<'a> Solutions<'a> {
    /// Wrap a query that has already been sent.
    pub(crate) fn new(
        process: &'a mut ProcessSession,
        table: &'a PatternTable,
        timeouts: Timeouts,
        variables: Vec<String>,
    ) -> Self {
        Self {
            process,
            table,
            timeouts,
            variables,
            phase: Phase::AwaitFirst,
        }
    }

    /// Variables the query reports, in order of first appearance.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Whether a further pull could still yield a solution. Never waits: an
    /// engine that answered deterministically reports `false` right after
    /// its last solution.
    #[must_use]
    pub fn may_have_more(&self) -> bool {
        !matches!(self.phase, Phase::Done | Phase::Draining)
    }

    /// Stop enumerating and wait until the engine is ready again.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not come back to its prompt; the
    /// session is then left in `Error` (or `Terminated`).
    pub fn stop(mut self) -> Result<(), SessionError> {
        self.release().map_err(Into::into)
    }

    fn release(&mut self) -> Result<(), EngineError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Done);
        if self.process.state() == SessionState::Terminated {
            return Ok(());
        }
        let result = match phase {
            Phase::Done | Phase::Buffered(_) => return Ok(()),
            Phase::Enumerating => {
                match self.process.send(self.table.stop_enumeration().as_bytes()) {
                    Ok(()) => drain(self.process, self.table, self.timeouts.next),
                    Err(e) => Err(e),
                }
            }
            Phase::AwaitFirst | Phase::AwaitMore(_) | Phase::AwaitNext | Phase::Draining => {
                drain(self.process, self.table, self.timeouts.next)
            }
        };
        if result.is_err() && self.process.state() != SessionState::Terminated {
            self.process.transition(SessionState::Error);
        }
        result
    }

    /// Turn a failed wait into an item, keeping `retry` as the phase when
    /// the failure was a timeout.
    fn fail(&mut self, error: EngineError, retry: Phase) -> Option<Result<Solution, SessionError>> {
        if error.kind == EngineErrorKind::Timeout {
            self.phase = retry;
        }
        Some(Err(error.into()))
    }

    fn engine_error(&mut self, found: &Match, timeout: Duration) -> SessionError {
        let kind = error_kind(found.index, 3);
        collect_error(self.process, self.table, kind, found, timeout).into()
    }

    /// Wait for the next boundary of an interactive reply.
    fn await_boundary(
        &mut self,
        timeout: Duration,
        retry: Phase,
    ) -> Option<Result<Solution, SessionError>> {
        let table = self.table;
        let found = match self.process.await_pattern(
            &[
                table.solution_record(),
                table.end_of_solutions(),
                table.ready_prompt(),
                table.syntax_error(),
                table.runtime_error(),
            ],
            timeout,
        ) {
            Ok(found) => found,
            Err(e) => return self.fail(e, retry),
        };

        match found.index {
            0 => {
                let record = found.group(1).unwrap_or_default();
                let parsed = parse_bindings(
                    record,
                    table.variable_style(),
                    table.binding_separator(),
                );
                self.await_continuation(parsed, timeout)
            }
            1 => self.await_ready(timeout),
            2 => {
                self.process.transition(SessionState::Ready);
                None
            }
            _ => Some(Err(self.engine_error(&found, timeout))),
        }
    }

    /// After a record, learn whether the engine waits for "more?".
    fn await_continuation(
        &mut self,
        parsed: Result<Solution, ParseError>,
        timeout: Duration,
    ) -> Option<Result<Solution, SessionError>> {
        let table = self.table;
        let Some(more) = table.more_prompt() else {
            // Nothing to answer; the next pull only waits for the prompt.
            self.phase = Phase::Draining;
            return Some(self.yield_solution(parsed));
        };

        let found = match self.process.await_pattern(
            &[
                more,
                table.ready_prompt(),
                table.syntax_error(),
                table.runtime_error(),
            ],
            timeout,
        ) {
            Ok(found) => found,
            Err(e) => return self.fail(e, Phase::AwaitMore(parsed)),
        };

        match found.index {
            0 => {
                self.process.transition(SessionState::EnumeratingSolutions);
                self.phase = Phase::Enumerating;
                Some(self.yield_solution(parsed))
            }
            1 => {
                self.process.transition(SessionState::Ready);
                Some(self.yield_solution(parsed))
            }
            index => {
                let kind = error_kind(index, 2);
                let error = collect_error(self.process, table, kind, &found, timeout);
                Some(Err(error.into()))
            }
        }
    }

    /// Wait for the ready prompt that closes the reply.
    fn await_ready(&mut self, timeout: Duration) -> Option<Result<Solution, SessionError>> {
        let table = self.table;
        match self.process.await_pattern(&[table.ready_prompt()], timeout) {
            Ok(_) => {
                self.process.transition(SessionState::Ready);
                None
            }
            Err(e) => self.fail(e, Phase::Draining),
        }
    }

    fn yield_solution(
        &mut self,
        parsed: Result<Solution, ParseError>,
    ) -> Result<Solution, SessionError> {
        if parsed.is_ok() {
            self.process.machine_mut().record_solution();
        }
        parsed.map_err(Into::into)
    }

    /// Read a batch engine's complete reply.
    fn collect_batch(&mut self) -> Option<Result<Solution, SessionError>> {
        let table = self.table;
        let timeout = self.timeouts.first;
        let found = match self.process.await_pattern(
            &[
                table.ready_prompt(),
                table.syntax_error(),
                table.runtime_error(),
            ],
            timeout,
        ) {
            Ok(found) => found,
            Err(e) => return self.fail(e, Phase::AwaitFirst),
        };
        if found.index != 0 {
            let kind = error_kind(found.index, 1);
            let error = collect_error(self.process, table, kind, &found, timeout);
            return Some(Err(error.into()));
        }

        self.process.transition(SessionState::Ready);
        let reply = self.process.strip_echo(&found.before).to_string();
        let queue: VecDeque<_> = parse_batch_reply(table, &reply).into();
        tracing::debug!(
            backend = %table.backend(),
            solutions = queue.len(),
            "Decoded batch reply"
        );
        self.pop_buffered(queue)
    }

    fn pop_buffered(
        &mut self,
        mut queue: VecDeque<Result<Solution, ParseError>>,
    ) -> Option<Result<Solution, SessionError>> {
        let item = queue.pop_front()?;
        if !queue.is_empty() {
            self.phase = Phase::Buffered(queue);
        }
        Some(self.yield_solution(item))
    }
}

impl Iterator for Solutions<'_> {
    type Item = Result<Solution, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Done => None,
            Phase::Buffered(queue) => self.pop_buffered(queue),
            Phase::AwaitFirst => match self.table.reply_mode() {
                ReplyMode::Batch => self.collect_batch(),
                ReplyMode::Interactive => {
                    self.await_boundary(self.timeouts.first, Phase::AwaitFirst)
                }
            },
            Phase::AwaitMore(parsed) => self.await_continuation(parsed, self.timeouts.next),
            Phase::Enumerating => {
                if let Err(e) = self.process.send(self.table.next_solution().as_bytes()) {
                    return Some(Err(e.into()));
                }
                self.await_boundary(self.timeouts.next, Phase::AwaitNext)
            }
            Phase::AwaitNext => self.await_boundary(self.timeouts.next, Phase::AwaitNext),
            Phase::Draining => self.await_ready(self.timeouts.next),
        }
    }
}

impl FusedIterator for Solutions<'_> {}

impl Drop for Solutions<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(
                backend = %self.table.backend(),
                error = %e,
                "Failed to stop enumeration cleanly"
            );
        }
    }
}
