//! Shared reply handling: directives, error collection, resynchronization
//! and batch reply decoding.

use std::time::Duration;

use crate::backend::PatternTable;
use crate::process::{EngineError, EngineErrorKind, Match, ProcessSession, SessionState};
use crate::term::{parse_bindings, ParseError, Solution};

/// Rounds of "stop" a draining engine is given before it is declared stuck.
const MAX_DRAIN_ROUNDS: usize = 8;

/// Turn an error-marker match into an `EngineError`, then wait for the ready
/// prompt so the session can be used again.
///
/// The session passes through `Error`; it is back in `Ready` only if the
/// prompt reappears within `timeout`.
pub(crate) fn collect_error(
    process: &mut ProcessSession,
    table: &PatternTable,
    kind: EngineErrorKind,
    found: &Match,
    timeout: Duration,
) -> EngineError {
    process.transition(SessionState::Error);
    process.machine_mut().record_error();

    let mut diagnostic = process.strip_echo(&found.before).trim().to_string();
    if !diagnostic.is_empty() {
        diagnostic.push('\n');
    }
    diagnostic.push_str(found.matched.trim_end());

    match process.await_pattern(&[table.ready_prompt()], timeout) {
        Ok(ready) => {
            let rest = ready.before.trim();
            if !rest.is_empty() {
                diagnostic.push('\n');
                diagnostic.push_str(rest);
            }
            process.transition(SessionState::Ready);
        }
        Err(e) => {
            tracing::warn!(
                backend = %table.backend(),
                error = %e,
                "Engine did not return to its prompt after an error"
            );
        }
    }

    tracing::debug!(backend = %table.backend(), ?kind, diagnostic, "Engine reported an error");
    EngineError::new(kind, diagnostic)
}

/// Classify an error match by its position in `[.., syntax, runtime]`.
pub(crate) fn error_kind(index: usize, syntax_index: usize) -> EngineErrorKind {
    if index == syntax_index {
        EngineErrorKind::Syntax
    } else {
        EngineErrorKind::Runtime
    }
}

/// Send a directive and wait for the engine to accept or reject it.
///
/// Success is the ready prompt appearing before any error marker.
pub(crate) fn run_directive(
    process: &mut ProcessSession,
    table: &PatternTable,
    line: &str,
    timeout: Duration,
) -> Result<(), EngineError> {
    process.transition(SessionState::QueryPending);
    process.send_line(line)?;

    let found = process.await_pattern(
        &[table.ready_prompt(), table.syntax_error(), table.runtime_error()],
        timeout,
    )?;
    if found.index == 0 {
        process.transition(SessionState::Ready);
        return Ok(());
    }
    Err(collect_error(
        process,
        table,
        error_kind(found.index, 1),
        &found,
        timeout,
    ))
}

/// Bring a busy engine back to its ready prompt, declining any further
/// solutions it offers on the way.
pub(crate) fn drain(
    process: &mut ProcessSession,
    table: &PatternTable,
    timeout: Duration,
) -> Result<(), EngineError> {
    for _ in 0..MAX_DRAIN_ROUNDS {
        let found = match table.more_prompt() {
            Some(more) => process.await_pattern(&[table.ready_prompt(), more], timeout)?,
            None => process.await_pattern(&[table.ready_prompt()], timeout)?,
        };
        if found.index == 0 {
            process.transition(SessionState::Ready);
            return Ok(());
        }
        process.send(table.stop_enumeration().as_bytes())?;
    }
    Err(EngineError::timeout(
        "engine kept offering solutions after enumeration was stopped",
    ))
}

/// Decode the complete reply of a batch engine.
///
/// Binding lines are grouped into solutions: a blank line, a non-binding line
/// or a repeated variable starts a new group. A reply without bindings is a
/// single empty solution unless it carries the end-of-solutions marker.
pub(crate) fn parse_batch_reply(
    table: &PatternTable,
    text: &str,
) -> Vec<Result<Solution, ParseError>> {
    let style = table.variable_style();
    let separator = table.binding_separator();

    let mut groups: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut names: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        match binding_name(line, style.prefix(), separator) {
            Some(name) => {
                if names.contains(&name) {
                    groups.push(std::mem::take(&mut current));
                    names.clear();
                }
                names.push(name);
                current.push_str(line);
                current.push('\n');
            }
            None => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                names.clear();
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    if groups.is_empty() {
        if table.end_of_solutions().is_match(text.as_bytes()) {
            return Vec::new();
        }
        return vec![Ok(Solution::new())];
    }

    groups
        .iter()
        .map(|group| parse_bindings(group, style, separator))
        .collect()
}

fn binding_name<'t>(line: &'t str, prefix: &str, separator: &str) -> Option<&'t str> {
    let rest = line.strip_prefix(prefix)?;
    let sep = separator.trim();
    let at = rest.find(if sep.is_empty() { separator } else { sep })?;
    let name = rest[..at].trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}
