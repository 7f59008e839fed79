//! Engine session state machine.

use serde::{Deserialize, Serialize};

/// Current state of an engine session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Starting,
    Ready,
    QueryPending,
    EnumeratingSolutions,
    Error,
    Terminated,
}

impl SessionState {
    /// States that only `restart` can leave.
    #[must_use]
    pub fn is_absorbing(self) -> bool {
        matches!(self, Self::Error | Self::Terminated)
    }

    fn allows(self, to: Self) -> bool {
        use SessionState::{EnumeratingSolutions, Error, QueryPending, Ready, Starting, Terminated};
        match (self, to) {
            (_, Starting) | (_, Terminated) => true,
            (Terminated, _) => false,
            (Starting, Ready | Error) => true,
            (Ready, Ready | QueryPending | Error) => true,
            (QueryPending, EnumeratingSolutions | Ready | Error) => true,
            (EnumeratingSolutions, EnumeratingSolutions | Ready | Error) => true,
            (Error, Ready) => true,
            _ => false,
        }
    }
}

/// State machine for tracking session progress.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
    queries: usize,
    solutions: usize,
    errors: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Starting,
            queries: 0,
            solutions: 0,
            errors: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `new_state`.
    ///
    /// Returns `false` and leaves the state untouched when the transition is
    /// not part of the machine (for example, anything out of `Terminated`
    /// other than a restart).
    pub fn transition(&mut self, new_state: SessionState) -> bool {
        if !self.state.allows(new_state) {
            tracing::warn!(from = ?self.state, to = ?new_state, "Rejected state transition");
            return false;
        }
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
        true
    }

    pub fn record_query(&mut self) {
        self.queries = self.queries.saturating_add(1);
    }

    pub fn record_solution(&mut self) {
        self.solutions = self.solutions.saturating_add(1);
    }

    pub fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            queries: self.queries,
            solutions: self.solutions,
            errors: self.errors,
        }
    }
}

/// Session statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: usize,
    pub solutions: usize,
    pub errors: usize,
}
