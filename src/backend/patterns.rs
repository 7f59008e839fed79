//! Per-backend recognizer patterns and syntax constants.
//!
//! All knowledge about how a particular engine prompts, reports errors and
//! separates solutions lives here. The defaults were captured from the
//! engines' interactive toplevels; since prompts drift between releases,
//! every pattern can be replaced through [`PatternOverrides`].
//!
//! Known limitation: output printed by the user's own program that happens to
//! match one of these patterns is indistinguishable from engine control text.

use std::time::Duration;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use super::Backend;

/// Default quiet period before an end-of-output prompt match is trusted.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(40);

/// First half of the solution record marker; printed separately from its
/// second half so the echoed query line never contains a complete marker.
pub(crate) const RECORD_PREFIX: &str = "@@";
pub(crate) const RECORD_BEGIN: &str = "SOL";
pub(crate) const RECORD_END: &str = "END";

/// How an engine delivers multiple solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// One answer at a time; the engine waits for a "more?" response.
    Interactive,
    /// All answers are printed before the ready prompt returns.
    Batch,
}

/// Lexical rule that tells variables apart from atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStyle {
    /// Leading uppercase letter or underscore (`X`, `_G12`).
    Prolog,
    /// Leading question mark (`?x`).
    Flora,
}

impl VariableStyle {
    /// Prefix printed in front of variable names in binding lines.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Prolog => "",
            Self::Flora => "?",
        }
    }
}

/// Error compiling one of the table's regular expressions.
#[derive(thiserror::Error, Debug)]
#[error("Invalid {name} pattern: {source}")]
pub struct PatternError {
    /// Which pattern failed.
    pub name: &'static str,
    #[source]
    pub source: regex::Error,
}

/// User-supplied replacements for the default patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternOverrides {
    pub ready_prompt: Option<String>,
    pub more_prompt: Option<String>,
    pub end_of_solutions: Option<String>,
    pub syntax_error: Option<String>,
    pub runtime_error: Option<String>,
    pub next_solution: Option<String>,
    pub stop_enumeration: Option<String>,
    pub binding_separator: Option<String>,
    pub settle_ms: Option<u64>,
}

/// Compiled recognizers and syntax constants for one backend.
#[derive(Debug, Clone)]
pub struct PatternTable {
    backend: Backend,
    ready_prompt: Regex,
    more_prompt: Option<Regex>,
    end_of_solutions: Regex,
    syntax_error: Regex,
    runtime_error: Regex,
    solution_record: Regex,
    query_terminator: String,
    next_solution: String,
    stop_enumeration: String,
    binding_separator: String,
    quit_directive: String,
    variable_style: VariableStyle,
    reply_mode: ReplyMode,
    default_executable: String,
    default_args: Vec<String>,
    settle: Duration,
}

struct Defaults {
    ready_prompt: &'static str,
    more_prompt: Option<&'static str>,
    end_of_solutions: &'static str,
    syntax_error: &'static str,
    runtime_error: &'static str,
    next_solution: &'static str,
    stop_enumeration: &'static str,
    quit_directive: &'static str,
    executable: &'static str,
    args: &'static [&'static str],
}

fn defaults(backend: Backend) -> Defaults {
    match backend {
        Backend::Xsb => Defaults {
            ready_prompt: r"\| \?- ",
            more_prompt: Some(r"(?m)^[A-Z_][A-Za-z0-9_]* = [^\n]*\z"),
            end_of_solutions: r"(?m)^no$",
            syntax_error: r"\+\+Error[^\n]*(?i:syntax)[^\n]*",
            runtime_error: r"\+\+Error[^\n]*",
            next_solution: ";\n",
            stop_enumeration: "\n",
            quit_directive: "halt.",
            executable: "xsb",
            args: &["--nobanner", "--quietload"],
        },
        Backend::Swi => Defaults {
            ready_prompt: r"(?m)^\?- ",
            more_prompt: Some(r"(?:true|[^\s.,=]) \z"),
            end_of_solutions: r"(?m)^false\.",
            syntax_error: r"ERROR:[^\n]*[Ss]yntax error[^\n]*",
            runtime_error: r"ERROR:[^\n]*",
            next_solution: ";",
            stop_enumeration: ".",
            quit_directive: "halt.",
            executable: "swipl",
            args: &["-q", "+tty"],
        },
        Backend::Eclipse => Defaults {
            ready_prompt: r"\[eclipse \d+\]: ",
            more_prompt: Some(r"maybe more\) \? \z"),
            end_of_solutions: r"(?m)^No \(",
            syntax_error: r"(?m)^[^\n]*syntax error[^\n]*",
            runtime_error: r"(?m)^[^\n]*\bAbort\b[^\n]*",
            next_solution: ";",
            stop_enumeration: "\n",
            quit_directive: "halt.",
            executable: "eclipse",
            args: &[],
        },
        Backend::Flora2 => Defaults {
            ready_prompt: r"flora2 \?- ",
            more_prompt: None,
            end_of_solutions: r"(?m)^No$",
            syntax_error: r"\+\+Error[^\n]*(?i:syntax|parser)[^\n]*",
            runtime_error: r"\+\+Error[^\n]*",
            next_solution: "",
            stop_enumeration: "",
            quit_directive: r"\halt.",
            executable: "runflora",
            args: &["--nobanner", "--quietload"],
        },
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|source| PatternError { name, source })
}

impl PatternTable {
    /// Build the default table for a backend.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` if a built-in pattern fails to compile.
    pub fn for_backend(backend: Backend) -> Result<Self, PatternError> {
        Self::with_overrides(backend, &PatternOverrides::default())
    }

    /// Build a table for a backend, replacing defaults with any overrides.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` naming the first pattern that fails to compile.
    pub fn with_overrides(
        backend: Backend,
        overrides: &PatternOverrides,
    ) -> Result<Self, PatternError> {
        let d = defaults(backend);
        let pick = |over: &Option<String>, default: &str| {
            over.clone().unwrap_or_else(|| default.to_string())
        };

        let more_prompt = match (&overrides.more_prompt, d.more_prompt) {
            (Some(p), _) => Some(compile("more prompt", p)?),
            (None, Some(p)) => Some(compile("more prompt", p)?),
            (None, None) => None,
        };
        let reply_mode = if more_prompt.is_some() {
            ReplyMode::Interactive
        } else {
            ReplyMode::Batch
        };
        let variable_style = if backend.is_prolog() {
            VariableStyle::Prolog
        } else {
            VariableStyle::Flora
        };

        Ok(Self {
            backend,
            ready_prompt: compile(
                "ready prompt",
                &pick(&overrides.ready_prompt, d.ready_prompt),
            )?,
            more_prompt,
            end_of_solutions: compile(
                "end of solutions",
                &pick(&overrides.end_of_solutions, d.end_of_solutions),
            )?,
            syntax_error: compile(
                "syntax error",
                &pick(&overrides.syntax_error, d.syntax_error),
            )?,
            runtime_error: compile(
                "runtime error",
                &pick(&overrides.runtime_error, d.runtime_error),
            )?,
            solution_record: compile(
                "solution record",
                &format!(
                    r"(?s){RECORD_PREFIX}{RECORD_BEGIN}\n(.*?){RECORD_PREFIX}{RECORD_END}\n?"
                ),
            )?,
            query_terminator: ".".to_string(),
            next_solution: pick(&overrides.next_solution, d.next_solution),
            stop_enumeration: pick(&overrides.stop_enumeration, d.stop_enumeration),
            binding_separator: pick(&overrides.binding_separator, " = "),
            quit_directive: d.quit_directive.to_string(),
            variable_style,
            reply_mode,
            default_executable: d.executable.to_string(),
            default_args: d.args.iter().map(|s| (*s).to_string()).collect(),
            settle: overrides
                .settle_ms
                .map_or(DEFAULT_SETTLE, Duration::from_millis),
        })
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Prompt printed when the engine is idle and accepts a new goal.
    #[must_use]
    pub fn ready_prompt(&self) -> &Regex {
        &self.ready_prompt
    }

    /// Prompt printed while the engine waits for "more solutions?".
    ///
    /// `None` for batch engines.
    #[must_use]
    pub fn more_prompt(&self) -> Option<&Regex> {
        self.more_prompt.as_ref()
    }

    #[must_use]
    pub fn end_of_solutions(&self) -> &Regex {
        &self.end_of_solutions
    }

    #[must_use]
    pub fn syntax_error(&self) -> &Regex {
        &self.syntax_error
    }

    #[must_use]
    pub fn runtime_error(&self) -> &Regex {
        &self.runtime_error
    }

    /// Machine-readable block printed once per solution by wrapped goals.
    /// Capture group 1 holds the binding lines.
    #[must_use]
    pub fn solution_record(&self) -> &Regex {
        &self.solution_record
    }

    #[must_use]
    pub fn query_terminator(&self) -> &str {
        &self.query_terminator
    }

    /// Bytes sent to ask for the next solution.
    #[must_use]
    pub fn next_solution(&self) -> &str {
        &self.next_solution
    }

    /// Bytes sent to decline further solutions.
    #[must_use]
    pub fn stop_enumeration(&self) -> &str {
        &self.stop_enumeration
    }

    #[must_use]
    pub fn binding_separator(&self) -> &str {
        &self.binding_separator
    }

    #[must_use]
    pub fn quit_directive(&self) -> &str {
        &self.quit_directive
    }

    #[must_use]
    pub fn variable_style(&self) -> VariableStyle {
        self.variable_style
    }

    #[must_use]
    pub fn reply_mode(&self) -> ReplyMode {
        self.reply_mode
    }

    #[must_use]
    pub fn default_executable(&self) -> &str {
        &self.default_executable
    }

    #[must_use]
    pub fn default_args(&self) -> &[String] {
        &self.default_args
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Directive that loads a source file into the engine.
    #[must_use]
    pub fn load_directive(&self, path: &str) -> String {
        format!("[{}]{}", quote_atom(path), self.query_terminator)
    }

    /// Directive that adds one fact to the engine's database.
    #[must_use]
    pub fn assert_directive(&self, fact: &str) -> String {
        let fact = fact.trim().trim_end_matches('.');
        match self.backend {
            Backend::Flora2 => format!("insert{{{fact}}}{}", self.query_terminator),
            _ => format!("assertz(({fact})){}", self.query_terminator),
        }
    }

    /// Directive that switches Flora-2 into expert mode.
    #[must_use]
    pub fn expert_directive(&self) -> Option<String> {
        match self.backend {
            Backend::Flora2 => Some(format!("expert{{yes}}{}", self.query_terminator)),
            _ => None,
        }
    }
}

/// Quote text as a Prolog atom, escaping quotes and backslashes.
#[must_use]
pub fn quote_atom(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
