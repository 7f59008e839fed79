//! Colored CLI display utilities for query output.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::backend::Backend;
use crate::term::Solution;

/// Truncate a string to a maximum number of characters, adding an ellipsis
/// if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Render one solution as `X = bob, Y = 1`, or `true` when nothing is bound.
#[must_use]
pub fn format_solution(solution: &Solution, raw_mode: bool) -> String {
    if solution.is_empty() {
        return "true".to_string();
    }
    solution
        .iter()
        .map(|(name, term)| format!("{name} = {}", truncate(&term.to_string(), 200, raw_mode)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print session start information.
pub fn print_session_start(backend: Backend, pid: Option<u32>) {
    println!(
        "{} backend={}, pid={}",
        "[SESSION]".blue().bold(),
        backend.cyan(),
        pid.map_or_else(|| "?".to_string(), |p| p.to_string()).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a consulted file.
pub fn print_consulted(path: &str) {
    println!("{} {}", "[CONSULT]".cyan().bold(), path);
    let _ = io::stdout().flush();
}

/// Print one solution.
pub fn print_solution(index: usize, solution: &Solution, raw_mode: bool) {
    println!(
        "{} {}",
        format!("[{index}]").green().bold(),
        format_solution(solution, raw_mode)
    );
    let _ = io::stdout().flush();
}

/// Print one solution as a single-line JSON object.
///
/// # Errors
///
/// Returns an error if the solution cannot be serialized.
pub fn print_solution_json(solution: &Solution) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(solution)?);
    let _ = io::stdout().flush();
    Ok(())
}

/// Print the end of a query.
pub fn print_summary(count: usize, limited: bool) {
    let label = if count == 0 {
        "false".red().bold().to_string()
    } else if limited {
        format!("{count} solution(s), more may exist").yellow().to_string()
    } else {
        format!("{count} solution(s)").dimmed().to_string()
    };
    println!("{} {label}", "[DONE]".blue().bold());
    let _ = io::stdout().flush();
}

/// Print an error.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message.red());
}
