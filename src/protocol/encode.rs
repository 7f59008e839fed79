//! Translation of a backend-neutral goal into the line an engine is sent.

use crate::backend::{
    quote_atom, Backend, PatternTable, ReplyMode, VariableStyle, RECORD_BEGIN, RECORD_END,
    RECORD_PREFIX,
};

/// A goal ready to be written to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuery {
    /// Exact line sent, without the trailing newline.
    pub line: String,
    /// Reported variables, without prefix, in first-appearance order.
    pub variables: Vec<String>,
}

/// Encode `text` for the table's backend.
///
/// A leading `?-` and a trailing terminator are dropped, the goal is
/// module-qualified when `module` is given, and for interactive engines it is
/// wrapped so that every solution prints a solution record.
#[must_use]
pub fn encode_query(table: &PatternTable, text: &str, module: Option<&str>) -> EncodedQuery {
    let goal = normalize_goal(text, table.query_terminator());
    let variables = extract_variables(goal, table.variable_style());
    let goal = match module {
        Some(m) if !m.is_empty() => qualify(table.backend(), goal, m),
        _ => goal.to_string(),
    };

    let line = match table.reply_mode() {
        ReplyMode::Batch => format!("{goal}{}", table.query_terminator()),
        ReplyMode::Interactive => wrap_goal(table, &goal, &variables),
    };

    EncodedQuery { line, variables }
}

/// Strip surrounding whitespace, a `?-` prefix and one trailing terminator.
pub(crate) fn normalize_goal<'t>(text: &'t str, terminator: &str) -> &'t str {
    let goal = text.trim();
    let goal = goal.strip_prefix("?-").map_or(goal, str::trim_start);
    goal.strip_suffix(terminator).map_or(goal, str::trim_end)
}

fn qualify(backend: Backend, goal: &str, module: &str) -> String {
    match backend {
        Backend::Swi | Backend::Xsb => format!("{module}:({goal})"),
        Backend::Eclipse => format!("({goal})@{module}"),
        Backend::Flora2 => format!("{goal}@{module}"),
    }
}

fn wrap_goal(table: &PatternTable, goal: &str, variables: &[String]) -> String {
    let prefix = quote_atom(RECORD_PREFIX);
    let mut line = format!("({goal}), write({prefix}), write('{RECORD_BEGIN}'), nl");
    for name in variables {
        let label = quote_atom(&format!("{name}{}", table.binding_separator()));
        line.push_str(&format!(", write({label}), write_canonical({name}), nl"));
    }
    line.push_str(&format!(
        ", write({prefix}), write('{RECORD_END}'), nl{}",
        table.query_terminator()
    ));
    line
}

/// Names of the non-anonymous variables in `goal`, in order of first
/// appearance, without duplicates.
///
/// Quoted atoms, strings, character codes and comments are skipped.
#[must_use]
pub fn extract_variables(goal: &str, style: VariableStyle) -> Vec<String> {
    let chars: Vec<char> = goal.chars().collect();
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => i = skip_quoted(&chars, i),
            '%' => i = skip_line(&chars, i),
            '/' if chars.get(i + 1) == Some(&'*') => i = skip_block_comment(&chars, i),
            '/' if style == VariableStyle::Flora && chars.get(i + 1) == Some(&'/') => {
                i = skip_line(&chars, i);
            }
            '0' if chars.get(i + 1) == Some(&'\'') => {
                // Character code such as 0'a or 0'\n.
                i += if chars.get(i + 2) == Some(&'\\') { 4 } else { 3 };
            }
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                if style == VariableStyle::Prolog && (c.is_uppercase() || c == '_') {
                    let name: String = chars[start..i].iter().collect();
                    push_unique(&mut names, name);
                }
            }
            '?' if style == VariableStyle::Flora => {
                let start = i + 1;
                i = start;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                if i > start {
                    let name: String = chars[start..i].iter().collect();
                    push_unique(&mut names, name);
                }
            }
            _ => i += 1,
        }
    }

    names
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !name.starts_with('_') && !names.contains(&name) {
        names.push(name);
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn skip_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    chars.len()
}

fn skip_line(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |p| start + p + 1)
}

fn skip_block_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}
