//! Canonical text output for terms.
//!
//! Operators are always written in functional notation and atoms are quoted
//! whenever a reader would otherwise see something else, so that the output
//! parses back to the same term.

use std::fmt::{self, Write};

use super::Term;

const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

fn atom_needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if first.is_lowercase() {
        return !name.chars().all(|c| c.is_alphanumeric() || c == '_');
    }
    if matches!(name, "!" | ";" | "{}") {
        return false;
    }
    if name.chars().all(|c| SYMBOL_CHARS.contains(c)) {
        // A lone dot would read as end of clause, `/*` as a comment.
        return name == "." || name.starts_with("/*");
    }
    true
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    f.write_char(quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn write_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if atom_needs_quotes(name) {
        write_quoted(f, name, '\'')
    } else {
        f.write_str(name)
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(name) => write_atom(f, name),
            Self::Number(n) => write!(f, "{n}"),
            Self::Variable(name) => f.write_str(name),
            Self::Str(text) => write_quoted(f, text, '"'),
            Self::Compound { functor, args } => {
                write_atom(f, functor)?;
                f.write_char('(')?;
                write_items(f, args)?;
                f.write_char(')')
            }
            Self::List { items, tail } => {
                f.write_char('[')?;
                write_items(f, items)?;
                if let Some(tail) = tail {
                    write!(f, "|{tail}")?;
                }
                f.write_char(']')
            }
        }
    }
}
