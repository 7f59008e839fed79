//! Logic term and solution values.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i128),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            // SWI's spelling of the non-finite floats, which it also reads back.
            Self::Float(x) if x.is_nan() => f.write_str("1.5NaN"),
            Self::Float(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_negative() { "-1.0Inf" } else { "1.0Inf" })
            }
            Self::Float(x) => {
                // Prolog readers require a fraction before any exponent.
                let text = format!("{x:?}");
                match text.find(['e', 'E']) {
                    Some(pos) if !text[..pos].contains('.') => {
                        write!(f, "{}.0{}", &text[..pos], &text[pos..])
                    }
                    _ => f.write_str(&text),
                }
            }
        }
    }
}

/// Structured logic value.
///
/// Equality is syntactic: `Atom("a")` and `Variable("a")` differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    Atom(String),
    Number(Number),
    Variable(String),
    Compound {
        functor: String,
        args: Vec<Term>,
    },
    /// A proper list, or a partial list whose tail is an unbound variable.
    List {
        items: Vec<Term>,
        tail: Option<String>,
    },
    Str(String),
}

impl Term {
    #[must_use]
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    #[must_use]
    pub fn int(value: i128) -> Self {
        Self::Number(Number::Integer(value))
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }

    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::Str(text.into())
    }

    #[must_use]
    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Self::Compound {
            functor: functor.into(),
            args,
        }
    }

    #[must_use]
    pub fn list(items: Vec<Term>) -> Self {
        Self::List { items, tail: None }
    }

    #[must_use]
    pub fn partial_list(items: Vec<Term>, tail: impl Into<String>) -> Self {
        Self::List {
            items,
            tail: Some(tail.into()),
        }
    }

    /// Name of an atom, if this term is one.
    #[must_use]
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(name) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }
}

/// Ordered variable bindings for one answer.
///
/// Keys are unique; iteration follows the order the engine reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    bindings: Vec<(String, Term)>,
}

impl Solution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable. Rebinding an existing name replaces its term in place.
    pub fn insert(&mut self, name: impl Into<String>, term: Term) {
        let name = name.into();
        if let Some(slot) = self.bindings.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = term;
        } else {
            self.bindings.push((name, term));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(n, _)| n.as_str())
    }

    /// Render as binding lines, one `<prefix>Name<separator>Term` per line.
    #[must_use]
    pub fn format_bindings(&self, prefix: &str, separator: &str) -> String {
        self.bindings
            .iter()
            .map(|(n, t)| format!("{prefix}{n}{separator}{t}\n"))
            .collect()
    }
}

impl FromIterator<(String, Term)> for Solution {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        let mut solution = Self::new();
        for (name, term) in iter {
            solution.insert(name, term);
        }
        solution
    }
}

impl Serialize for Solution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bindings.len()))?;
        for (name, term) in &self.bindings {
            map.serialize_entry(name, term)?;
        }
        map.end()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {term}")?;
        }
        f.write_str("}")
    }
}
