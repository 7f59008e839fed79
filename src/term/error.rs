//! Term parsing errors.

/// Reply text that could not be turned into a term or solution.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Result text did not parse: {message} at offset {offset}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into `text`.
    pub offset: usize,
    /// The text being parsed.
    pub text: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize, text: &str) -> Self {
        Self {
            message: message.into(),
            offset,
            text: text.to_string(),
        }
    }
}
