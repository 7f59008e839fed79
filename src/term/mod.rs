//! Logic terms: values, parsing of engine output, canonical formatting.

mod error;
mod format;
mod lexer;
mod parser;
mod types;

pub use error::ParseError;
pub use parser::{parse_bindings, parse_term, MAX_DEPTH};
pub use types::*;
