//! Recursive-descent parser for answer terms and binding blocks.
//!
//! Operators are resolved by precedence climbing over a fixed table of the
//! standard infix operators; anything else must be written in functional
//! notation, which is how the wrapped queries print their answers anyway.

use crate::backend::VariableStyle;

use super::lexer::{Lexer, Token, TokenKind};
use super::{ParseError, Solution, Term};

const MAX_PRECEDENCE: u16 = 1200;
const ARG_PRECEDENCE: u16 = 999;

/// Deepest term the parser builds. Parsing and dropping terms both recurse
/// once per level, so answers nested beyond this are rejected.
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Xfx,
    Xfy,
    Yfx,
}

fn infix_op(name: &str) -> Option<(u16, Assoc)> {
    let op = match name {
        ":-" | "-->" => (1200, Assoc::Xfx),
        ";" | "|" => (1100, Assoc::Xfy),
        "->" | "*->" => (1050, Assoc::Xfy),
        "," => (1000, Assoc::Xfy),
        "=" | "\\=" | "==" | "\\==" | "@<" | "@>" | "@=<" | "@>=" | "=.." | "is" | "=:="
        | "=\\=" | "<" | ">" | "=<" | ">=" => (700, Assoc::Xfx),
        ":" => (200, Assoc::Xfy),
        "+" | "-" | "/\\" | "\\/" | "xor" => (500, Assoc::Yfx),
        "*" | "/" | "//" | "mod" | "rem" | "<<" | ">>" | "div" => (400, Assoc::Yfx),
        "**" => (200, Assoc::Xfx),
        "^" => (200, Assoc::Xfy),
        _ => return None,
    };
    Some(op)
}

fn prefix_op(name: &str) -> Option<u16> {
    match name {
        "-" | "+" | "\\" => Some(200),
        "\\+" => Some(900),
        _ => None,
    }
}

/// Parse a single term.
///
/// # Errors
///
/// Returns `ParseError` if the text is not exactly one well-formed term.
pub fn parse_term(text: &str, style: VariableStyle) -> Result<Term, ParseError> {
    let mut parser = Parser::new(text, style)?;
    let term = parser.parse(MAX_PRECEDENCE)?;
    parser.expect_end()?;
    Ok(term)
}

/// Parse a block of binding lines, one `<prefix>Name<separator>Term` per line.
///
/// Blank lines are skipped and whitespace around the separator is ignored.
/// A single trailing comma (as printed between toplevel answers) is tolerated.
///
/// # Errors
///
/// Returns `ParseError` for a line without a separator, an invalid variable
/// name, or a term that does not parse.
pub fn parse_bindings(
    text: &str,
    style: VariableStyle,
    separator: &str,
) -> Result<Solution, ParseError> {
    let sep = if separator.trim().is_empty() {
        separator
    } else {
        separator.trim()
    };
    let mut solution = Solution::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(rest) = line.strip_prefix(style.prefix()) else {
            return Err(ParseError::new("missing variable prefix", 0, line));
        };
        let Some(at) = rest.find(sep) else {
            return Err(ParseError::new(
                format!("missing binding separator {sep:?}"),
                0,
                line,
            ));
        };
        let name = rest[..at].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ParseError::new(
                format!("invalid variable name {name:?}"),
                0,
                line,
            ));
        }
        let value = rest[at + sep.len()..].trim();
        let value = value.strip_suffix(',').unwrap_or(value).trim_end();
        if value.is_empty() {
            return Err(ParseError::new("binding has no value", line.len(), line));
        }
        solution.insert(name, parse_term(value, style)?);
    }

    Ok(solution)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of the term under construction at the cursor.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, style: VariableStyle) -> Result<Self, ParseError> {
        Ok(Self {
            src,
            tokens: Lexer::new(src, style).tokenize()?,
            pos: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError::new(message, token.start, self.src)
    }

    fn expect_punct(&mut self, c: char) -> Result<(), ParseError> {
        let token = self.advance();
        if token.kind == TokenKind::Punct(c) {
            Ok(())
        } else if token.kind == TokenKind::End {
            Err(self.error_at(&token, format!("unexpected end of input, expected {c:?}")))
        } else {
            Err(self.error_at(&token, format!("expected {c:?}")))
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        let token = self.peek().clone();
        if token.kind == TokenKind::End {
            Ok(())
        } else {
            Err(self.error_at(&token, "unexpected text after term"))
        }
    }

    /// `(` directly after the current token, with no layout in between.
    fn functional_follows(&self) -> bool {
        let cur = self.peek();
        let next = self.peek_next();
        next.kind == TokenKind::Punct('(') && next.start == cur.end
    }

    /// Whether the token after the current one can begin an operand.
    fn operand_follows(&self) -> bool {
        match &self.peek_next().kind {
            TokenKind::End => false,
            TokenKind::Punct(c) => matches!(c, '(' | '[' | '{'),
            TokenKind::Name(name) => infix_op(name).is_none() || prefix_op(name).is_some(),
            _ => true,
        }
    }

    fn infix_at_cursor(&self) -> Option<(String, u16, Assoc)> {
        let name = match &self.peek().kind {
            TokenKind::Name(name) => name.clone(),
            TokenKind::Punct(c @ (',' | '|')) => c.to_string(),
            _ => return None,
        };
        let (prec, assoc) = infix_op(&name)?;
        let name = if name == "|" { ";".to_string() } else { name };
        Some((name, prec, assoc))
    }

    /// Move one level deeper, failing once the term would be too deep.
    fn descend(&mut self, levels: usize) -> Result<(), ParseError> {
        self.depth += levels;
        if self.depth > MAX_DEPTH {
            let token = self.peek().clone();
            return Err(self.error_at(&token, "term nested too deeply"));
        }
        Ok(())
    }

    fn parse(&mut self, max: u16) -> Result<Term, ParseError> {
        let saved = self.depth;
        self.descend(1)?;
        let term = self.parse_operators(max)?;
        self.depth = saved;
        Ok(term)
    }

    fn parse_operators(&mut self, max: u16) -> Result<Term, ParseError> {
        let (mut left, mut left_prec) = self.parse_prefix(max)?;

        while let Some((name, prec, assoc)) = self.infix_at_cursor() {
            if prec > max {
                break;
            }
            let (left_max, right_max) = match assoc {
                Assoc::Xfx => (prec - 1, prec - 1),
                Assoc::Xfy => (prec - 1, prec),
                Assoc::Yfx => (prec, prec - 1),
            };
            if left_prec > left_max {
                break;
            }
            self.advance();
            // Each link of a left-nested chain wraps the term once more.
            self.descend(1)?;
            let right = self.parse(right_max)?;
            left = Term::compound(name, vec![left, right]);
            left_prec = prec;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self, max: u16) -> Result<(Term, u16), ParseError> {
        let token = self.peek().clone();
        if let TokenKind::Name(name) = &token.kind {
            // Negative numeric literal: "-" glued to a number.
            if name == "-" {
                let next = self.peek_next().clone();
                if next.start == token.end {
                    let negated = match next.kind {
                        TokenKind::Int(i) => Some(Term::int(-i)),
                        TokenKind::Float(x) => Some(Term::float(-x)),
                        _ => None,
                    };
                    if let Some(term) = negated {
                        self.pos += 2;
                        return Ok((term, 0));
                    }
                }
            }
            if let Some(prec) = prefix_op(name) {
                if !self.functional_follows() && self.operand_follows() && prec <= max {
                    let name = name.clone();
                    self.advance();
                    let operand = self.parse(prec)?;
                    return Ok((Term::compound(name, vec![operand]), prec));
                }
            }
        }
        Ok((self.parse_primary()?, 0))
    }

    fn parse_primary(&mut self) -> Result<Term, ParseError> {
        let functional = self.functional_follows();
        let token = self.advance();
        match token.kind {
            TokenKind::Int(i) => Ok(Term::int(i)),
            TokenKind::Float(x) => Ok(Term::float(x)),
            TokenKind::Var(name) => Ok(Term::Variable(name)),
            TokenKind::Str(text) => Ok(Term::Str(text)),
            TokenKind::Name(name) | TokenKind::Quoted(name) => {
                if functional {
                    self.advance();
                    let args = self.parse_args()?;
                    Ok(Term::Compound {
                        functor: name,
                        args,
                    })
                } else {
                    Ok(Term::Atom(name))
                }
            }
            TokenKind::Punct('(') => {
                let inner = self.parse(MAX_PRECEDENCE)?;
                self.expect_punct(')')?;
                Ok(inner)
            }
            TokenKind::Punct('[') => self.parse_list(),
            TokenKind::Punct('{') => {
                if self.peek().kind == TokenKind::Punct('}') {
                    let close = self.advance();
                    return self.maybe_functional("{}", &close);
                }
                let inner = self.parse(MAX_PRECEDENCE)?;
                self.expect_punct('}')?;
                Ok(Term::compound("{}", vec![inner]))
            }
            TokenKind::End => Err(self.error_at(&token, "unexpected end of input")),
            TokenKind::Punct(c) => Err(self.error_at(&token, format!("unexpected {c:?}"))),
        }
    }

    /// `[]` and `{}` may be used as functors when `(` follows directly.
    fn maybe_functional(&mut self, name: &str, close: &Token) -> Result<Term, ParseError> {
        let next = self.peek();
        if next.kind == TokenKind::Punct('(') && next.start == close.end {
            self.advance();
            let args = self.parse_args()?;
            return Ok(Term::compound(name, args));
        }
        Ok(Term::atom(name))
    }

    fn parse_args(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut args = vec![self.parse(ARG_PRECEDENCE)?];
        while self.peek().kind == TokenKind::Punct(',') {
            self.advance();
            args.push(self.parse(ARG_PRECEDENCE)?);
        }
        self.expect_punct(')')?;
        Ok(args)
    }

    fn parse_list(&mut self) -> Result<Term, ParseError> {
        if self.peek().kind == TokenKind::Punct(']') {
            let close = self.advance();
            let next = self.peek();
            if next.kind == TokenKind::Punct('(') && next.start == close.end {
                return self.maybe_functional("[]", &close);
            }
            return Ok(Term::list(Vec::new()));
        }

        let mut items = vec![self.parse(ARG_PRECEDENCE)?];
        while self.peek().kind == TokenKind::Punct(',') {
            self.advance();
            items.push(self.parse(ARG_PRECEDENCE)?);
        }
        let tail = if self.peek().kind == TokenKind::Punct('|') {
            self.advance();
            Some(self.parse(ARG_PRECEDENCE)?)
        } else {
            None
        };
        self.expect_punct(']')?;
        if matches!(tail, Some(ref t) if !matches!(t, Term::Variable(_) | Term::List { .. })) {
            // An improper tail nests one '[|]' cell per item.
            self.descend(items.len())?;
        }
        Ok(make_list(items, tail))
    }
}

fn make_list(mut items: Vec<Term>, tail: Option<Term>) -> Term {
    match tail {
        None => Term::list(items),
        Some(Term::Variable(name)) => Term::partial_list(items, name),
        Some(Term::List {
            items: rest,
            tail: rest_tail,
        }) => {
            items.extend(rest);
            Term::List {
                items,
                tail: rest_tail,
            }
        }
        Some(other) => items.into_iter().rev().fold(other, |acc, item| {
            Term::compound("[|]", vec![item, acc])
        }),
    }
}
