//! Tokenizer for engine answer text.

use crate::backend::VariableStyle;

use super::ParseError;

const SYMBOL_CHARS: &str = "+-*/\\^<>=~:.?@#&$";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Unquoted atom: alphanumeric, symbolic or solo (`!`, `;`).
    Name(String),
    /// Quoted atom. Never treated as an operator.
    Quoted(String),
    Var(String),
    Int(i128),
    Float(f64),
    Str(String),
    Punct(char),
    End,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    style: VariableStyle,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, style: VariableStyle) -> Self {
        Self { src, pos: 0, style }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError::new(message, offset, self.src)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn skip_layout(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('%') => {
                    self.take_while(|c| c != '\n');
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(i) => self.pos += i + 4,
                        None => self.pos = self.src.len(),
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_layout();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::End,
                start,
                end: start,
            });
        };

        let kind = match c {
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | '|' => {
                self.bump();
                TokenKind::Punct(c)
            }
            '!' | ';' => {
                self.bump();
                TokenKind::Name(c.to_string())
            }
            '\'' => TokenKind::Quoted(self.quoted('\'')?),
            '"' | '`' => TokenKind::Str(self.quoted(c)?),
            '0'..='9' => self.number()?,
            '?' if self.style == VariableStyle::Flora
                && self.peek_at(1).is_some_and(|n| n.is_alphanumeric() || n == '_') =>
            {
                self.bump();
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                TokenKind::Var(format!("?{name}"))
            }
            c if c == '_' || c.is_uppercase() => {
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                if self.style == VariableStyle::Prolog {
                    TokenKind::Var(name.to_string())
                } else {
                    TokenKind::Name(name.to_string())
                }
            }
            c if c.is_alphabetic() => {
                TokenKind::Name(self.take_while(|c| c.is_alphanumeric() || c == '_').to_string())
            }
            c if SYMBOL_CHARS.contains(c) => {
                TokenKind::Name(self.take_while(|c| SYMBOL_CHARS.contains(c)).to_string())
            }
            other => return Err(self.error(format!("unexpected character {other:?}"), start)),
        };

        Ok(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated quoted text", start)),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') => {
                    if let Some(c) = self.escape(start)? {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, start: usize) -> Result<Option<char>, ParseError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape sequence", start))?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            '0'..='7' => {
                let digits = format!("{c}{}", self.take_while(|d| d.is_digit(8)));
                self.radix_escape(&digits, 8, start)?
            }
            'x' => {
                let digits = self.take_while(|d| d.is_ascii_hexdigit()).to_string();
                self.radix_escape(&digits, 16, start)?
            }
            // Line continuation.
            '\n' => return Ok(None),
            other => other,
        };
        Ok(Some(decoded))
    }

    fn radix_escape(&mut self, digits: &str, radix: u32, start: usize) -> Result<char, ParseError> {
        if self.peek() == Some('\\') {
            self.bump();
        }
        u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid character code escape {digits:?}"), start))
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;

        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('\'') => {
                    self.pos += 2;
                    let c = match self.bump() {
                        Some('\\') => self.escape(start)?.unwrap_or('\n'),
                        Some('\'') if self.peek() == Some('\'') => {
                            self.bump();
                            '\''
                        }
                        Some(c) => c,
                        None => return Err(self.error("unterminated character code", start)),
                    };
                    return Ok(TokenKind::Int(i128::from(u32::from(c))));
                }
                Some(r @ ('x' | 'o' | 'b')) => {
                    let radix = match r {
                        'x' => 16,
                        'o' => 8,
                        _ => 2,
                    };
                    self.pos += 2;
                    let digits = self.take_while(|d| d.is_digit(radix));
                    return i128::from_str_radix(digits, radix)
                        .map(TokenKind::Int)
                        .map_err(|_| self.error("invalid radix integer", start));
                }
                _ => {}
            }
        }

        self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += digit_at;
                self.take_while(|c| c.is_ascii_digit());
            }
        }

        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();

        if is_float {
            // SWI prints non-finite floats as 1.0Inf / 1.5NaN.
            if self.src[self.pos..].starts_with("Inf") {
                self.pos += 3;
                return Ok(TokenKind::Float(f64::INFINITY));
            }
            if self.src[self.pos..].starts_with("NaN") {
                self.pos += 3;
                return Ok(TokenKind::Float(f64::NAN));
            }
            return text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error("invalid float", start));
        }
        text.parse::<i128>()
            .map(TokenKind::Int)
            .map_err(|_| self.error("integer out of range", start))
    }
}
