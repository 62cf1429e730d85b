//! Recursive-descent parser for stringified list/dict literals.
//!
//! Accepts only literal data: lists, dicts, quoted strings, numbers,
//! booleans and null. There is no identifier, call, or operator production,
//! so nothing in a cell can be evaluated.

use std::fmt;

use fd_types::number_token;
use thiserror::Error;

pub const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    List(Vec<Literal>),
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Categorical token for this literal; `Null` has none.
    #[must_use]
    pub fn into_token(self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s),
            Self::Num(v) => Some(number_token(v)),
            Self::Bool(v) => Some(v.to_string()),
            Self::Null => None,
            nested @ (Self::List(_) | Self::Map(_)) => Some(nested.to_string()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '\'' => f.write_str("\\'")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            Self::Num(v) => f.write_str(&number_token(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Null => f.write_str("null"),
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(pairs) => {
                f.write_str("{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected character {found:?} at byte {position}: expected {expected}")]
    UnexpectedChar {
        position: usize,
        expected: &'static str,
        found: char,
    },
    #[error("identifier {name:?} at byte {position} is not a literal")]
    UnknownIdentifier { position: usize, name: String },
    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("unhashable mapping key at byte {0}")]
    InvalidKey(usize),
    #[error("literal nests deeper than {MAX_NESTING_DEPTH} levels")]
    TooDeep,
    #[error("trailing input at byte {0}")]
    TrailingInput(usize),
}

pub type LiteralResult<T> = Result<T, LiteralError>;

pub fn parse_literal(input: &str) -> LiteralResult<Literal> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, what: &'static str) -> LiteralResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(LiteralError::UnexpectedChar {
                position: self.pos,
                expected: what,
                found,
            }),
            None => Err(LiteralError::UnexpectedEof),
        }
    }

    fn enter(&mut self) -> LiteralResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        Ok(())
    }

    fn value(&mut self) -> LiteralResult<Literal> {
        match self.peek() {
            None => Err(LiteralError::UnexpectedEof),
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Literal::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.keyword(),
            Some(found) => Err(LiteralError::UnexpectedChar {
                position: self.pos,
                expected: "a literal value",
                found,
            }),
        }
    }

    fn list(&mut self) -> LiteralResult<Literal> {
        self.enter()?;
        self.expect('[', "'['")?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(']') {
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect(']', "',' or ']'")?;
            break;
        }
        self.depth -= 1;
        Ok(Literal::List(items))
    }

    fn map(&mut self) -> LiteralResult<Literal> {
        self.enter()?;
        self.expect('{', "'{'")?;
        let mut pairs = Vec::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            let key_pos = self.pos;
            let key = self.value()?;
            if matches!(key, Literal::List(_) | Literal::Map(_)) {
                return Err(LiteralError::InvalidKey(key_pos));
            }
            self.skip_ws();
            self.expect(':', "':'")?;
            self.skip_ws();
            let value = self.value()?;
            pairs.push((key, value));
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect('}', "',' or '}'")?;
            break;
        }
        self.depth -= 1;
        Ok(Literal::Map(pairs))
    }

    fn string(&mut self, quote: char) -> LiteralResult<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(LiteralError::UnterminatedString(start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> LiteralResult<()> {
        let at = self.pos - 1;
        let Some(c) = self.bump() else {
            return Err(LiteralError::InvalidEscape(at));
        };
        match c {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            'x' => out.push(self.hex_escape(2, at)?),
            'u' => out.push(self.hex_escape(4, at)?),
            'U' => out.push(self.hex_escape(8, at)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, at: usize) -> LiteralResult<char> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or(LiteralError::InvalidEscape(at))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| LiteralError::InvalidEscape(at))?;
        self.pos = end;
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(at))
    }

    fn number(&mut self) -> LiteralResult<Literal> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '-' | '+') && matches!(prev, 'e' | 'E');
            if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') || exponent_sign) {
                break;
            }
            prev = c;
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        let cleaned = text.replace('_', "");
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Literal::Num(value)),
            _ => Err(LiteralError::InvalidNumber(text.to_owned())),
        }
    }

    fn keyword(&mut self) -> LiteralResult<Literal> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "None" | "null" => Ok(Literal::Null),
            name => Err(LiteralError::UnknownIdentifier {
                position: start,
                name: name.to_owned(),
            }),
        }
    }
}
