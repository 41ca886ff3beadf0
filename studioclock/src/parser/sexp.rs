use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token at position {0}: {1}")]
    UnexpectedToken(usize, String),
    #[error("Trailing input at position {0}")]
    TrailingInput(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(value: impl Into<String>) -> Self {
        SExp::Atom(value.into())
    }

    /// `(tag items...)`
    pub fn list(tag: &str, items: impl IntoIterator<Item = SExp>) -> Self {
        let mut list = vec![SExp::atom(tag)];
        list.extend(items);
        SExp::List(list)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading atom of a list.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_atom)
    }

    /// Atom at `index` of a list.
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.get(index))
            .and_then(SExp::as_atom)
    }

    /// First child list tagged `key`.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.as_list()?
            .iter()
            .find(|item| item.tag() == Some(key))
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut SExp> {
        self.as_list_mut()?
            .iter_mut()
            .find(|item| item.tag() == Some(key))
    }

    /// Every child list tagged `key`, in order.
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .filter(move |item| item.tag() == Some(key))
    }

    /// Value of a `(key value)` child.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.child(key).and_then(|c| c.atom_at(1))
    }

    /// Multi-line rendering: lists holding nested lists break their
    /// children onto indented lines.
    pub fn to_pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let SExp::List(items) = self else {
            out.push_str(&self.to_string());
            return;
        };
        let nested = items
            .iter()
            .any(|item| item.as_list().is_some_and(|l| l.iter().any(|c| c.as_list().is_some())));
        if !nested {
            out.push_str(&self.to_string());
            return;
        }
        out.push('(');
        for (i, item) in items.iter().enumerate() {
            if item.as_list().is_some() {
                out.push('\n');
                out.push_str(&"  ".repeat(depth + 1));
            } else if i > 0 {
                out.push(' ');
            }
            item.write_pretty(out, depth + 1);
        }
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
        out.push(')');
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\\'))
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                if needs_quotes(s) {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Parse exactly one expression; anything but whitespace after it is an
    /// error.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let sexp = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::TrailingInput(self.pos));
        }
        Ok(sexp)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::UnexpectedToken(self.pos, ")".to_string())),
            '"' => self.parse_string(),
            _ => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            if self.peek() == ')' {
                self.advance();
                break;
            }
            items.push(self.parse_sexp()?);
        }
        Ok(SExp::List(items))
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.advance();
        let mut s = String::new();
        let mut escaped = false;
        loop {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            let ch = self.peek();
            self.advance();
            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    _ => s.push(ch),
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                break;
            } else {
                s.push(ch);
            }
        }
        Ok(SExp::Atom(s))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();
        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' {
                break;
            }
            s.push(ch);
            self.advance();
        }
        Ok(SExp::Atom(s))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.input.get(self.pos).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}
