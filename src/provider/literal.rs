//! Parser for the Python literals NICOS writes into scan-file metadata
//! (user lists, sample tables).

use crate::error::ProviderError;
use std::iter::Peekable;
use std::str::Chars;

/// A parsed literal value.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Dict(Vec<(Literal, Literal)>),
    /// Lists and tuples.
    List(Vec<Literal>),
    Str(String),
    Number(f64),
    Bool(bool),
    None,
}

impl Literal {
    /// Parse a complete literal; trailing input is an error.
    pub fn parse(text: &str) -> Result<Self, ProviderError> {
        let mut parser = Parser {
            chars: text.chars().peekable(),
            source: text,
        };
        let value = parser.value()?;
        parser.skip_ws();
        if parser.chars.peek().is_some() {
            return Err(parser.invalid());
        }
        Ok(value)
    }

    /// Value stored under a string key.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Dictionary values in order; list items for lists.
    pub fn values(&self) -> Vec<&Literal> {
        match self {
            Literal::Dict(entries) => entries.iter().map(|(_, v)| v).collect(),
            Literal::List(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    source: &'a str,
}

impl Parser<'_> {
    fn invalid(&self) -> ProviderError {
        ProviderError::InvalidValue {
            key: "literal".to_string(),
            value: self.source.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn value(&mut self) -> Result<Literal, ProviderError> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('{') => {
                self.chars.next();
                self.dict()
            }
            Some(open @ ('[' | '(')) => {
                self.chars.next();
                self.list(if open == '[' { ']' } else { ')' })
            }
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                self.string(quote).map(Literal::Str)
            }
            Some(_) => self.bare(),
            None => Err(self.invalid()),
        }
    }

    /// Consume `sep` or `close`; returns true on `close`.
    fn separator(&mut self, close: char) -> Result<bool, ProviderError> {
        self.skip_ws();
        match self.chars.next() {
            Some(',') => {
                self.skip_ws();
                // trailing comma
                if self.chars.peek() == Some(&close) {
                    self.chars.next();
                    return Ok(true);
                }
                Ok(false)
            }
            Some(c) if c == close => Ok(true),
            _ => Err(self.invalid()),
        }
    }

    fn dict(&mut self) -> Result<Literal, ProviderError> {
        let mut entries = Vec::new();
        self.skip_ws();
        if self.chars.peek() == Some(&'}') {
            self.chars.next();
            return Ok(Literal::Dict(entries));
        }
        loop {
            let key = self.value()?;
            self.skip_ws();
            if self.chars.next() != Some(':') {
                return Err(self.invalid());
            }
            let value = self.value()?;
            entries.push((key, value));
            if self.separator('}')? {
                return Ok(Literal::Dict(entries));
            }
        }
    }

    fn list(&mut self, close: char) -> Result<Literal, ProviderError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.chars.peek() == Some(&close) {
            self.chars.next();
            return Ok(Literal::List(items));
        }
        loop {
            items.push(self.value()?);
            if self.separator(close)? {
                return Ok(Literal::List(items));
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ProviderError> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.invalid())
    }

    fn bare(&mut self) -> Result<Literal, ProviderError> {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == ',' || c == ':' || c == '}' || c == ']' || c == ')' || c.is_whitespace() {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        match token.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => token
                .parse()
                .map(Literal::Number)
                .map_err(|_| self.invalid()),
        }
    }
}
