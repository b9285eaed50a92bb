//! Path string parser.
//!
//! ```text
//! path     := [viewer "_"] ([root] hop* | segment hop*)
//! hop      := "." segment | "[" (index | identity | "") "]"
//! identity := key "=" value *("|" key "=" value)
//! ```
//!
//! Viewer prefix and root marker are independent. A leading property that
//! starts with `left_`, `right_` or is exactly `root` must be escaped.

use thiserror::Error;

use crate::types::{ParsedPath, Segment, Viewer, ROOT_MARKER};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Unexpected end of path")]
    UnexpectedEnd,
    #[error("Unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("Unclosed bracket opened at {0}")]
    UnclosedBracket(usize),
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("Malformed identity segment: {0}")]
    MalformedIdentity(String),
    #[error("Unknown viewer: {0}")]
    UnknownViewer(String),
    #[error("{segment} segment is not allowed in {dialect} paths")]
    WrongDialect {
        dialect: &'static str,
        segment: &'static str,
    },
    #[error("Viewer prefix is not allowed in {0} paths")]
    ViewerNotAllowed(&'static str),
    #[error("Viewer path requires a left_/right_ prefix")]
    MissingViewer,
}

/// Path parser.
pub struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    /// Parse any well-formed path string.
    pub fn parse(input: &'a str) -> Result<ParsedPath, PathError> {
        let mut parser = Self { input, pos: 0 };
        parser.parse_path()
    }

    fn parse_path(&mut self) -> Result<ParsedPath, PathError> {
        let mut path = ParsedPath::default();

        for viewer in [Viewer::Left, Viewer::Right] {
            let name = viewer.as_str();
            if self.rest().starts_with(name) && self.rest()[name.len()..].starts_with('_') {
                path.viewer = Some(viewer);
                self.pos += name.len() + 1;
                break;
            }
        }

        if root_marker_at(self.rest()) {
            path.rooted = true;
            self.pos += ROOT_MARKER.len();
        }

        // An unrooted path opens with a bare property, which may be the
        // empty key (`.a` is `""` then `a`).
        if !path.rooted && !self.is_at_end() && self.peek() != Some('[') {
            let name = self.parse_property()?;
            path.push(Segment::Property(name));
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.advance();
                    let name = self.parse_property()?;
                    path.push(Segment::Property(name));
                }
                '[' => {
                    let segment = self.parse_bracket()?;
                    path.push(segment);
                }
                other => return Err(PathError::UnexpectedChar(other, self.pos)),
            }
        }

        Ok(path)
    }

    /// Reads a property name up to the next unescaped `.`, `[` or `]`.
    fn parse_property(&mut self) -> Result<String, PathError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            match c {
                '.' | '[' | ']' => break,
                '\\' => {
                    self.advance();
                    let escaped = self.peek().ok_or(PathError::UnexpectedEnd)?;
                    name.push(escaped);
                    self.advance();
                }
                _ => {
                    name.push(c);
                    self.advance();
                }
            }
        }
        Ok(name)
    }

    fn parse_bracket(&mut self) -> Result<Segment, PathError> {
        let open = self.pos;
        self.expect('[')?;

        let (first, escaped, stop) = self.parse_identity_part(open)?;
        match stop {
            ']' => {
                if first.is_empty() && !escaped {
                    return Ok(Segment::Pattern);
                }
                if !escaped && !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()) {
                    return parse_index(&first).map(Segment::Index);
                }
                Err(PathError::MalformedIdentity(self.input[open..self.pos].to_string()))
            }
            '=' => {
                let mut pairs = Vec::new();
                let mut key = first;
                loop {
                    if key.is_empty() {
                        return Err(self.malformed_from(open));
                    }
                    let (value, _, stop) = self.parse_identity_part(open)?;
                    if stop == '=' {
                        return Err(self.malformed_from(open));
                    }
                    pairs.push((key, value));
                    if stop == ']' {
                        return Ok(Segment::Identity(pairs));
                    }
                    let (next_key, _, stop) = self.parse_identity_part(open)?;
                    if stop != '=' {
                        return Err(self.malformed_from(open));
                    }
                    key = next_key;
                }
            }
            _ => Err(self.malformed_from(open)),
        }
    }

    /// Reads up to (and consumes) the next unescaped `=`, `|` or `]`.
    /// Returns the unescaped text, whether any escape was seen, and the stop
    /// character.
    fn parse_identity_part(&mut self, open: usize) -> Result<(String, bool, char), PathError> {
        let mut out = String::new();
        let mut escaped = false;
        loop {
            match self.peek() {
                None => return Err(PathError::UnclosedBracket(open)),
                Some(c @ ('=' | '|' | ']')) => {
                    self.advance();
                    return Ok((out, escaped, c));
                }
                Some('\\') => {
                    self.advance();
                    let c = self.peek().ok_or(PathError::UnclosedBracket(open))?;
                    out.push(c);
                    escaped = true;
                    self.advance();
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    fn malformed_from(&self, open: usize) -> PathError {
        let end = self.input[self.pos..]
            .find(']')
            .map(|i| self.pos + i + 1)
            .unwrap_or(self.input.len());
        PathError::MalformedIdentity(self.input[open..end].to_string())
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(PathError::UnexpectedChar(c, self.pos)),
            None => Err(PathError::UnexpectedEnd),
        }
    }
}

/// `root` followed by end of input, `.` or `[`.
fn root_marker_at(s: &str) -> bool {
    s.strip_prefix(ROOT_MARKER)
        .map(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
        .unwrap_or(false)
}

fn parse_index(digits: &str) -> Result<usize, PathError> {
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(PathError::InvalidIndex(digits.to_string()));
    }
    digits
        .parse::<usize>()
        .map_err(|_| PathError::InvalidIndex(digits.to_string()))
}
