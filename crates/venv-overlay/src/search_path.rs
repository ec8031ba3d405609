// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Search path list parsing and manipulation.

use std::collections::HashSet;
use std::iter::Peekable;
use std::str::CharIndices;

use miette::SourceSpan;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./search_path_test.rs"]
mod search_path_test;

/// Parse the textual form of a search path list.
///
/// Accepts exactly a bracketed, comma-separated list of single- or
/// double-quoted string literals, which covers both the `repr` of an
/// interpreter list and a JSON array of strings. A trailing comma is
/// allowed. Nothing in the input is ever evaluated.
///
/// ```
/// let entries = venv_overlay::parse_search_path(r#"['/usr/lib/python3.11', "/venv/lib"]"#)?;
/// assert_eq!(entries, vec!["/usr/lib/python3.11", "/venv/lib"]);
/// # Ok::<(), venv_overlay::Error>(())
/// ```
pub fn parse_search_path(input: &str) -> Result<Vec<String>> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
    };
    let entries = parser.list()?;
    parser.skip_whitespace();
    if let Some((offset, c)) = parser.chars.next() {
        return Err(parser.error(offset, format!("unexpected {c:?} after the list")));
    }
    Ok(entries)
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn list(&mut self) -> Result<Vec<String>> {
        self.skip_whitespace();
        self.expect('[')?;

        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                Some((_, ']')) => {
                    self.chars.next();
                    return Ok(entries);
                }
                Some((offset, quote @ ('\'' | '"'))) => {
                    self.chars.next();
                    entries.push(self.string(offset, quote)?);
                }
                Some((offset, c)) => {
                    let reason = format!("expected a string literal, found {c:?}");
                    return Err(self.error(offset, reason));
                }
                None => return Err(self.eof("unterminated list")),
            }

            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, ']')) => return Ok(entries),
                Some((offset, c)) => {
                    return Err(self.error(offset, format!("expected ',' or ']', found {c:?}")));
                }
                None => return Err(self.eof("unterminated list")),
            }
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some((_, c)) if c == quote => return Ok(value),
                Some((offset, '\n')) => {
                    return Err(self.error(offset, "newline inside string literal"));
                }
                Some((offset, '\\')) => self.escape(offset, &mut value)?,
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn escape(&mut self, start: usize, value: &mut String) -> Result<()> {
        let Some((_, c)) = self.chars.next() else {
            return Err(self.error(start, "unterminated escape sequence"));
        };
        match c {
            '\\' | '\'' | '"' | '/' => value.push(c),
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            '0' => value.push('\0'),
            'x' => value.push(self.code_point(start, 2)?),
            'U' => value.push(self.code_point(start, 8)?),
            'u' => {
                let high = self.hex(start, 4)?;
                if (0xD800..0xDC00).contains(&high) {
                    // JSON encodes astral characters as surrogate pairs.
                    let pair = matches!(self.chars.next(), Some((_, '\\')))
                        && matches!(self.chars.next(), Some((_, 'u')));
                    if !pair {
                        return Err(self.error(start, "unpaired surrogate escape"));
                    }
                    let low = self.hex(start, 4)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.error(start, "unpaired surrogate escape"));
                    }
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    value.push(self.char_from(start, combined)?);
                } else {
                    value.push(self.char_from(start, high)?);
                }
            }
            // Unknown escapes keep their backslash, as the interpreter does.
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn code_point(&mut self, start: usize, digits: usize) -> Result<char> {
        let code = self.hex(start, digits)?;
        self.char_from(start, code)
    }

    fn hex(&mut self, start: usize, digits: usize) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .chars
                .next()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| self.error(start, "invalid hexadecimal escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn char_from(&self, start: usize, code: u32) -> Result<char> {
        char::from_u32(code).ok_or_else(|| self.error(start, "escape is not a valid character"))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((offset, c)) => {
                Err(self.error(offset, format!("expected {expected:?}, found {c:?}")))
            }
            None => Err(self.eof(format!("expected {expected:?}"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn eof<S: Into<String>>(&self, reason: S) -> Error {
        self.error(self.input.len(), reason)
    }

    fn error<S: Into<String>>(&self, offset: usize, reason: S) -> Error {
        let len = self.input[offset..].chars().next().map_or(0, char::len_utf8);
        Error::InvalidSearchPath {
            reason: reason.into(),
            input: self.input.to_string(),
            span: SourceSpan::from((offset, len)),
        }
    }
}

/// Move entries past the first `original_len` to the front.
///
/// Site registration only appends, so everything beyond the length of the
/// snapshot is new. Both groups keep their relative order.
pub fn move_new_entries_first(mut entries: Vec<String>, original_len: usize) -> Vec<String> {
    let split = original_len.min(entries.len());
    entries.rotate_left(split);
    entries
}

/// Entries of `current` that are not in `previous`, in `current` order.
pub fn introduced_entries(previous: &[String], current: &[String]) -> Vec<String> {
    let known: HashSet<&str> = previous.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    current
        .iter()
        .filter(|entry| !known.contains(entry.as_str()) && seen.insert(entry.as_str()))
        .cloned()
        .collect()
}

/// Append `entry` unless it is already present.
pub fn ensure_entry(entries: &mut Vec<String>, entry: &str) {
    if !entries.iter().any(|e| e == entry) {
        entries.push(entry.to_string());
    }
}
