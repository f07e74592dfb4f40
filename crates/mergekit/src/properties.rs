//! Parser for `.properties` control files.
//!
//! Handles the classic key/value format:
//! ```text
//! # comment
//! ! also a comment
//! /project/dependencies = append
//! /project/name: override
//! default merge
//! //plugin = \
//!     preserve
//! ```
//!
//! Keys and values may contain `\t \n \r \f \uXXXX` escapes, and a backslash
//! escapes any other character (so `\=` and `\:` can appear in keys).
//! Lines end at `\n`, `\r\n` or a lone `\r`. A `\u` escape holding an
//! unpaired surrogate decodes to U+FFFD.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed control properties, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load properties from a file.
    ///
    /// Files that are not valid UTF-8 are decoded as ISO-8859-1.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::PropertiesRead {
            path: path.to_path_buf(),
            source,
        })?;
        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| char::from(b)).collect(),
        };
        Self::parse_str(&content)
    }

    /// Parse properties from a string. Later duplicates replace earlier ones.
    pub fn parse_str(content: &str) -> Result<Self> {
        let mut props = Self::new();
        let mut lines = physical_lines(content).into_iter().enumerate();

        while let Some((idx, raw)) = lines.next() {
            let line = raw.trim_start_matches(is_blank);

            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical = line.to_string();
            while has_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            let line_num = idx + 1;
            props.insert(unescape(key, line_num)?, unescape(value, line_num)?);
        }

        Ok(props)
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split on `\n`, `\r\n` or a lone `\r`.
fn physical_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;

    while !rest.is_empty() {
        let Some(pos) = rest.find(['\r', '\n']) else {
            lines.push(rest);
            break;
        };
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// An odd number of trailing backslashes joins the next line.
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped `=`, `:` or blank.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut split_at = line.len();

    for (pos, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            split_at = pos;
            break;
        }
    }

    let key = &line[..split_at];
    let mut rest = line[split_at..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(is_blank);
    }
    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_code_unit(&mut chars, line)?;
                out.push(decode_unit(unit, &mut chars, line)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn read_code_unit(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u16> {
    let mut value: u16 = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| malformed_unicode(line))?;
        value = (value << 4) | digit as u16;
    }
    Ok(value)
}

/// Turn a `\u` code unit into a char, pulling a second `\uXXXX` for
/// surrogate pairs.
fn decode_unit(unit: u16, chars: &mut std::str::Chars<'_>, line: usize) -> Result<char> {
    if !(0xD800..=0xDBFF).contains(&unit) {
        return Ok(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    let mut ahead = chars.clone();
    if ahead.next() == Some('\\') && ahead.next() == Some('u') {
        let low = read_code_unit(&mut ahead, line)?;
        if (0xDC00..=0xDFFF).contains(&low) {
            *chars = ahead;
            return Ok(char::decode_utf16([unit, low])
                .next()
                .and_then(|r| r.ok())
                .unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
    Ok(char::REPLACEMENT_CHARACTER)
}

fn malformed_unicode(line: usize) -> Error {
    Error::PropertiesParse {
        line,
        message: "malformed \\uxxxx encoding".to_string(),
    }
}
