//! Raw-text locator: finds the exact byte span of a declaration in original
//! source text, independent of the parsed document.
//!
//! Spans must reproduce the original layout byte for byte (whitespace,
//! comments, formatting) so they can be spliced safely. Depth counting skips
//! braces inside quoted strings and `#` comments.

use crate::error::LocateError;
use regex::Regex;
use std::ops::Range;

/// Byte span of a `name = { ... }` declaration. `end` is exclusive and
/// `text[end - 1]` is the closing brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    /// Offset of the opening `{`.
    pub open: usize,
    pub end: usize,
}

impl Span {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Offset of the closing `}`.
    pub fn close(&self) -> usize {
        self.end - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Open,
    Close,
}

/// Structural braces of a text, with quoted strings and comments masked out.
#[derive(Debug, Clone)]
pub struct BraceScan {
    braces: Vec<(usize, Brace)>,
    masked: Vec<Range<usize>>,
}

impl BraceScan {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut braces = Vec::new();
        let mut masked = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    let mut j = i + 1;
                    while j < bytes.len() && bytes[j] != b'"' {
                        if bytes[j] == b'\\' {
                            j += 1;
                        }
                        j += 1;
                    }
                    let end = (j + 1).min(bytes.len());
                    masked.push(i..end);
                    i = end;
                }
                b'#' => {
                    let mut j = i;
                    while j < bytes.len() && bytes[j] != b'\n' {
                        j += 1;
                    }
                    masked.push(i..j);
                    i = j;
                }
                b'{' => {
                    braces.push((i, Brace::Open));
                    i += 1;
                }
                b'}' => {
                    braces.push((i, Brace::Close));
                    i += 1;
                }
                _ => i += 1,
            }
        }
        BraceScan { braces, masked }
    }

    /// Whether `pos` falls inside a quoted string or a comment.
    pub fn is_masked(&self, pos: usize) -> bool {
        let idx = self.masked.partition_point(|r| r.start <= pos);
        idx > 0 && self.masked[idx - 1].contains(&pos)
    }

    /// Brace depth just before `pos`.
    pub fn depth_at(&self, pos: usize) -> i64 {
        self.braces
            .iter()
            .take_while(|(p, _)| *p < pos)
            .map(|(_, b)| match b {
                Brace::Open => 1,
                Brace::Close => -1,
            })
            .sum()
    }

    /// Offset of the `}` that returns depth to zero, counting from the `{`
    /// at `open`.
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let first = self.braces.partition_point(|(p, _)| *p < open);
        let mut depth = 0i64;
        for &(pos, brace) in &self.braces[first..] {
            match brace {
                Brace::Open => depth += 1,
                Brace::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(pos);
                    }
                }
            }
        }
        None
    }
}

fn opening_pattern(prefix: &str, key: &str) -> Result<Regex, LocateError> {
    Regex::new(&format!(r"{}{}\s*=\s*\{{", prefix, regex::escape(key))).map_err(|e| {
        tracing::warn!(key, error = %e, "cannot build locator pattern");
        LocateError::NotFound {
            name: key.to_owned(),
        }
    })
}

/// Find the top-level declaration `name = { ... }` that starts a line.
pub fn locate_block(source: &str, name: &str) -> Result<Span, LocateError> {
    let pattern = opening_pattern("(?m)^", name)?;
    let scan = BraceScan::new(source);
    let m = pattern
        .find_iter(source)
        .find(|m| !scan.is_masked(m.start()))
        .ok_or_else(|| LocateError::NotFound {
            name: name.to_owned(),
        })?;
    let open = m.end() - 1;
    let close = scan
        .matching_close(open)
        .ok_or_else(|| LocateError::Unterminated {
            name: name.to_owned(),
        })?;
    Ok(Span {
        start: m.start(),
        open,
        end: close + 1,
    })
}

/// Find the first `key = { ... }` sub-block sitting directly inside the
/// outermost block of `text` (typically a span returned by [`locate_block`]).
pub fn locate_sub_block(text: &str, key: &str) -> Option<Span> {
    let pattern = opening_pattern(r"\b", key).ok()?;
    let scan = BraceScan::new(text);
    let found = pattern
        .find_iter(text)
        .filter(|m| !scan.is_masked(m.start()) && scan.depth_at(m.start()) == 1)
        .find_map(|m| {
            let open = m.end() - 1;
            scan.matching_close(open).map(|close| Span {
                start: m.start(),
                open,
                end: close + 1,
            })
        });
    found
}
