//! Interfile header parsing.
//!
//! This module holds the line-oriented parser for Interfile headers as
//! written by CASToR reconstructions. Parsing stops at the raw key/value
//! level: values are coerced to integers where possible and kept as text
//! otherwise, and nothing here knows what any particular key means. The
//! typed projection lives in the [`model`](crate::model) module.
use crate::error::{ConvertError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};

/// The first non-blank line of every Interfile header, byte for byte
/// (the trailing space is part of the sentinel).
pub const START_SENTINEL: &str = "!INTERFILE := ";

/// The assignment delimiter separating keys from values.
const DELIMITER: &str = " :=";

/// A single header value in its raw, minimally interpreted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// The value parses as a decimal integer.
    Integer(i64),
    /// Any other non-empty value, kept verbatim.
    Text(String),
    /// The key is present with no value.
    Empty,
}

impl HeaderValue {
    /// The textual form of this value, as the original header spelled it.
    /// Empty values read back as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            HeaderValue::Integer(v) => v.to_string(),
            HeaderValue::Text(s) => s.clone(),
            HeaderValue::Empty => String::new(),
        }
    }
}

/// The raw view of a parsed Interfile header: an insertion-ordered
/// sequence of key/value pairs, plus the directory the header was read
/// from (data file names are resolved against it).
///
/// Lookup is by exact key; when a key occurs more than once the last
/// occurrence wins, but every occurrence stays in the entry list.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeader {
    entries: Vec<(String, HeaderValue)>,
    dir: PathBuf,
}

impl RawHeader {
    /// Read and parse an Interfile header from a file.
    ///
    /// A file that cannot be opened is reported as an invalid header
    /// rather than a plain I/O error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RawHeader> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ConvertError::InvalidHeaderFormat(format!("cannot open {}: {}", path.display(), e))
        })?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        RawHeader::from_reader(BufReader::new(file), dir)
    }

    /// Parse an Interfile header from an arbitrary buffered source.
    ///
    /// `dir` is recorded as the directory for payload resolution.
    pub fn from_reader<R: BufRead>(source: R, dir: PathBuf) -> Result<RawHeader> {
        let mut lines = source.lines();

        // the first non-blank line must be the start sentinel
        loop {
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(ConvertError::InvalidHeaderFormat(
                        "missing start sentinel".to_owned(),
                    ))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if line == START_SENTINEL {
                break;
            }
            return Err(ConvertError::InvalidHeaderFormat(format!(
                "expected `{}`, found `{}`",
                START_SENTINEL.trim_end(),
                line
            )));
        }

        let mut entries = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let stripped = line.trim_start_matches('!');
            let (key, value) = match stripped.split_once(DELIMITER) {
                Some((key, rest)) => (key.trim(), Some(rest)),
                // no delimiter: tolerate the line as a bare key
                None => (stripped.trim(), None),
            };
            if key.is_empty() {
                continue;
            }
            let control = key.to_lowercase();
            if control.contains("end") {
                return Ok(RawHeader { entries, dir });
            }
            let value = if control.contains("general") {
                // structural marker: recorded as spelled, never coerced
                match value {
                    Some(rest) => raw_text(rest),
                    None => HeaderValue::Empty,
                }
            } else {
                match value {
                    Some(rest) => coerce_value(key, rest)?,
                    None => HeaderValue::Empty,
                }
            };
            entries.push((key.to_owned(), value));
        }

        Err(ConvertError::InvalidHeaderFormat(
            "missing end sentinel".to_owned(),
        ))
    }

    /// Look up a key by its exact (trimmed) spelling.
    /// The last occurrence wins when a key repeats.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// All entries, in the order they appeared in the header.
    pub fn entries(&self) -> &[(String, HeaderValue)] {
        &self.entries
    }

    /// The directory the header was read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// The value part of a line, minus at most one leading space introduced
/// by the delimiter. Anything after that is kept verbatim.
fn raw_text(rest: &str) -> HeaderValue {
    let text = rest.strip_prefix(' ').unwrap_or(rest);
    if text.trim().is_empty() {
        HeaderValue::Empty
    } else {
        HeaderValue::Text(text.to_owned())
    }
}

/// Coerce a value: integer first, text otherwise, empty when blank.
///
/// An integer literal that overflows `i64` is a fatal error, never a
/// silent re-typing as text.
fn coerce_value(key: &str, rest: &str) -> Result<HeaderValue> {
    let text = rest.strip_prefix(' ').unwrap_or(rest);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(HeaderValue::Empty);
    }
    match trimmed.parse::<i64>() {
        Ok(v) => Ok(HeaderValue::Integer(v)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(ConvertError::InvalidHeaderValue(key.to_owned()))
            }
            _ => Ok(HeaderValue::Text(text.to_owned())),
        },
    }
}
