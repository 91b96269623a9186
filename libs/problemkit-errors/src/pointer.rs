//! RFC 6901 JSON Pointers built from validation error locations.
//!
//! A validation layer reports where an error occurred as a `loc` path such as
//! `["body", "items", 0, "id"]`. [`build_pointer`] turns that path into a
//! pointer into the request document (`/items/0/id`):
//!
//! - a leading source marker (`body`, `json`, `value`) addresses the document
//!   root and is dropped;
//! - every segment is escaped (`~` becomes `~0`, `/` becomes `~1`), so text
//!   like `../etc/passwd` stays a single opaque segment;
//! - the output is bounded to [`MAX_POINTER_LENGTH`] characters plus
//!   [`TRUNCATION_SUFFIX`].
//!
//! The builder is a pure function over borrowed input and can be called from
//! any number of request tasks at once.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First segments that name the payload source rather than a field in it.
pub const SOURCE_MARKERS: [&str; 3] = ["body", "json", "value"];

/// Pointers longer than this many characters are truncated.
pub const MAX_POINTER_LENGTH: usize = 2000;

/// Appended to a pointer that was cut at [`MAX_POINTER_LENGTH`].
pub const TRUNCATION_SUFFIX: &str = "...";

/// One element of a validation error location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Object member name.
    Field(String),
    /// Array index.
    Index(i64),
    /// Any other JSON scalar a validator put into the path (`null`, `true`, `1.5`).
    Literal(Value),
}

impl LocSegment {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn index(idx: i64) -> Self {
        Self::Index(idx)
    }

    /// Unescaped text form of the segment.
    ///
    /// Literals use canonical JSON text, so `null` renders as `null` and
    /// `true` as `true`. String literals render without quotes.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Field(name) => Cow::Borrowed(name),
            Self::Index(idx) => Cow::Owned(idx.to_string()),
            Self::Literal(Value::String(s)) => Cow::Borrowed(s),
            Self::Literal(other) => Cow::Owned(other.to_string()),
        }
    }

    fn is_source_marker(&self) -> bool {
        matches!(self, Self::Field(name) if SOURCE_MARKERS.contains(&name.as_str()))
    }
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for LocSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_owned())
    }
}

impl From<String> for LocSegment {
    fn from(s: String) -> Self {
        Self::Field(s)
    }
}

impl From<i64> for LocSegment {
    fn from(idx: i64) -> Self {
        Self::Index(idx)
    }
}

impl From<usize> for LocSegment {
    fn from(idx: usize) -> Self {
        i64::try_from(idx).map_or_else(|_| Self::Literal(Value::from(idx)), Self::Index)
    }
}

impl From<Value> for LocSegment {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Field(s),
            Value::Number(n) => match n.as_i64() {
                Some(idx) => Self::Index(idx),
                None => Self::Literal(Value::Number(n)),
            },
            other => Self::Literal(other),
        }
    }
}

/// Escape a single reference token per RFC 6901.
///
/// `~` is encoded before `/`, so a literal `~1` in the input becomes `~01`
/// and never decodes back to `/`.
#[must_use]
pub fn escape_segment(raw: &str) -> Cow<'_, str> {
    if raw.contains(['~', '/']) {
        Cow::Owned(raw.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Build a JSON Pointer from a validation error location.
///
/// Returns an empty string for the whole document, i.e. when `loc` is empty
/// or holds only a source marker.
#[must_use]
pub fn build_pointer(loc: &[LocSegment]) -> String {
    let segments = match loc.split_first() {
        None => return String::new(),
        Some((first, rest)) if first.is_source_marker() => rest,
        Some(_) => loc,
    };

    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&escape_segment(&segment.text()));
    }

    if let Some((cut, _)) = pointer.char_indices().nth(MAX_POINTER_LENGTH) {
        pointer.truncate(cut);
        pointer.push_str(TRUNCATION_SUFFIX);
    }
    pointer
}

/// Build a JSON Pointer from a raw JSON `loc` array.
#[must_use]
pub fn build_pointer_from_values(loc: &[Value]) -> String {
    let segments: Vec<LocSegment> = loc.iter().cloned().map(LocSegment::from).collect();
    build_pointer(&segments)
}
