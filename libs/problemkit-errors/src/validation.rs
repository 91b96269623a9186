//! Validation error records as reported by the request validation layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pointer::{LocSegment, build_pointer};

/// One failed check, located by `loc` in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorRecord {
    /// Where the error occurred, e.g. `["body", "items", 0, "id"]`.
    pub loc: Vec<LocSegment>,
    /// Human-readable message.
    pub msg: String,
    /// Machine-readable error kind, e.g. `missing` or `string_too_short`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Extra parameters of the failed check (limits, expected values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Map<String, Value>>,
    /// The offending input value, if the validator reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl ValidationErrorRecord {
    #[must_use]
    pub fn new(loc: Vec<LocSegment>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
            ctx: None,
            input: None,
        }
    }

    #[must_use]
    pub fn with_ctx(mut self, ctx: Map<String, Value>) -> Self {
        self.ctx = Some(ctx);
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// JSON form of the record as reported, without a pointer.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "loc".to_owned(),
            Value::Array(self.loc.iter().map(segment_value).collect()),
        );
        obj.insert("msg".to_owned(), Value::String(self.msg.clone()));
        obj.insert("type".to_owned(), Value::String(self.kind.clone()));
        if let Some(ctx) = &self.ctx {
            obj.insert("ctx".to_owned(), Value::Object(ctx.clone()));
        }
        if let Some(input) = &self.input {
            obj.insert("input".to_owned(), input.clone());
        }
        Value::Object(obj)
    }

    /// Attach the JSON Pointer for `loc`.
    #[must_use]
    pub fn normalize(&self) -> ValidationViolation {
        ValidationViolation {
            loc: self.loc.clone(),
            msg: self.msg.clone(),
            kind: self.kind.clone(),
            ctx: self.ctx.clone(),
            pointer: build_pointer(&self.loc),
        }
    }
}

fn segment_value(segment: &LocSegment) -> Value {
    match segment {
        LocSegment::Field(name) => Value::String(name.clone()),
        LocSegment::Index(idx) => Value::from(*idx),
        LocSegment::Literal(value) => value.clone(),
    }
}

/// A validation record as it appears in the `errors` member of a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub loc: Vec<LocSegment>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Serialized as `null` when the record had no context.
    #[serde(default)]
    pub ctx: Option<Map<String, Value>>,
    /// RFC 6901 pointer into the request document; empty for the whole document.
    pub pointer: String,
}

/// All validation failures of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestValidationError {
    pub errors: Vec<ValidationErrorRecord>,
}

impl RequestValidationError {
    #[must_use]
    pub fn new(errors: Vec<ValidationErrorRecord>) -> Self {
        Self { errors }
    }

    #[must_use]
    pub fn raw_errors(&self) -> Vec<Value> {
        self.errors.iter().map(ValidationErrorRecord::to_value).collect()
    }

    #[must_use]
    pub fn normalized(&self) -> Vec<ValidationViolation> {
        self.errors.iter().map(ValidationErrorRecord::normalize).collect()
    }
}

impl From<Vec<ValidationErrorRecord>> for RequestValidationError {
    fn from(errors: Vec<ValidationErrorRecord>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(f, "{count} validation error{}", if count == 1 { "" } else { "s" })?;
        for record in &self.errors {
            let path = record
                .loc
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            write!(f, "\n  {path}: {} [type={}]", record.msg, record.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestValidationError {}
