//! Which status codes may carry a response body.

/// Error returned for response keys that are neither a status code nor an
/// OpenAPI status range.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusPatternError {
    #[error("invalid status code pattern '{0}'")]
    Invalid(String),
}

/// OpenAPI response keys that stand for a whole class of status codes.
const STATUS_RANGES: [&str; 6] = ["default", "1XX", "2XX", "3XX", "4XX", "5XX"];

/// Informational responses, `204 No Content`, `205 Reset Content` and
/// `304 Not Modified` must not have a body.
#[must_use]
pub const fn is_body_allowed_for_status(code: u16) -> bool {
    !(code < 200 || matches!(code, 204 | 205 | 304))
}

/// Like [`is_body_allowed_for_status`], but for an OpenAPI response key.
///
/// Ranges (`2XX`) and `default` always allow a body.
///
/// # Errors
/// Returns [`StatusPatternError::Invalid`] if `pattern` is neither a range
/// nor a number.
pub fn is_body_allowed_for_status_pattern(pattern: &str) -> Result<bool, StatusPatternError> {
    if STATUS_RANGES.contains(&pattern) {
        return Ok(true);
    }
    pattern
        .parse::<u16>()
        .map(is_body_allowed_for_status)
        .map_err(|_| StatusPatternError::Invalid(pattern.to_owned()))
}
