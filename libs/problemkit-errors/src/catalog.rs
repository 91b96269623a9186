//! Problem type catalog (`ProblemType` for the three families of problems)

use crate::problem::{Detail, Problem};
use http::StatusCode;

const ABOUT_BLANK: &str = "about:blank";

/// Static description of a problem family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemType {
    /// Appended to the configured type base; `about:blank` stands on its own.
    pub suffix: &'static str,
    pub title: &'static str,
    pub status: u16,
}

impl ProblemType {
    /// Request body, query or path failed validation.
    pub const VALIDATION: Self = Self {
        suffix: "validation",
        title: "Request validation error",
        status: 422,
    };

    /// An explicit HTTP error raised by a handler. Status and title vary per occurrence.
    pub const HTTP_ERROR: Self = Self {
        suffix: "http-error",
        title: "HTTP Error",
        status: 500,
    };

    /// Anything nobody handled.
    pub const INTERNAL: Self = Self {
        suffix: ABOUT_BLANK,
        title: "Internal Server Error",
        status: 500,
    };

    /// Full type URI under `base`, joined with exactly one `/`.
    #[must_use]
    pub fn type_uri(&self, base: &str) -> String {
        if self.suffix == ABOUT_BLANK {
            return ABOUT_BLANK.to_owned();
        }
        format!("{}/{}", base.trim_end_matches('/'), self.suffix)
    }

    /// Convert this problem type into a Problem with the given detail
    #[inline]
    pub fn as_problem(&self, base: &str, detail: impl Into<Detail>) -> Problem {
        // Convert u16 to StatusCode, using INTERNAL_SERVER_ERROR as fallback for invalid codes
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Problem::new(status, self.title, detail).with_type(self.type_uri(base))
    }
}
