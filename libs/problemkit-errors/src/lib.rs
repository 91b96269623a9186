//! Core error types for problemkit
//!
//! This crate provides pure data types for error handling, with no dependencies
//! on HTTP frameworks. It includes:
//! - RFC 7807 Problem Details (`Problem`)
//! - Problem type catalog (`ProblemType`)
//! - JSON Pointers for validation error locations (`build_pointer`)
//! - Validation error records (`RequestValidationError`)
//! - Status-code body rules (`is_body_allowed_for_status`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod pointer;
pub mod problem;
pub mod status;
pub mod validation;

// Re-export commonly used types
pub use catalog::ProblemType;
pub use pointer::{
    LocSegment, MAX_POINTER_LENGTH, SOURCE_MARKERS, TRUNCATION_SUFFIX, build_pointer,
    build_pointer_from_values, escape_segment,
};
pub use problem::{APPLICATION_PROBLEM_JSON, Detail, Problem};
pub use status::{StatusPatternError, is_body_allowed_for_status, is_body_allowed_for_status_pattern};
pub use validation::{RequestValidationError, ValidationErrorRecord, ValidationViolation};

/// Helper to attach instance and `trace_id` to a Problem
///
/// This is a convenience function for enriching Problem instances with
/// request-specific context before returning them as HTTP responses.
pub fn finalize(mut p: Problem, instance: &str, trace_id: Option<String>) -> Problem {
    p = p.with_instance(instance);
    if let Some(tid) = trace_id {
        p = p.with_trace_id(tid);
    }
    p
}
