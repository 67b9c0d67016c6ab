//! Value contracts shared by the pipelines and the repository.
//!
//! Everything here is pure: no I/O, no logging. Callers decide whether a
//! violation is surfaced (`InvalidInput`) or recovered from.

pub mod dates;
pub mod upload;

use serde::Serialize;
use thiserror::Error;

pub use dates::{parse_end_date, parse_start_date, EndDate};
pub use upload::{classify_upload, sanitize_file_name, validate_file_size, MAX_FILE_SIZE};

pub const MIN_JOB_DESCRIPTION_CHARS: usize = 10;
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 10_000;
pub const MAX_SUMMARY_CHARS: usize = 2_000;

/// Tolerance applied to provider scores before clamping into `[0.0, 1.0]`.
pub const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Checks a raw job description before it is sanitized.
pub fn validate_job_description(value: &str) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length < MIN_JOB_DESCRIPTION_CHARS {
        return Err(ValidationError::new(
            "job_description",
            format!("job_description must be at least {MIN_JOB_DESCRIPTION_CHARS} characters"),
        ));
    }
    if length > MAX_JOB_DESCRIPTION_CHARS {
        return Err(ValidationError::new(
            "job_description",
            format!("job_description must be at most {MAX_JOB_DESCRIPTION_CHARS} characters"),
        ));
    }
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            "job_description",
            "job_description cannot be empty or only whitespace",
        ));
    }
    Ok(())
}

/// Summaries are optional; when present they are bounded.
pub fn validate_summary(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_SUMMARY_CHARS {
        return Err(ValidationError::new(
            "summary",
            format!("summary must be at most {MAX_SUMMARY_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Trims, drops control characters other than `\n`, `\t`, `\r`, then HTML-escapes.
pub fn sanitize_text(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| matches!(c, '\n' | '\t' | '\r') || !c.is_control())
        .collect();
    escape_html(&cleaned)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Brings a provider score into `[0.0, 1.0]`.
///
/// Overshoot above 1.0 is clamped. Undershoot is clamped only within
/// `SCORE_EPSILON`; anything more negative, NaN or infinite is rejected.
pub fn clamp_match_score(score: f64) -> Result<f64, ValidationError> {
    if !score.is_finite() {
        return Err(ValidationError::new(
            "match_score",
            format!("match_score must be a finite number, got {score}"),
        ));
    }
    if score < -SCORE_EPSILON {
        return Err(ValidationError::new(
            "match_score",
            format!("match_score must not be negative, got {score}"),
        ));
    }
    Ok(score.clamp(0.0, 1.0))
}
