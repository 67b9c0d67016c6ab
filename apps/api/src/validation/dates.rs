use chrono::NaiveDate;

use super::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of reading an extracted `end_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndDate {
    /// Empty input: the role is current.
    Current,
    Ended(NaiveDate),
    /// Non-empty but unusable; stored as `NULL`.
    Discarded(String),
}

impl EndDate {
    pub fn as_option(&self) -> Option<NaiveDate> {
        match self {
            EndDate::Ended(date) => Some(*date),
            EndDate::Current | EndDate::Discarded(_) => None,
        }
    }
}

/// Strict `YYYY-MM-DD`. Anything else aborts the merge of the letter.
pub fn parse_start_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    parse_iso_date(raw).ok_or_else(|| {
        ValidationError::new(
            "start_date",
            format!("start_date must be a YYYY-MM-DD date, got '{raw}'"),
        )
    })
}

/// Lenient: an unparsable value, or one not after `start`, is discarded.
pub fn parse_end_date(raw: &str, start: NaiveDate) -> EndDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return EndDate::Current;
    }
    match parse_iso_date(raw) {
        Some(end) if end > start => EndDate::Ended(end),
        Some(end) => EndDate::Discarded(format!(
            "end_date {end} is not after start_date {start}"
        )),
        None => EndDate::Discarded(format!("end_date '{raw}' is not a YYYY-MM-DD date")),
    }
}

fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}
