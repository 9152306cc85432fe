//! Date arguments and the wall clock

use crate::EngineError;
use chrono::{DateTime, NaiveDate, Utc};

/// Current time in Unix seconds
pub fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp into Unix seconds
///
/// # Examples
///
/// ```
/// use assay_engine::dates::parse_date;
///
/// assert_eq!(parse_date("2024-01-01").unwrap(), 1_704_067_200);
/// assert_eq!(parse_date("2024-01-01T01:00:00+01:00").unwrap(), 1_704_067_200);
/// assert!(parse_date("next tuesday").is_err());
/// ```
pub fn parse_date(input: &str) -> Result<u64, EngineError> {
    let input = input.trim();

    let seconds = if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        timestamp.timestamp()
    } else if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp())
            .ok_or_else(|| EngineError::validation(format!("invalid date '{}'", input)))?
    } else {
        return Err(EngineError::validation_with_hint(
            format!("invalid date '{}'", input),
            "Use YYYY-MM-DD or an RFC 3339 timestamp",
        ));
    };

    u64::try_from(seconds)
        .map_err(|_| EngineError::validation(format!("date '{}' is before 1970", input)))
}

/// Parse an optional date, treating blank as absent
pub fn parse_optional_date(input: Option<&str>) -> Result<Option<u64>, EngineError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value).map(Some),
    }
}
