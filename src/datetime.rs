//! Date/time helpers shared by the repositories and the job queue.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Current time as Unix milliseconds, the unit used by the `jobs` table.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a database datetime string (YYYY-MM-DD HH:MM:SS, UTC) to RFC3339.
///
/// Strings already in RFC3339 are normalised to UTC; anything else is
/// returned unchanged.
pub fn to_rfc3339(datetime_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return dt.with_timezone(&Utc).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    }

    match NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive
            .and_utc()
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        Err(_) => datetime_str.to_string(),
    }
}
