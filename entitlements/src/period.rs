use chrono::{DateTime, Utc};

/// Usage is counted per calendar month in UTC.
pub fn period_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}
