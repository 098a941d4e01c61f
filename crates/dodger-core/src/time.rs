use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Returns an RFC 3339 timestamp with millisecond precision, e.g.
/// `2026-01-01T00:00:00.000Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Interpret a client-supplied timestamp as epoch milliseconds.
///
/// Accepts a JSON number of milliseconds, a string of digits, or an
/// RFC 3339 string. Anything else yields `None`.
pub fn parse_client_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return Some(ms);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis())
        },
        _ => None,
    }
}
