//! Small timestamp helpers shared by ticket expiry and heartbeat payloads.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Whole seconds since the Unix epoch for a given instant.
pub fn epoch_seconds_at(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

/// Current time as an ISO-8601/RFC-3339 string with millisecond precision,
/// the format stream clients expect in heartbeat frames.
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_seconds_at_known_instant() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(epoch_seconds_at(at), 1_767_225_600);
    }

    #[test]
    fn test_iso8601_now_is_rfc3339() {
        let now = iso8601_now();
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.ends_with('Z'));
    }
}
