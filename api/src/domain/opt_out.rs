use chrono::{DateTime, SecondsFormat, Utc};

/// An address as it is keyed in the unsubscribe store: trimmed and lowercased.
/// Format is not validated: any non-blank string is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeEmail(String);

impl UnsubscribeEmail {
    pub fn parse(s: &str) -> Result<UnsubscribeEmail, String> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            Err("Missing email address".to_string())
        } else {
            Ok(Self(normalized))
        }
    }
}

impl AsRef<str> for UnsubscribeEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnsubscribeEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-01-06T09:30:00.000Z`.
pub fn opt_out_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
