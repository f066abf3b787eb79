//! The persisted consent decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's consent choice as stored in the consent cookie.
///
/// Wire format: `{"essential":true,"analytics":<bool>,"timestamp":"<ISO 8601>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentDecision {
    /// Always true; kept for audit completeness.
    pub essential: bool,

    #[serde(rename = "analytics")]
    pub analytics_enabled: bool,

    #[serde(rename = "timestamp", with = "iso_millis")]
    pub decided_at: DateTime<Utc>,
}

impl ConsentDecision {
    /// A decision made now.
    pub fn new(analytics_enabled: bool) -> Self {
        Self::at(analytics_enabled, Utc::now())
    }

    pub fn at(analytics_enabled: bool, decided_at: DateTime<Utc>) -> Self {
        Self {
            essential: true,
            analytics_enabled,
            decided_at,
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix on write; any RFC 3339
/// instant on read.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
