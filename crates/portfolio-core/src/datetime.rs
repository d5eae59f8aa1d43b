//! Lenient parsing of the date strings accepted by the GraphQL API.

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Message used when a date cannot be parsed.
pub const INVALID_DATE_MESSAGE: &str = "Invalid date format. Expected format: YYYY-MM-DDTHH:MM:SS";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A UTC timestamp parsed from RFC 3339, a naive ISO datetime, or a bare date.
///
/// Naive values carry no offset and are taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlexibleDateTime(pub DateTime<Utc>);

impl FlexibleDateTime {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidInput(INVALID_DATE_MESSAGE.to_string()));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self(naive.and_utc()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(naive.and_utc()));
            }
        }

        Err(Error::InvalidInput(INVALID_DATE_MESSAGE.to_string()))
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Format used for WordPress `modified_after` filters.
    pub fn to_wordpress(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl Deref for FlexibleDateTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<FlexibleDateTime> for DateTime<Utc> {
    fn from(dt: FlexibleDateTime) -> Self {
        dt.0
    }
}

impl fmt::Display for FlexibleDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for FlexibleDateTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FlexibleDateTime::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_naive_iso() {
        let dt = FlexibleDateTime::parse("2024-03-01T10:30:00").unwrap();
        assert_eq!(dt.0, utc(2024, 3, 1, 10, 30, 0));
    }

    #[test]
    fn test_parse_naive_with_fraction_and_space() {
        let dt = FlexibleDateTime::parse("2024-03-01 10:30:00.250").unwrap();
        assert_eq!(dt.0.timestamp_millis(), utc(2024, 3, 1, 10, 30, 0).timestamp_millis() + 250);
    }

    #[test]
    fn test_parse_rfc3339_converts_offset() {
        let dt = FlexibleDateTime::parse("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(dt.0, utc(2024, 3, 1, 10, 30, 0));
    }

    #[test]
    fn test_parse_date_only() {
        let dt = FlexibleDateTime::parse(" 2024-03-01 ").unwrap();
        assert_eq!(dt.0, utc(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "yesterday", "2024-13-01", "01/03/2024"] {
            let err = FlexibleDateTime::parse(bad).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid input: {INVALID_DATE_MESSAGE}"));
        }
    }

    #[test]
    fn test_wordpress_format() {
        let dt = FlexibleDateTime(utc(2024, 3, 1, 10, 30, 0));
        assert_eq!(dt.to_wordpress(), "2024-03-01T10:30:00");
    }

    #[test]
    fn test_deserialize() {
        let dt: FlexibleDateTime = serde_json::from_str("\"2024-03-01\"").unwrap();
        assert_eq!(dt.0, utc(2024, 3, 1, 0, 0, 0));
        assert!(serde_json::from_str::<FlexibleDateTime>("\"nope\"").is_err());
    }
}
