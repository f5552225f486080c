//! Display time-zone resolution.

use std::fmt::{self, Write as _};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    Named(Tz),
    Fixed(FixedOffset),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

// US marketplace abbreviations map to the DST-aware zone, not a fixed offset.
const ABBREVIATIONS: [(&str, Tz); 12] = [
    ("PST", chrono_tz::America::Los_Angeles),
    ("PDT", chrono_tz::America::Los_Angeles),
    ("MST", chrono_tz::America::Denver),
    ("MDT", chrono_tz::America::Denver),
    ("CST", chrono_tz::America::Chicago),
    ("CDT", chrono_tz::America::Chicago),
    ("EST", chrono_tz::America::New_York),
    ("EDT", chrono_tz::America::New_York),
    ("UTC", chrono_tz::UTC),
    ("GMT", chrono_tz::UTC),
    ("Z", chrono_tz::UTC),
    ("UT", chrono_tz::UTC),
];

impl DisplayZone {
    pub fn utc() -> Self {
        Self::Named(chrono_tz::UTC)
    }

    pub fn parse(input: &str) -> Result<Self, ZoneError> {
        let trimmed = input.trim();
        let upper = trimmed.to_ascii_uppercase();

        if let Some((_, tz)) = ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == upper) {
            return Ok(Self::Named(*tz));
        }
        if let Ok(tz) = trimmed.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        if let Some(offset) = parse_fixed_offset(trimmed) {
            return Ok(Self::Fixed(offset));
        }

        Err(ZoneError::UnknownTimeZone(trimmed.to_string()))
    }

    pub fn name(&self) -> String {
        match self {
            Self::Named(tz) => tz.name().to_string(),
            Self::Fixed(offset) => offset.to_string(),
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
            Self::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    // Written through `write!` so a bad specifier is an error, not a panic.
    pub fn format(&self, instant: DateTime<Utc>, format: &str) -> Result<String, fmt::Error> {
        let mut out = String::new();
        match self {
            Self::Named(tz) => write!(out, "{}", instant.with_timezone(tz).format(format))?,
            Self::Fixed(offset) => write!(out, "{}", instant.with_timezone(offset).format(format))?,
        }
        Ok(out)
    }
}

fn parse_fixed_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn abbreviations_resolve_to_dst_aware_zones() {
        assert_eq!(
            DisplayZone::parse("PST").unwrap(),
            DisplayZone::Named(chrono_tz::America::Los_Angeles)
        );
        assert_eq!(
            DisplayZone::parse("edt").unwrap(),
            DisplayZone::Named(chrono_tz::America::New_York)
        );
        assert_eq!(DisplayZone::parse("UTC").unwrap(), DisplayZone::utc());
    }

    #[test]
    fn iana_names_and_fixed_offsets_parse() {
        assert_eq!(
            DisplayZone::parse("Europe/Berlin").unwrap(),
            DisplayZone::Named(chrono_tz::Europe::Berlin)
        );
        let fixed = DisplayZone::parse("+05:30").unwrap();
        assert_eq!(
            fixed,
            DisplayZone::Fixed(FixedOffset::east_opt(5 * 3_600 + 30 * 60).unwrap())
        );
        assert!(DisplayZone::parse("-0800").is_ok());
    }

    #[test]
    fn unknown_zone_is_explicit_error() {
        assert_eq!(
            DisplayZone::parse("Mars/Olympus").unwrap_err(),
            ZoneError::UnknownTimeZone("Mars/Olympus".to_string())
        );
        assert!(DisplayZone::parse("+25:00").is_err());
    }

    #[test]
    fn local_date_follows_zone_offset() {
        // 2024-03-01 00:00 UTC is still Feb 29 in Los Angeles.
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let pst = DisplayZone::parse("PST").unwrap();
        assert_eq!(
            pst.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            DisplayZone::utc().local_date(instant),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn invalid_format_specifier_is_error_not_panic() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(DisplayZone::utc().format(instant, "%Q").is_err());
        assert_eq!(
            DisplayZone::utc().format(instant, "%Y-%m-%d").unwrap(),
            "2024-03-01"
        );
    }
}
