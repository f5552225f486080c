//! Bucket-to-date normalization and the calendar date axis.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::zone::DisplayZone;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d";
pub const DEFAULT_DATE_FALLBACK: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bucket {
    Millis(i64),
    Text(String),
}

impl Bucket {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Self::Text(raw) => parse_timestamp(raw),
        }
    }
}

impl From<&str> for Bucket {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Bucket {
    fn from(value: i64) -> Self {
        Self::Millis(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    #[default]
    Natural,
    Inverted,
}

impl Timeline {
    pub fn is_natural(self) -> bool {
        matches!(self, Self::Natural)
    }
}

pub fn parse_timeline(raw: &str) -> Option<Timeline> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "natural" => Some(Timeline::Natural),
        "inverted" | "reversed" => Some(Timeline::Inverted),
        _ => None,
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).ok()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

// Buckets already mark a UTC day start; they are re-rendered, never shifted.
pub fn normalize_bucket(bucket: &Bucket, time_zone: &str, format: &str) -> String {
    normalize_bucket_or(bucket, time_zone, format, "")
}

pub fn normalize_bucket_or(
    bucket: &Bucket,
    time_zone: &str,
    format: &str,
    fallback: &str,
) -> String {
    let Ok(zone) = DisplayZone::parse(time_zone) else {
        debug!(
            component = "bucket",
            event = "zone.unknown",
            time_zone,
            "falling back"
        );
        return fallback.to_string();
    };
    normalize_bucket_in(bucket, &zone, format).unwrap_or_else(|| fallback.to_string())
}

pub fn normalize_bucket_in(bucket: &Bucket, zone: &DisplayZone, format: &str) -> Option<String> {
    let instant = bucket.to_utc()?;
    zone.format(instant, format).ok()
}

pub fn format_date(
    instant: Option<DateTime<Utc>>,
    format: &str,
    fallback: &str,
    zone: &DisplayZone,
) -> String {
    instant
        .and_then(|dt| zone.format(dt, format).ok())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn display_date_text(key: &str) -> String {
    parse_date_key(key)
        .map(|date| date.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AxisError {
    #[error("date axis must contain at least one date")]
    Empty,
    #[error("invalid date key at position {index}: {value}")]
    InvalidDate { index: usize, value: String },
    #[error("date axis is not contiguous between {previous} and {current}")]
    NotContiguous { previous: String, current: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DateAxis {
    dates: Vec<String>,
}

impl DateAxis {
    pub fn new(dates: Vec<String>) -> Result<Self, AxisError> {
        if dates.is_empty() {
            return Err(AxisError::Empty);
        }

        let mut previous: Option<NaiveDate> = None;
        for (index, value) in dates.iter().enumerate() {
            let date = parse_date_key(value).ok_or_else(|| AxisError::InvalidDate {
                index,
                value: value.clone(),
            })?;
            if let Some(prev) = previous {
                if prev.checked_add_days(Days::new(1)) != Some(date) {
                    return Err(AxisError::NotContiguous {
                        previous: dates[index - 1].clone(),
                        current: value.clone(),
                    });
                }
            }
            previous = Some(date);
        }

        Ok(Self { dates })
    }

    pub fn generate(anchor: DateTime<Utc>, days: usize, zone: &DisplayZone) -> Result<Self, AxisError> {
        let last = zone.local_date(anchor);
        let mut dates = Vec::with_capacity(days);
        let mut cursor = Some(last);
        for _ in 0..days {
            let Some(date) = cursor else { break };
            dates.push(date_key(date));
            cursor = date.checked_sub_days(Days::new(1));
        }
        dates.reverse();
        Self::new(dates)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.dates
    }

    pub fn columns(&self, timeline: Timeline, tracked_since: Option<NaiveDate>) -> Vec<String> {
        let cutoff = tracked_since.map(date_key);
        let mut columns: Vec<String> = self
            .dates
            .iter()
            .filter(|date| cutoff.as_deref().map_or(true, |cut| date.as_str() >= cut))
            .cloned()
            .collect();
        if !timeline.is_natural() {
            columns.reverse();
        }
        columns
    }

    pub fn into_inner(self) -> Vec<String> {
        self.dates
    }
}
