//! Gap interpolation spans for short runs of interpolated ranks.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bucket::{display_date_text, normalize_bucket_in, parse_date_key, Bucket, DATE_KEY_FORMAT};
use crate::lenient;
use crate::zone::DisplayZone;

pub const MAX_GAP: usize = 3;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankObservation {
    #[serde(deserialize_with = "lenient::bucket")]
    pub bucket: Option<Bucket>,
    #[serde(deserialize_with = "lenient::or_none")]
    pub krt_keyword_id: Option<String>,
    #[serde(deserialize_with = "lenient::rank")]
    pub search_volume: Option<f64>,
    #[serde(deserialize_with = "lenient::rank")]
    pub organic_rank: Option<f64>,
    #[serde(deserialize_with = "lenient::rank")]
    pub impression_rank: Option<f64>,
    #[serde(deserialize_with = "lenient::rank")]
    pub sponsored_rank: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub is_interpolated: bool,
}

impl RankObservation {
    // A zero rank means "not ranked" and never anchors a span.
    fn endpoint_rank(&self) -> Option<f64> {
        self.organic_rank.filter(|rank| *rank > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolatedSpan {
    pub start_value: Option<f64>,
    pub end_value: Option<f64>,
    pub cell_count: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    pub start_date_text: String,
    pub end_date_text: String,
    pub last_date: String,
    pub dates: Vec<String>,
}

impl InterpolatedSpan {
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }
}

// Last record wins on duplicate dates.
pub fn observations_by_date<'a>(
    ranks: &'a [RankObservation],
    zone: &DisplayZone,
) -> HashMap<String, &'a RankObservation> {
    let mut lookup = HashMap::with_capacity(ranks.len());
    for rank in ranks {
        let Some(date) = rank
            .bucket
            .as_ref()
            .and_then(|bucket| normalize_bucket_in(bucket, zone, DATE_KEY_FORMAT))
        else {
            debug!(
                component = "interpolation",
                event = "observation.skipped",
                reason = "unusable bucket"
            );
            continue;
        };
        lookup.insert(date, rank);
    }
    lookup
}

pub fn interpolate(
    ranks: &[RankObservation],
    zone: &DisplayZone,
    dates: &[String],
) -> BTreeMap<String, InterpolatedSpan> {
    let lookup = observations_by_date(ranks, zone);
    detect_spans(&lookup, dates)
}

fn is_interpolated(lookup: &HashMap<String, &RankObservation>, date: Option<&String>) -> bool {
    date.and_then(|d| lookup.get(d))
        .is_some_and(|obs| obs.is_interpolated)
}

fn organic_at(lookup: &HashMap<String, &RankObservation>, date: Option<&String>) -> Option<f64> {
    date.and_then(|d| lookup.get(d))
        .and_then(|obs| obs.endpoint_rank())
}

fn detect_spans(
    lookup: &HashMap<String, &RankObservation>,
    dates: &[String],
) -> BTreeMap<String, InterpolatedSpan> {
    let mut spans = BTreeMap::new();
    let mut i = 0;

    while i < dates.len() {
        let prev = i.checked_sub(1).map(|p| &dates[p]);
        if !is_interpolated(lookup, Some(&dates[i])) || is_interpolated(lookup, prev) {
            i += 1;
            continue;
        }

        match find_run_end(lookup, dates, i) {
            Some(end) => {
                emit_run(lookup, dates, i, end, &mut spans);
                i = end + 1;
            }
            None => {
                debug!(
                    component = "interpolation",
                    event = "run.too_long",
                    start = %dates[i],
                    max_gap = MAX_GAP
                );
                i += 1;
            }
        }
    }

    spans
}

// Last interpolated index of the run, if it ends inside the window.
fn find_run_end(
    lookup: &HashMap<String, &RankObservation>,
    dates: &[String],
    start: usize,
) -> Option<usize> {
    let window_end = dates.len().min(start + MAX_GAP + 1);
    (start..window_end).find(|&j| {
        is_interpolated(lookup, Some(&dates[j])) && !is_interpolated(lookup, dates.get(j + 1))
    })
}

fn emit_run(
    lookup: &HashMap<String, &RankObservation>,
    dates: &[String],
    start: usize,
    end: usize,
    spans: &mut BTreeMap<String, InterpolatedSpan>,
) {
    let run = &dates[start..=end];
    let start_date = &dates[start];
    let last_date = &dates[end];
    let prev = start.checked_sub(1).map(|p| &dates[p]);
    let next = dates.get(end + 1);

    let start_date_text = display_date_text(start_date);
    let end_date_text = display_date_text(last_date);
    let span = |start_value, end_value, segment: &[String]| InterpolatedSpan {
        start_value,
        end_value,
        cell_count: segment.len(),
        hidden: false,
        start_date_text: start_date_text.clone(),
        end_date_text: end_date_text.clone(),
        last_date: last_date.clone(),
        dates: segment.to_vec(),
    };

    let lead_value = organic_at(lookup, prev).or_else(|| organic_at(lookup, Some(start_date)));
    let month_start = run
        .iter()
        .position(|date| parse_date_key(date).is_some_and(|d| d.day() == 1));

    match month_start {
        Some(split) if run.len() > 1 => {
            let (head, tail) = run.split_at(split);
            let first_of_month = &tail[0];
            let first_value = organic_at(lookup, Some(first_of_month));
            let tail_end_value = organic_at(lookup, next)
                .or_else(|| organic_at(lookup, tail.last()));

            if !head.is_empty() {
                spans.insert(start_date.clone(), span(lead_value, first_value, head));
            }
            spans.insert(
                first_of_month.clone(),
                span(first_value, tail_end_value, tail),
            );
            debug!(
                component = "interpolation",
                event = "span.split",
                start = %start_date,
                month_start = %first_of_month,
                cells = run.len()
            );
        }
        _ => {
            let end_value = organic_at(lookup, next).or_else(|| organic_at(lookup, Some(last_date)));
            spans.insert(start_date.clone(), span(lead_value, end_value, run));
        }
    }

    for date in run {
        spans
            .entry(date.clone())
            .or_insert_with(InterpolatedSpan::hidden);
    }
}
