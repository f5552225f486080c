//! Highlight borders for grid cells.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bucket::{parse_date_key, parse_timestamp, Timeline};
use crate::lenient;
use crate::zone::DisplayZone;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#C9CFD7";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Note,
    #[default]
    #[serde(rename = "default")]
    Standard,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub krt_id: String,
    #[serde(default, rename = "krtkeywordid", deserialize_with = "lenient::or_default")]
    pub keyword_id: String,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: HighlightKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellBorder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

impl CellBorder {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootGroup {
    pub id: String,
    pub keyword_ids: Vec<String>,
}

pub fn cell_key(row_id: &str, date: &str) -> String {
    format!("{row_id}_{date}")
}

pub fn with_default_colors(highlights: Vec<Highlight>) -> Vec<Highlight> {
    highlights
        .into_iter()
        .map(|mut highlight| {
            let needs_default = highlight
                .color
                .as_deref()
                .map_or(true, |color| color.is_empty() || color == "none");
            if needs_default {
                highlight.color = Some(DEFAULT_HIGHLIGHT_COLOR.to_string());
            }
            highlight
        })
        .collect()
}

// Roots get the union of their keywords' highlights, first id wins.
pub fn group_highlights_by_keyword(
    highlights: &[Highlight],
    roots: Option<&[RootGroup]>,
) -> BTreeMap<String, Vec<Highlight>> {
    let mut grouped: BTreeMap<String, Vec<Highlight>> = BTreeMap::new();
    for highlight in highlights {
        if highlight.keyword_id.is_empty() {
            continue;
        }
        grouped
            .entry(highlight.keyword_id.clone())
            .or_default()
            .push(highlight.clone());
    }

    for root in roots.unwrap_or_default() {
        let mut seen = HashSet::new();
        let union: Vec<Highlight> = root
            .keyword_ids
            .iter()
            .filter_map(|keyword_id| grouped.get(keyword_id))
            .flatten()
            .filter(|highlight| seen.insert(highlight.id.clone()))
            .cloned()
            .collect();
        if !union.is_empty() {
            grouped.insert(root.id.clone(), union);
        }
    }

    grouped
}

#[derive(Debug, Clone)]
struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
    color: String,
}

impl DayRange {
    fn from_highlight(highlight: &Highlight, zone: &DisplayZone) -> Option<Self> {
        let start = parse_timestamp(highlight.start_at.as_deref()?)?;
        let end = parse_timestamp(highlight.end_at.as_deref()?)?;
        Some(Self {
            start: zone.local_date(start),
            end: zone.local_date(end),
            color: highlight.color.clone().unwrap_or_default(),
        })
    }
}

fn set_if_unset(slot: &mut Option<String>, color: &str) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = Some(color.to_string());
    }
}

// `top` goes to the last highlight touching the cell, the other edges keep
// the first color written.
fn border_for_column(column: NaiveDate, ranges: &[DayRange], timeline: Timeline) -> CellBorder {
    let mut border = CellBorder::default();

    for range in ranges {
        let (visual_start, visual_end) = if timeline.is_natural() {
            (range.start, range.end)
        } else {
            (range.end, range.start)
        };
        let color = range.color.as_str();

        if column == visual_start {
            set_if_unset(&mut border.left, color);
            border.top = Some(color.to_string());
            set_if_unset(&mut border.bottom, color);
        }
        if column == visual_end {
            set_if_unset(&mut border.right, color);
            border.top = Some(color.to_string());
            set_if_unset(&mut border.bottom, color);
        }
        if column > range.start && column < range.end {
            border.top = Some(color.to_string());
            set_if_unset(&mut border.bottom, color);
        }
    }

    border
}

fn day_ranges(highlights: &[Highlight], zone: &DisplayZone) -> Vec<DayRange> {
    highlights
        .iter()
        .filter_map(|highlight| DayRange::from_highlight(highlight, zone))
        .collect()
}

pub fn compute_cell_borders(
    dates: &[String],
    keyword_highlights: &BTreeMap<String, Vec<Highlight>>,
    timeline: Timeline,
    zone: &DisplayZone,
) -> BTreeMap<String, CellBorder> {
    let columns: Vec<(&String, NaiveDate)> = dates
        .iter()
        .filter_map(|date| parse_date_key(date).map(|column| (date, column)))
        .collect();

    let mut borders = BTreeMap::new();
    for (row_id, highlights) in keyword_highlights {
        let ranges = day_ranges(highlights, zone);
        if ranges.is_empty() {
            continue;
        }
        for (date, column) in &columns {
            let border = border_for_column(*column, &ranges, timeline);
            if !border.is_empty() {
                borders.insert(cell_key(row_id, date), border);
            }
        }
    }
    borders
}

pub fn cell_borders_from_highlights(
    dates: &[String],
    highlights: &[Highlight],
    timeline: Timeline,
    zone: &DisplayZone,
    roots: Option<&[RootGroup]>,
) -> BTreeMap<String, CellBorder> {
    let grouped = group_highlights_by_keyword(highlights, roots);
    compute_cell_borders(dates, &grouped, timeline, zone)
}
