//! Rank color scale and the overview color ramp.

use std::collections::HashMap;

pub const NO_VALUE_COLOR: &str = "#E6E8EB";
pub const OUT_OF_RANGE_COLOR: &str = "#EB9273";

const RAMP_START: (f64, f64, f64) = (245.0, 250.0, 245.0);
const RAMP_END: (f64, f64, f64) = (153.0, 208.0, 152.0);

pub fn cell_rank_color(rank: Option<f64>) -> &'static str {
    let Some(rank) = rank.filter(|r| r.is_finite() && *r >= 0.0) else {
        return OUT_OF_RANGE_COLOR;
    };
    match rank {
        r if r == 0.0 => "transparent",
        r if r <= 8.0 => "#99D098",
        r if r <= 12.0 => "#DFED8A",
        r if r <= 24.0 => "#FCE883",
        r if r <= 48.0 => "#F9D680",
        r if r <= 72.0 => "#F6C386",
        r if r <= 86.0 => "#F3B084",
        r if r <= 100.0 => "#EBA187",
        _ => OUT_OF_RANGE_COLOR,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min: f64,
    max: f64,
}

// Min/max per overview row kind, valid for one tracker id at a time.
#[derive(Debug, Default)]
pub struct ColorRampCache {
    tracker_id: String,
    bounds: HashMap<String, Bounds>,
}

impl ColorRampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker_id(&self) -> &str {
        &self.tracker_id
    }

    pub fn cached_kinds(&self) -> usize {
        self.bounds.len()
    }

    pub fn color_for(
        &mut self,
        value: Option<f64>,
        kind: &str,
        row_values: &[f64],
        tracker_id: &str,
    ) -> String {
        let value = match value {
            Some(v) if v != 0.0 && v.is_finite() => v,
            _ => return NO_VALUE_COLOR.to_string(),
        };

        if self.tracker_id != tracker_id {
            self.bounds.clear();
            self.tracker_id = tracker_id.to_string();
        }

        let bounds = *self
            .bounds
            .entry(kind.to_string())
            .or_insert_with(|| row_bounds(row_values));

        let ratio = if bounds.max > bounds.min {
            ((value - bounds.min) / (bounds.max - bounds.min)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let channel = |start: f64, end: f64| (start + (end - start) * ratio).round() as u8;
        format!(
            "rgb({}, {}, {})",
            channel(RAMP_START.0, RAMP_END.0),
            channel(RAMP_START.1, RAMP_END.1),
            channel(RAMP_START.2, RAMP_END.2)
        )
    }
}

fn row_bounds(values: &[f64]) -> Bounds {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        Bounds { min: 0.0, max: 0.0 }
    } else {
        Bounds { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_palette_buckets() {
        assert_eq!(cell_rank_color(Some(1.0)), "#99D098");
        assert_eq!(cell_rank_color(Some(8.0)), "#99D098");
        assert_eq!(cell_rank_color(Some(8.5)), "#DFED8A");
        assert_eq!(cell_rank_color(Some(12.0)), "#DFED8A");
        assert_eq!(cell_rank_color(Some(100.0)), "#EBA187");
        assert_eq!(cell_rank_color(Some(101.0)), OUT_OF_RANGE_COLOR);
        assert_eq!(cell_rank_color(None), OUT_OF_RANGE_COLOR);
        assert_eq!(cell_rank_color(Some(f64::NAN)), OUT_OF_RANGE_COLOR);
        assert_eq!(cell_rank_color(Some(0.0)), "transparent");
    }

    #[test]
    fn ramp_spans_row_bounds() {
        let mut cache = ColorRampCache::new();
        let row = [10.0, 20.0, 30.0];
        assert_eq!(cache.color_for(Some(10.0), "avgRank", &row, "krt-1"), "rgb(245, 250, 245)");
        assert_eq!(cache.color_for(Some(30.0), "avgRank", &row, "krt-1"), "rgb(153, 208, 152)");
        assert_eq!(cache.color_for(Some(0.0), "avgRank", &row, "krt-1"), NO_VALUE_COLOR);
        assert_eq!(cache.color_for(None, "avgRank", &row, "krt-1"), NO_VALUE_COLOR);
    }

    #[test]
    fn bounds_are_memoized_until_tracker_changes() {
        let mut cache = ColorRampCache::new();
        cache.color_for(Some(5.0), "top10Kw", &[0.0, 10.0], "krt-1");
        // Different row values are ignored while the memo is warm.
        let warm = cache.color_for(Some(10.0), "top10Kw", &[0.0, 100.0], "krt-1");
        assert_eq!(warm, "rgb(153, 208, 152)");
        assert_eq!(cache.cached_kinds(), 1);

        let fresh = cache.color_for(Some(10.0), "top10Kw", &[0.0, 100.0], "krt-2");
        assert_ne!(fresh, warm);
        assert_eq!(cache.tracker_id(), "krt-2");
        assert_eq!(cache.cached_kinds(), 1);
    }
}
