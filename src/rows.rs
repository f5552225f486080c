//! Heatmap row assembly from raw rank-history payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::borders::RootGroup;
use crate::bucket::{normalize_bucket_in, Bucket, DATE_KEY_FORMAT};
use crate::interpolation::{interpolate, InterpolatedSpan, RankObservation};
use crate::lenient;
use crate::observability::log_heatmap_built;
use crate::zone::DisplayZone;

pub const AGGREGATE_ROW_ID: &str = "aggregateRow";

pub type RankSeries = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdData {
    pub auto_matches: Option<f64>,
    pub broad_matches: Option<f64>,
    pub click_through_rate: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub cost_per_clicks: Option<f64>,
    pub currency: Option<String>,
    pub exact_matches: Option<f64>,
    pub impression_rank: Option<f64>,
    pub impression_rank_share: Option<f64>,
    pub phrase_matches: Option<f64>,
    pub ppc_sales: Option<f64>,
    pub ppc_spend: Option<f64>,
    pub total_clicks: Option<f64>,
    pub total_impressions: Option<f64>,
    pub total_orders: Option<f64>,
    pub acos: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatmapKeyword {
    #[serde(deserialize_with = "lenient::or_default")]
    pub keyword_id: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub is_paused: bool,
    #[serde(deserialize_with = "lenient::or_default")]
    pub keyword: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub search_volume: f64,
    #[serde(deserialize_with = "lenient::or_none")]
    pub refreshed_at: Option<String>,
    #[serde(deserialize_with = "lenient::rank")]
    pub sv_share: Option<f64>,
    #[serde(deserialize_with = "lenient::rank")]
    pub relevancy: Option<f64>,
    #[serde(deserialize_with = "lenient::or_none")]
    pub ad_data: Option<AdData>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub ranks: Vec<RankObservation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootItem {
    #[serde(deserialize_with = "lenient::or_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub root: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub broad_search_volume: f64,
    #[serde(deserialize_with = "lenient::rank")]
    pub broad_search_volume_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub frequency: f64,
    #[serde(deserialize_with = "lenient::or_none")]
    pub ad_data: Option<AdData>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub keywords: Vec<HeatmapKeyword>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub ranks: Vec<RankObservation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateTotal {
    #[serde(deserialize_with = "lenient::or_default")]
    pub search_volume: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub search_volume_share: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub keyword_count: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregateAverage {
    #[serde(deserialize_with = "lenient::or_default")]
    pub search_volume: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub search_volume_share: f64,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub ranks: Vec<RankObservation>,
    #[serde(deserialize_with = "lenient::or_none")]
    pub ad_data: Option<AdData>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateResponse {
    #[serde(deserialize_with = "lenient::or_default")]
    pub total: AggregateTotal,
    #[serde(deserialize_with = "lenient::or_default")]
    pub average: AggregateAverage,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Indicator {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orange: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapResponse {
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub indicators: Vec<Indicator>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub keywords: Vec<HeatmapKeyword>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub aggregate: AggregateResponse,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootsResponse {
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub indicators: Vec<Indicator>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub roots: Vec<RootItem>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub aggregate: AggregateResponse,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpcMetrics {
    pub impression_rank: Option<f64>,
    pub impression_rank_share: Option<f64>,
    pub exact_matches: Option<f64>,
    pub phrase_matches: Option<f64>,
    pub broad_matches: Option<f64>,
    pub auto_matches: Option<f64>,
    pub ppc_sales: Option<f64>,
    pub currency: Option<String>,
    pub ppc_spend: Option<f64>,
    pub cost_per_clicks: Option<f64>,
    pub click_through_rate: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub total_clicks: Option<f64>,
    pub acos: Option<f64>,
}

impl PpcMetrics {
    fn from_ad_data(ad: Option<&AdData>, missing_share: Option<f64>) -> Self {
        let Some(ad) = ad else {
            return Self {
                impression_rank_share: missing_share,
                ..Self::default()
            };
        };
        Self {
            impression_rank: ad.impression_rank,
            impression_rank_share: share_fraction(ad.impression_rank_share).or(missing_share),
            exact_matches: ad.exact_matches,
            phrase_matches: ad.phrase_matches,
            broad_matches: ad.broad_matches,
            auto_matches: ad.auto_matches,
            ppc_sales: ad.ppc_sales,
            currency: ad.currency.clone(),
            ppc_spend: ad.ppc_spend,
            cost_per_clicks: ad.cost_per_clicks,
            click_through_rate: ad.click_through_rate,
            conversion_rate: ad.conversion_rate,
            total_clicks: ad.total_clicks,
            acos: ad.acos,
        }
    }
}

pub fn share_fraction(percent: Option<f64>) -> Option<f64> {
    percent.filter(|p| p.is_finite()).map(|p| p / 100.0)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSeriesSet {
    pub organic: RankSeries,
    pub impression: RankSeries,
    pub sponsored: RankSeries,
}

// Organic ranks are blanked on interpolated days; the span is drawn instead.
pub fn rank_series(ranks: &[RankObservation], zone: &DisplayZone) -> RankSeriesSet {
    let mut series = RankSeriesSet::default();
    for rank in ranks {
        let Some(date) = rank
            .bucket
            .as_ref()
            .and_then(|bucket| normalize_bucket_in(bucket, zone, DATE_KEY_FORMAT))
        else {
            continue;
        };
        let organic = if rank.is_interpolated {
            None
        } else {
            rank.organic_rank
        };
        series.organic.insert(date.clone(), organic);
        series.impression.insert(date.clone(), rank.impression_rank);
        series.sponsored.insert(date, rank.sponsored_rank);
    }
    series
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRow {
    pub id: String,
    pub row_id: String,
    pub keyword: String,
    pub search_volume: f64,
    pub sv_share: Option<f64>,
    pub relevancy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub org_hierarchy: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyword_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_aggregate_row: bool,
    #[serde(flatten)]
    pub ppc: PpcMetrics,
    pub organic_rank_data: RankSeries,
    pub impression_rank_data: RankSeries,
    pub sponsored_rank_data: RankSeries,
    pub interpolated_data: BTreeMap<String, InterpolatedSpan>,
}

impl HeatmapRow {
    fn with_ranks(mut self, ranks: &[RankObservation], zone: &DisplayZone, dates: &[String]) -> Self {
        let series = rank_series(ranks, zone);
        self.organic_rank_data = series.organic;
        self.impression_rank_data = series.impression;
        self.sponsored_rank_data = series.sponsored;
        self.interpolated_data = interpolate(ranks, zone, dates);
        self
    }

    fn keyword_row(keyword: &HeatmapKeyword, row_id: String) -> Self {
        Self {
            id: keyword.keyword_id.clone(),
            row_id,
            keyword: keyword.keyword.clone(),
            search_volume: keyword.search_volume,
            sv_share: keyword.sv_share,
            relevancy: keyword.relevancy,
            refreshed_at: keyword.refreshed_at.clone(),
            ppc: PpcMetrics::from_ad_data(keyword.ad_data.as_ref(), None),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapView {
    pub rows: Vec<HeatmapRow>,
    pub aggregate_row: HeatmapRow,
    pub indicators: Vec<Indicator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<RootGroup>,
    pub has_ppc_data: bool,
}

pub fn format_aggregate_row(aggregate: &AggregateResponse, zone: &DisplayZone) -> HeatmapRow {
    let mut organic = RankSeries::new();
    let mut impression = RankSeries::new();
    let mut sponsored = RankSeries::new();
    for rank in &aggregate.average.ranks {
        let Some(date) = rank
            .bucket
            .as_ref()
            .and_then(|bucket| normalize_bucket_in(bucket, zone, DATE_KEY_FORMAT))
        else {
            continue;
        };
        organic.insert(date.clone(), rank.organic_rank);
        impression.insert(date.clone(), rank.impression_rank);
        sponsored.insert(date, rank.sponsored_rank);
    }

    HeatmapRow {
        id: AGGREGATE_ROW_ID.to_string(),
        row_id: AGGREGATE_ROW_ID.to_string(),
        search_volume: aggregate.total.search_volume,
        sv_share: Some(1.0),
        relevancy: Some(1.0),
        is_aggregate_row: true,
        ppc: PpcMetrics::from_ad_data(aggregate.average.ad_data.as_ref(), None),
        organic_rank_data: organic,
        impression_rank_data: impression,
        sponsored_rank_data: sponsored,
        ..HeatmapRow::default()
    }
}

pub fn has_ppc_data(aggregate: &AggregateResponse) -> bool {
    let Some(ad) = aggregate.average.ad_data.as_ref() else {
        return false;
    };
    let total: f64 = [
        ad.impression_rank,
        ad.auto_matches,
        ad.broad_matches,
        ad.exact_matches,
        ad.phrase_matches,
    ]
    .iter()
    .map(|value| value.filter(|v| v.is_finite()).unwrap_or(0.0))
    .sum();
    total > 0.0
}

pub fn format_heatmap_data(
    data: &HeatmapResponse,
    zone: &DisplayZone,
    dates: &[String],
) -> HeatmapView {
    let rows: Vec<HeatmapRow> = data
        .keywords
        .iter()
        .map(|keyword| {
            HeatmapRow::keyword_row(keyword, keyword.keyword_id.clone())
                .with_ranks(&keyword.ranks, zone, dates)
        })
        .collect();

    log_view_built("keywords", &rows, dates.len());

    HeatmapView {
        rows,
        aggregate_row: format_aggregate_row(&data.aggregate, zone),
        indicators: data.indicators.clone(),
        roots: Vec::new(),
        has_ppc_data: has_ppc_data(&data.aggregate),
    }
}

// Each root row is followed by its keyword rows (`{keywordId}_{rootId}`).
pub fn format_roots_data(data: &RootsResponse, zone: &DisplayZone, dates: &[String]) -> HeatmapView {
    let mut rows = Vec::new();
    let mut roots = Vec::with_capacity(data.roots.len());

    for (index, root) in data.roots.iter().enumerate() {
        let root_id = format!("root_{}", index + 1);
        let keyword_ids: Vec<String> = root
            .keywords
            .iter()
            .map(|keyword| keyword.keyword_id.clone())
            .collect();

        let root_row = HeatmapRow {
            id: root_id.clone(),
            row_id: root_id.clone(),
            keyword: root.root.clone(),
            search_volume: root.broad_search_volume,
            sv_share: root.broad_search_volume_ratio,
            org_hierarchy: vec![root.root.clone()],
            keyword_ids: keyword_ids.clone(),
            ppc: PpcMetrics::from_ad_data(root.ad_data.as_ref(), Some(0.0)),
            ..HeatmapRow::default()
        };
        rows.push(root_row.with_ranks(&root.ranks, zone, dates));

        for keyword in &root.keywords {
            let mut row = HeatmapRow::keyword_row(keyword, format!("{}_{}", keyword.keyword_id, root_id));
            row.org_hierarchy = vec![root.root.clone(), keyword.keyword.clone()];
            rows.push(row.with_ranks(&keyword.ranks, zone, dates));
        }

        roots.push(RootGroup {
            id: root_id,
            keyword_ids,
        });
    }

    log_view_built("roots", &rows, dates.len());

    HeatmapView {
        rows,
        aggregate_row: format_aggregate_row(&data.aggregate, zone),
        indicators: data.indicators.clone(),
        roots,
        has_ppc_data: has_ppc_data(&data.aggregate),
    }
}

fn log_view_built(mode: &str, rows: &[HeatmapRow], axis_len: usize) {
    let spans = rows
        .iter()
        .flat_map(|row| row.interpolated_data.values())
        .filter(|span| !span.hidden)
        .count();
    log_heatmap_built(mode, rows.len(), axis_len, spans);
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverviewResponseRow {
    #[serde(deserialize_with = "lenient::or_default")]
    pub avg_organic_rank: f64,
    #[serde(deserialize_with = "lenient::bucket")]
    pub bucket: Option<Bucket>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub krt_id: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub top10kw: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub top10sv: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub top50kw: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub top50sv: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewResponse {
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub indicators: Vec<Indicator>,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub overview: Vec<OverviewResponseRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverviewKind {
    AvgRank,
    Top10Kw,
    Top10Sv,
    Top50Kw,
    Top50Sv,
}

impl OverviewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvgRank => "avgRank",
            Self::Top10Kw => "top10Kw",
            Self::Top10Sv => "top10Sv",
            Self::Top50Kw => "top50Kw",
            Self::Top50Sv => "top50Sv",
        }
    }
}

pub const OVERVIEW_KINDS: [OverviewKind; 5] = [
    OverviewKind::AvgRank,
    OverviewKind::Top10Kw,
    OverviewKind::Top10Sv,
    OverviewKind::Top50Kw,
    OverviewKind::Top50Sv,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    #[serde(rename = "type")]
    pub kind: OverviewKind,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverviewView {
    pub overview: Vec<OverviewRow>,
    pub indicators: Vec<Indicator>,
}

pub fn format_overview_data(data: &OverviewResponse, zone: &DisplayZone) -> OverviewView {
    let mut overview: Vec<OverviewRow> = OVERVIEW_KINDS
        .iter()
        .map(|kind| OverviewRow {
            kind: *kind,
            values: BTreeMap::new(),
        })
        .collect();

    for item in &data.overview {
        let Some(date) = item
            .bucket
            .as_ref()
            .and_then(|bucket| normalize_bucket_in(bucket, zone, DATE_KEY_FORMAT))
        else {
            continue;
        };
        let values = [
            item.avg_organic_rank,
            item.top10kw,
            item.top10sv,
            item.top50kw,
            item.top50sv,
        ];
        for (row, value) in overview.iter_mut().zip(values) {
            row.values.insert(date.clone(), value);
        }
    }

    OverviewView {
        overview,
        indicators: data.indicators.clone(),
    }
}
