//! Keyword rank heatmap engine.

mod borders;
mod bucket;
mod color;
mod config;
mod interpolation;
mod lenient;
mod observability;
mod rows;
mod server;
mod zone;

pub use borders::{
    cell_borders_from_highlights, cell_key, compute_cell_borders, group_highlights_by_keyword,
    with_default_colors, CellBorder, Highlight, HighlightKind, RootGroup, DEFAULT_HIGHLIGHT_COLOR,
};
pub use bucket::{
    date_key, display_date_text, format_date, normalize_bucket, normalize_bucket_in,
    normalize_bucket_or, parse_date_key, parse_timeline, parse_timestamp, AxisError, Bucket,
    DateAxis, Timeline, DATE_KEY_FORMAT, DEFAULT_DATE_FALLBACK, DISPLAY_DATE_FORMAT,
};
pub use color::{cell_rank_color, ColorRampCache, NO_VALUE_COLOR, OUT_OF_RANGE_COLOR};
pub use config::{
    heatmap_config_from_env, ConfigError, HeatmapConfig, DEFAULT_TIME_ZONE, DEFAULT_WINDOW_DAYS,
    MAX_WINDOW_DAYS,
};
pub use interpolation::{
    interpolate, observations_by_date, InterpolatedSpan, RankObservation, MAX_GAP,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_heatmap_config, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError, DEFAULT_LOG_FILTER,
};
pub use rows::{
    format_aggregate_row, format_heatmap_data, format_overview_data, format_roots_data,
    has_ppc_data, rank_series, share_fraction, AdData, AggregateAverage, AggregateResponse,
    AggregateTotal, HeatmapKeyword, HeatmapResponse, HeatmapRow, HeatmapView, Indicator,
    OverviewKind, OverviewResponse, OverviewResponseRow, OverviewRow, OverviewView, PpcMetrics,
    RankSeries, RankSeriesSet, RootItem, RootsResponse, AGGREGATE_ROW_ID, OVERVIEW_KINDS,
};
pub use server::{
    heatmap_router, ApiErrorBody, AppError, DatesPayload, DatesQuery, HeatmapPayload,
    KeywordsRequest, OverviewRequest, RootsRequest, ViewOptions,
};
pub use zone::{DisplayZone, ZoneError};
