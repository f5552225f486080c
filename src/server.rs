//! HTTP routes exposing the heatmap engine to the grid frontend.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::borders::{cell_borders_from_highlights, with_default_colors, CellBorder, Highlight};
use crate::bucket::{parse_date_key, parse_timestamp, AxisError, DateAxis, Timeline};
use crate::config::{HeatmapConfig, MAX_WINDOW_DAYS};
use crate::lenient;
use crate::observability::log_request_rejected;
use crate::rows::{
    format_heatmap_data, format_overview_data, format_roots_data, HeatmapResponse, HeatmapView,
    OverviewResponse, OverviewView, RootsResponse,
};
use crate::zone::{DisplayZone, ZoneError};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewOptions {
    pub time_zone: Option<String>,
    pub timeline: Option<Timeline>,
    pub dates: Option<Vec<String>>,
    pub anchor: Option<String>,
    pub days: Option<usize>,
    pub tracked_since: Option<String>,
}

// Query form of `ViewOptions`; an explicit axis is only accepted in bodies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatesQuery {
    pub time_zone: Option<String>,
    pub timeline: Option<Timeline>,
    pub anchor: Option<String>,
    pub days: Option<usize>,
    pub tracked_since: Option<String>,
}

impl From<DatesQuery> for ViewOptions {
    fn from(query: DatesQuery) -> Self {
        Self {
            time_zone: query.time_zone,
            timeline: query.timeline,
            dates: None,
            anchor: query.anchor,
            days: query.days,
            tracked_since: query.tracked_since,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordsRequest {
    #[serde(flatten)]
    pub options: ViewOptions,
    #[serde(deserialize_with = "lenient::or_default")]
    pub data: HeatmapResponse,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootsRequest {
    #[serde(flatten)]
    pub options: ViewOptions,
    #[serde(deserialize_with = "lenient::or_default")]
    pub data: RootsResponse,
    #[serde(deserialize_with = "lenient::skip_malformed")]
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverviewRequest {
    pub time_zone: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub data: OverviewResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPayload {
    #[serde(flatten)]
    pub view: HeatmapView,
    pub dates: Vec<String>,
    pub columns: Vec<String>,
    pub cell_borders: BTreeMap<String, CellBorder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatesPayload {
    pub time_zone: String,
    pub timeline: Timeline,
    pub dates: Vec<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Zone(#[from] ZoneError),
    #[error(transparent)]
    Axis(#[from] AxisError),
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Payload(#[from] JsonRejection),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            Self::Zone(_) => "INVALID_TIME_ZONE",
            Self::Axis(_) => "INVALID_DATE_AXIS",
            Self::InvalidField { .. } | Self::Query(_) => "BAD_REQUEST",
            Self::Payload(_) => "INVALID_PAYLOAD",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log_request_rejected(self.code(), &self);
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

struct ResolvedView {
    zone: DisplayZone,
    timeline: Timeline,
    axis: DateAxis,
    columns: Vec<String>,
}

fn resolve_zone(config: &HeatmapConfig, time_zone: Option<&str>) -> Result<DisplayZone, AppError> {
    Ok(DisplayZone::parse(time_zone.unwrap_or(config.time_zone.as_str()))?)
}

fn resolve_view(config: &HeatmapConfig, options: &ViewOptions) -> Result<ResolvedView, AppError> {
    let zone = resolve_zone(config, options.time_zone.as_deref())?;
    let timeline = options.timeline.unwrap_or(config.timeline);

    let axis = match &options.dates {
        Some(dates) => DateAxis::new(dates.clone())?,
        None => {
            let anchor = match options.anchor.as_deref() {
                Some(raw) => parse_timestamp(raw).ok_or_else(|| AppError::InvalidField {
                    field: "anchor",
                    value: raw.to_string(),
                })?,
                None => Utc::now(),
            };
            let days = options.days.unwrap_or(config.window_days);
            if days == 0 || days > MAX_WINDOW_DAYS {
                return Err(AppError::InvalidField {
                    field: "days",
                    value: days.to_string(),
                });
            }
            DateAxis::generate(anchor, days, &zone)?
        }
    };

    let tracked_since = match options.tracked_since.as_deref() {
        Some(raw) => Some(parse_date_key(raw).ok_or_else(|| AppError::InvalidField {
            field: "trackedSince",
            value: raw.to_string(),
        })?),
        None => None,
    };
    let columns = axis.columns(timeline, tracked_since);

    Ok(ResolvedView {
        zone,
        timeline,
        axis,
        columns,
    })
}

fn build_payload(
    view: HeatmapView,
    resolved: ResolvedView,
    highlights: Vec<Highlight>,
) -> HeatmapPayload {
    let highlights = with_default_colors(highlights);
    let roots = (!view.roots.is_empty()).then_some(view.roots.as_slice());
    let cell_borders = cell_borders_from_highlights(
        resolved.axis.as_slice(),
        &highlights,
        resolved.timeline,
        &resolved.zone,
        roots,
    );

    HeatmapPayload {
        view,
        dates: resolved.axis.into_inner(),
        columns: resolved.columns,
        cell_borders,
    }
}

#[derive(Clone)]
struct HeatmapAppState {
    config: Arc<HeatmapConfig>,
}

pub fn heatmap_router(config: HeatmapConfig) -> Router {
    Router::new()
        .route("/heatmap/dates", get(get_dates))
        .route("/heatmap/keywords", post(post_keywords))
        .route("/heatmap/roots", post(post_roots))
        .route("/heatmap/overview", post(post_overview))
        .with_state(HeatmapAppState {
            config: Arc::new(config),
        })
}

async fn get_dates(
    State(state): State<HeatmapAppState>,
    query: Result<Query<DatesQuery>, QueryRejection>,
) -> Result<Json<DatesPayload>, AppError> {
    let Query(query) = query?;
    let resolved = resolve_view(&state.config, &ViewOptions::from(query))?;
    Ok(Json(DatesPayload {
        time_zone: resolved.zone.name(),
        timeline: resolved.timeline,
        dates: resolved.axis.into_inner(),
        columns: resolved.columns,
    }))
}

async fn post_keywords(
    State(state): State<HeatmapAppState>,
    request: Result<Json<KeywordsRequest>, JsonRejection>,
) -> Result<Json<HeatmapPayload>, AppError> {
    let Json(request) = request?;
    let resolved = resolve_view(&state.config, &request.options)?;
    let view = format_heatmap_data(&request.data, &resolved.zone, resolved.axis.as_slice());
    Ok(Json(build_payload(view, resolved, request.highlights)))
}

async fn post_roots(
    State(state): State<HeatmapAppState>,
    request: Result<Json<RootsRequest>, JsonRejection>,
) -> Result<Json<HeatmapPayload>, AppError> {
    let Json(request) = request?;
    let resolved = resolve_view(&state.config, &request.options)?;
    let view = format_roots_data(&request.data, &resolved.zone, resolved.axis.as_slice());
    Ok(Json(build_payload(view, resolved, request.highlights)))
}

async fn post_overview(
    State(state): State<HeatmapAppState>,
    request: Result<Json<OverviewRequest>, JsonRejection>,
) -> Result<Json<OverviewView>, AppError> {
    let Json(request) = request?;
    let zone = resolve_zone(&state.config, request.time_zone.as_deref())?;
    Ok(Json(format_overview_data(&request.data, &zone)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HeatmapConfig {
        HeatmapConfig {
            time_zone: "UTC".to_string(),
            window_days: 3,
            ..HeatmapConfig::default()
        }
    }

    #[test]
    fn generated_axis_ends_on_anchor_date() {
        let options = ViewOptions {
            anchor: Some("2024-03-05T12:00:00Z".to_string()),
            timeline: Some(Timeline::Inverted),
            ..ViewOptions::default()
        };
        let resolved = resolve_view(&config(), &options).unwrap();
        assert_eq!(
            resolved.axis.as_slice(),
            ["2024-03-03", "2024-03-04", "2024-03-05"]
        );
        assert_eq!(resolved.columns[0], "2024-03-05");
    }

    #[test]
    fn requested_window_overrides_default_within_bounds() {
        let options = ViewOptions {
            anchor: Some("2024-03-05".to_string()),
            days: Some(1),
            ..ViewOptions::default()
        };
        let resolved = resolve_view(&config(), &options).unwrap();
        assert_eq!(resolved.axis.as_slice(), ["2024-03-05"]);

        let too_wide = ViewOptions {
            days: Some(MAX_WINDOW_DAYS + 1),
            ..options
        };
        assert!(matches!(
            resolve_view(&config(), &too_wide),
            Err(AppError::InvalidField { field: "days", .. })
        ));
    }

    #[test]
    fn explicit_axis_is_validated() {
        let options = ViewOptions {
            dates: Some(vec!["2024-03-01".to_string(), "2024-03-05".to_string()]),
            ..ViewOptions::default()
        };
        assert!(matches!(
            resolve_view(&config(), &options),
            Err(AppError::Axis(AxisError::NotContiguous { .. }))
        ));
    }

    #[test]
    fn bad_tracking_start_is_rejected() {
        let options = ViewOptions {
            anchor: Some("2024-03-05T12:00:00Z".to_string()),
            tracked_since: Some("yesterday".to_string()),
            ..ViewOptions::default()
        };
        let err = resolve_view(&config(), &options).err().unwrap();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert_eq!(err.to_string(), "invalid trackedSince: yesterday");
    }
}
