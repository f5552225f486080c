//! Logging setup and the structured events emitted by the heatmap server.

use std::fmt::Display;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::{env_value, HeatmapConfig};

const COMPONENT: &str = "heatmap_server";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" | "text" => Some(Self::Compact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    // EnvFilter directives, e.g. `info,rankgrid=debug`.
    pub filter: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Compact,
            include_target: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("invalid log filter {filter:?}: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

// A filter that does not parse keeps the default.
pub fn logging_config_from_env() -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if let Some(filter) = env_value("RANKGRID_LOG") {
        if EnvFilter::try_new(&filter).is_ok() {
            config.filter = filter;
        }
    }
    if let Some(format) = env_value("RANKGRID_LOG_FORMAT").and_then(|raw| LogFormat::parse(&raw)) {
        config.format = format;
    }
    if let Some(target) = env_value("RANKGRID_LOG_TARGET").and_then(|raw| parse_switch(&raw)) {
        config.include_target = target;
    }

    config
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|source| {
        LoggingInitError::InvalidFilter {
            filter: config.filter.clone(),
            source,
        }
    })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_ansi(config.format != LogFormat::Json);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish())?,
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = COMPONENT,
        event = "app.start",
        log_filter = %config.filter,
        log_format = ?config.format
    );
}

pub fn log_heatmap_config(config: &HeatmapConfig) {
    info!(
        component = COMPONENT,
        event = "config.selected",
        time_zone = %config.time_zone,
        timeline = ?config.timeline,
        window_days = config.window_days
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = COMPONENT,
        event = "app.bind",
        bind_addr = %bound_addr,
        route_prefix = "/heatmap"
    );
}

pub(crate) fn log_heatmap_built(mode: &str, rows: usize, axis_len: usize, spans: usize) {
    info!(
        component = COMPONENT,
        event = "heatmap.built",
        mode,
        rows,
        axis_len,
        spans
    );
}

pub(crate) fn log_request_rejected(code: &str, error: &dyn Display) {
    warn!(
        component = COMPONENT,
        event = "request.rejected",
        code,
        error = %error
    );
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}
