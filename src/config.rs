//! Heatmap display configuration.

use std::env;

use thiserror::Error;

use crate::bucket::{parse_timeline, Timeline};
use crate::zone::{DisplayZone, ZoneError};

pub const DEFAULT_TIME_ZONE: &str = "PST";
pub const DEFAULT_WINDOW_DAYS: usize = 30;
pub const MAX_WINDOW_DAYS: usize = 3_660;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapConfig {
    pub time_zone: String,
    pub timeline: Timeline,
    pub window_days: usize,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            timeline: Timeline::Natural,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Zone(#[from] ZoneError),
    #[error("window_days out of range: {0}")]
    InvalidWindow(usize),
}

impl HeatmapConfig {
    pub fn zone(&self) -> Result<DisplayZone, ZoneError> {
        DisplayZone::parse(&self.time_zone)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        if self.window_days == 0 || self.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidWindow(self.window_days));
        }
        Ok(())
    }
}

pub fn heatmap_config_from_env() -> HeatmapConfig {
    let mut config = HeatmapConfig::default();

    if let Some(zone) = env_value("RANKGRID_TIME_ZONE") {
        if DisplayZone::parse(&zone).is_ok() {
            config.time_zone = zone;
        }
    }

    if let Some(timeline) = env_value("RANKGRID_TIMELINE").and_then(|raw| parse_timeline(&raw)) {
        config.timeline = timeline;
    }

    if let Some(days) = env_value("RANKGRID_WINDOW_DAYS").and_then(|raw| raw.parse::<usize>().ok()) {
        if (1..=MAX_WINDOW_DAYS).contains(&days) {
            config.window_days = days;
        }
    }

    config
}

// Trimmed value of a set, non-blank variable.
pub(crate) fn env_value(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    pub(crate) fn with_env_vars<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let _guard = env_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| ((*key).to_string(), env::var(key).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let output = f();

        for (key, value) in previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::test_env::with_env_vars;
    use super::*;

    #[test]
    fn defaults_when_env_missing() {
        let cfg = with_env_vars(
            &[
                ("RANKGRID_TIME_ZONE", None),
                ("RANKGRID_TIMELINE", None),
                ("RANKGRID_WINDOW_DAYS", None),
            ],
            heatmap_config_from_env,
        );

        assert_eq!(cfg, HeatmapConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_zone_timeline_and_window_from_env() {
        let cfg = with_env_vars(
            &[
                ("RANKGRID_TIME_ZONE", Some("Europe/Berlin")),
                ("RANKGRID_TIMELINE", Some("inverted")),
                ("RANKGRID_WINDOW_DAYS", Some("90")),
            ],
            heatmap_config_from_env,
        );

        assert_eq!(cfg.time_zone, "Europe/Berlin");
        assert_eq!(cfg.timeline, Timeline::Inverted);
        assert_eq!(cfg.window_days, 90);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = with_env_vars(
            &[
                ("RANKGRID_TIME_ZONE", Some("Atlantis/Deep")),
                ("RANKGRID_TIMELINE", Some("sideways")),
                ("RANKGRID_WINDOW_DAYS", Some("0")),
            ],
            heatmap_config_from_env,
        );

        assert_eq!(cfg, HeatmapConfig::default());
    }

    #[test]
    fn validate_rejects_bad_zone_and_window() {
        let bad_zone = HeatmapConfig {
            time_zone: "Nowhere".to_string(),
            ..HeatmapConfig::default()
        };
        assert!(matches!(bad_zone.validate(), Err(ConfigError::Zone(_))));

        let bad_window = HeatmapConfig {
            window_days: 0,
            ..HeatmapConfig::default()
        };
        assert_eq!(bad_window.validate(), Err(ConfigError::InvalidWindow(0)));
    }
}
