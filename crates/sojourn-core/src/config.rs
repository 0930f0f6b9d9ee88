//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is an immutable value built once per invocation (from
//! defaults, an optional JSON file and CLI overrides) and passed down by
//! reference. Missing JSON fields fall back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub aggregation: AggregationParams,
    pub home_work: HomeWorkParams,
    pub activity: ActivityParams,
}

/// Spatial clustering of stay points into locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationParams {
    /// Maximum distance between neighbouring stay points of one location.
    pub epsilon_m: f64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self { epsilon_m: 100.0 }
    }
}

/// Time frames used by the recurrence classifier. Hours are local to the
/// timestamps as stored (UTC unless upstream converted them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrenceParams {
    pub rest_start_hour: u32,
    pub rest_end_hour: u32,
    pub work_start_hour: u32,
    pub work_end_hour: u32,
    /// Count all weekend hours as rest time.
    pub weekend_is_rest: bool,
}

impl Default for RecurrenceParams {
    fn default() -> Self {
        Self {
            rest_start_hour: 22,
            rest_end_hour: 8,
            work_start_hour: 8,
            work_end_hour: 18,
            weekend_is_rest: true,
        }
    }
}

/// Thresholds for the month-windowed home/work identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeWorkParams {
    /// Locations with at most this many stays overall are never home or work.
    pub min_visits_overall: usize,
    /// Minimum share of a month's stays that must carry a label to keep it.
    pub min_monthly_rate: f64,
    /// Months with fewer stays than this get no label.
    pub min_monthly_samples: usize,
    pub recurrence: RecurrenceParams,
}

impl Default for HomeWorkParams {
    fn default() -> Self {
        Self {
            min_visits_overall: 2,
            min_monthly_rate: 0.1,
            min_monthly_samples: 10,
            recurrence: RecurrenceParams::default(),
        }
    }
}

/// POI retrieval, prompt rendering and remote-call bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityParams {
    pub max_pois: usize,
    pub search_radius_m: f64,
    /// Omit the name of unnamed POIs instead of printing "Unnamed".
    pub skip_unnamed: bool,
    /// Offset applied to timestamps before rendering weekday and time of day.
    pub utc_offset_minutes: i32,
    pub poi_timeout_secs: u64,
    pub model_timeout_secs: u64,
}

impl Default for ActivityParams {
    fn default() -> Self {
        Self {
            max_pois: 10,
            search_radius_m: 150.0,
            skip_unnamed: false,
            utc_offset_minutes: 0,
            poi_timeout_secs: 30,
            model_timeout_secs: 60,
        }
    }
}

impl ActivityParams {
    pub fn poi_timeout(&self) -> Duration {
        Duration::from_secs(self.poi_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Absent sections and fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::InvalidConfig(msg));

        if !(self.aggregation.epsilon_m > 0.0) {
            return invalid(format!(
                "aggregation.epsilon_m must be positive, got {}",
                self.aggregation.epsilon_m
            ));
        }

        let rate = self.home_work.min_monthly_rate;
        if !(0.0..=1.0).contains(&rate) {
            return invalid(format!(
                "home_work.min_monthly_rate must be within [0, 1], got {rate}"
            ));
        }

        let r = &self.home_work.recurrence;
        for (name, hour) in [
            ("rest_start_hour", r.rest_start_hour),
            ("rest_end_hour", r.rest_end_hour),
            ("work_start_hour", r.work_start_hour),
            ("work_end_hour", r.work_end_hour),
        ] {
            if hour > 24 {
                return invalid(format!("home_work.recurrence.{name} must be <= 24, got {hour}"));
            }
        }

        if self.activity.max_pois == 0 {
            return invalid("activity.max_pois must be at least 1".to_string());
        }
        if !(self.activity.search_radius_m > 0.0) {
            return invalid(format!(
                "activity.search_radius_m must be positive, got {}",
                self.activity.search_radius_m
            ));
        }
        if self.activity.utc_offset_minutes.abs() >= 24 * 60 {
            return invalid(format!(
                "activity.utc_offset_minutes out of range: {}",
                self.activity.utc_offset_minutes
            ));
        }

        Ok(())
    }
}
