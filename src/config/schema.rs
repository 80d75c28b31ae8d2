use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FOCUS_COUNT: usize = 4;
pub const DEFAULT_POINTS_PROCEDURE: &str = "calculate_prediction_points";
pub const DEFAULT_POINTS_INTERVAL: &str = "1h";

/// Top-level configuration file.
///
/// Example YAML:
/// ```yaml
/// store:
///   url: "https://example.supabase.co"
/// focus_count: 4
/// points:
///   procedure: calculate_prediction_points
///   interval: 1h
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,

    /// How many weak categories `focus` reports (default: 4)
    #[serde(default)]
    pub focus_count: Option<usize>,

    #[serde(default)]
    pub points: Option<PointsConfig>,
}

/// Where the hosted data API lives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Project base url; tables are served under `/rest/v1/`
    pub url: String,

    /// Non-default database schema, sent as a profile header
    #[serde(default)]
    pub schema: Option<String>,
}

/// Scheduled prediction-points job.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PointsConfig {
    /// Stored procedure to invoke (default: calculate_prediction_points)
    #[serde(default)]
    pub procedure: Option<String>,

    /// Interval between runs in humantime format, e.g. "1h", "30m" (default: 1h)
    #[serde(default)]
    pub interval: Option<String>,
}

impl Config {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            store: StoreConfig {
                url: url.into(),
                schema: None,
            },
            focus_count: Some(DEFAULT_FOCUS_COUNT),
            points: Some(PointsConfig {
                procedure: Some(DEFAULT_POINTS_PROCEDURE.to_string()),
                interval: Some(DEFAULT_POINTS_INTERVAL.to_string()),
            }),
        }
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.unwrap_or(DEFAULT_FOCUS_COUNT)
    }

    pub fn points_procedure(&self) -> &str {
        self.points
            .as_ref()
            .and_then(|p| p.procedure.as_deref())
            .unwrap_or(DEFAULT_POINTS_PROCEDURE)
    }

    pub fn points_interval_str(&self) -> &str {
        self.points
            .as_ref()
            .and_then(|p| p.interval.as_deref())
            .unwrap_or(DEFAULT_POINTS_INTERVAL)
    }

    pub fn points_interval(&self) -> anyhow::Result<Duration> {
        Ok(humantime::parse_duration(self.points_interval_str())?)
    }
}
