use crate::error::{MetricsError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOW_BALANCE_THRESHOLD: f64 = 50_000.0;
pub const DEFAULT_MAX_REPORTED_ANOMALIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(
        description = "Balance below which a calendar day counts as a low-balance day in the health analysis."
    )]
    pub low_balance_threshold: f64,

    #[schemars(
        description = "If true, an unparseable transaction date is rejected instead of being replaced by the current time."
    )]
    pub strict_dates: bool,

    #[schemars(
        description = "How many anomalies the behavioral snapshot keeps (in detection order)."
    )]
    pub max_reported_anomalies: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            low_balance_threshold: DEFAULT_LOW_BALANCE_THRESHOLD,
            strict_dates: false,
            max_reported_anomalies: DEFAULT_MAX_REPORTED_ANOMALIES,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.low_balance_threshold.is_finite() || self.low_balance_threshold < 0.0 {
            return Err(MetricsError::InvalidConfig {
                field: "low_balance_threshold".to_string(),
                details: format!(
                    "must be a finite, non-negative amount (got {})",
                    self.low_balance_threshold
                ),
            });
        }
        Ok(())
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(AnalysisConfig);
        serde_json::to_string_pretty(&schema)
    }
}
