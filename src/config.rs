use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{MissingPolicy, Over};
use crate::error::DivergenceError;
use crate::ranges::validate_percentiles;

pub const DEFAULT_LOWER_PCT: f64 = 0.025;
pub const DEFAULT_UPPER_PCT: f64 = 0.975;

// ---------------------------------------------------------------------------
// Model parameters
// ---------------------------------------------------------------------------

/// Parameters used when fitting a [`DivergenceModel`](crate::DivergenceModel).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Percentile of the lower bound, in [0, 1).
    pub lower_pct: f64,
    /// Percentile of the upper bound, in (0, 1].
    pub upper_pct: f64,
    /// Rank each training individual's profile before fitting.
    pub quantize: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lower_pct: DEFAULT_LOWER_PCT,
            upper_pct: DEFAULT_UPPER_PCT,
            quantize: false,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> std::result::Result<(), DivergenceError> {
        validate_percentiles(self.lower_pct, self.upper_pct)
    }
}

// ---------------------------------------------------------------------------
// Aggregation parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub over: Over,
    pub missing: MissingPolicy,
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

/// Everything a run can be configured with. Every field is optional in the
/// JSON file:
///
/// ```json
/// {
///   "model": { "lower_pct": 0.05, "upper_pct": 0.95, "quantize": true },
///   "aggregation": { "over": "positive", "missing": "exclude" }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: ModelConfig,
    pub aggregation: AggregationConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("loading config file {}", path.display()))?;
        log::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("parsing config JSON")?;
        config.model.validate()?;
        Ok(config)
    }
}
