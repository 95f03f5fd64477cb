//! The learned artifact: per-analyte ranges and the transform that applies them.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::data::model::{Cell, Table};
use crate::error::{DivergenceError, Result};
use crate::matrix::DivergenceMatrix;
use crate::observer::{LogObserver, RangeObserver};
use crate::quantize::quantize;
use crate::ranges::{fit_ranges, validate_percentiles, Range};

/// Per-analyte normal ranges learned from a reference population.
///
/// Ranges are computed when the model is built and never change afterwards,
/// so a model can be shared freely between threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredModel")]
pub struct DivergenceModel {
    lower_pct: f64,
    upper_pct: f64,
    quantize: bool,
    ranges: BTreeMap<String, Range>,
}

impl DivergenceModel {
    /// Fit with explicit percentiles, logging diagnostics through `log`.
    pub fn new(training: &Table, lower_pct: f64, upper_pct: f64, quantize: bool) -> Result<Self> {
        let config = ModelConfig {
            lower_pct,
            upper_pct,
            quantize,
        };
        Self::fit(training, &config)
    }

    pub fn fit(training: &Table, config: &ModelConfig) -> Result<Self> {
        Self::fit_with_observer(training, config, &LogObserver)
    }

    /// Fit, sending range diagnostics to `observer`.
    pub fn fit_with_observer(
        training: &Table,
        config: &ModelConfig,
        observer: &dyn RangeObserver,
    ) -> Result<Self> {
        config.validate()?;

        let training = if config.quantize {
            Cow::Owned(quantize(training))
        } else {
            Cow::Borrowed(training)
        };
        let ranges = fit_ranges(&training, config.lower_pct, config.upper_pct, observer)?;
        log::info!(
            "fitted {} analyte ranges from {} individuals (percentiles {}..{}, quantize={})",
            ranges.len(),
            training.n_individuals(),
            config.lower_pct,
            config.upper_pct,
            config.quantize
        );

        Ok(DivergenceModel {
            lower_pct: config.lower_pct,
            upper_pct: config.upper_pct,
            quantize: config.quantize,
            ranges,
        })
    }

    pub fn ranges(&self) -> &BTreeMap<String, Range> {
        &self.ranges
    }

    pub fn range(&self, analyte: &str) -> Result<&Range> {
        self.ranges
            .get(analyte)
            .ok_or_else(|| DivergenceError::AnalyteNotFound(vec![analyte.to_string()]))
    }

    pub fn analytes(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub fn lower_pct(&self) -> f64 {
        self.lower_pct
    }

    pub fn upper_pct(&self) -> f64 {
        self.upper_pct
    }

    /// Whether the training data was quantized before fitting.
    pub fn quantize(&self) -> bool {
        self.quantize
    }

    /// Label every cell of `table` as below (-1), within (0) or above (+1)
    /// its analyte's range. Missing cells stay missing.
    ///
    /// Every analyte of `table` must be known to the model; otherwise
    /// nothing is transformed and all unknown names are reported.
    pub fn transform(&self, table: &Table, quantize_first: bool) -> Result<DivergenceMatrix> {
        let unknown: Vec<String> = table
            .analytes()
            .filter(|name| !self.ranges.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(DivergenceError::AnalyteNotFound(unknown));
        }

        let source = if quantize_first {
            Cow::Owned(quantize(table))
        } else {
            Cow::Borrowed(table)
        };

        let mut columns: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
        for (name, cells) in source.columns() {
            let range = self.range(name)?;
            let labels = cells.iter().map(|c| c.map(|v| range.classify(v))).collect();
            columns.insert(name.to_string(), labels);
        }

        Ok(DivergenceMatrix::from_labels(source.with_columns(columns)))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// On-disk shape; converted into a model only after validation.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredModel {
    lower_pct: f64,
    upper_pct: f64,
    #[serde(default)]
    quantize: bool,
    ranges: BTreeMap<String, Range>,
}

impl TryFrom<StoredModel> for DivergenceModel {
    type Error = DivergenceError;

    fn try_from(stored: StoredModel) -> Result<Self> {
        validate_percentiles(stored.lower_pct, stored.upper_pct)?;
        for (name, range) in &stored.ranges {
            if range.lower.is_nan() || range.upper.is_nan() || range.lower > range.upper {
                return Err(DivergenceError::Data(format!(
                    "stored range for {name} has lower {} above upper {}",
                    range.lower, range.upper
                )));
            }
        }
        Ok(DivergenceModel {
            lower_pct: stored.lower_pct,
            upper_pct: stored.upper_pct,
            quantize: stored.quantize,
            ranges: stored.ranges,
        })
    }
}
