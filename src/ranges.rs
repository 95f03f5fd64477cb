//! Empirical normal ranges.
//!
//! For each analyte the non-missing training values are sorted and the
//! bounds are read at `floor(n * pct)`, then nudged so a bound never splits
//! a run of equal values. Bounds are always observed values, never
//! interpolated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::model::{Cell, Table};
use crate::error::{DivergenceError, Result};
use crate::observer::{RangeDiagnostic, RangeObserver};

/// Label for a value below its analyte's range.
pub const BELOW: f64 = -1.0;
/// Label for a value inside its analyte's range (bounds inclusive).
pub const WITHIN: f64 = 0.0;
/// Label for a value above its analyte's range.
pub const ABOVE: f64 = 1.0;

/// Learned (lower, upper) bounds for one analyte. `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub lower: f64,
    pub upper: f64,
}

impl Range {
    pub fn new(lower: f64, upper: f64) -> Self {
        Range { lower, upper }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// -1.0, 0.0 or +1.0 depending on where `value` falls.
    pub fn classify(&self, value: f64) -> f64 {
        if self.contains(value) {
            WITHIN
        } else if value < self.lower {
            BELOW
        } else {
            ABOVE
        }
    }

    /// A range is degenerate when both bounds hold the same value.
    pub fn is_degenerate(&self) -> bool {
        self.lower == self.upper
    }
}

/// Percentiles must satisfy `0 <= lower < upper <= 1`.
pub fn validate_percentiles(lower_pct: f64, upper_pct: f64) -> Result<()> {
    let in_unit = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
    if !in_unit(lower_pct) || !in_unit(upper_pct) {
        return Err(DivergenceError::InvalidArgument(format!(
            "percentiles must lie in [0, 1], got lower={lower_pct} upper={upper_pct}"
        )));
    }
    if lower_pct >= upper_pct {
        return Err(DivergenceError::InvalidArgument(format!(
            "lower percentile {lower_pct} must be below upper percentile {upper_pct}"
        )));
    }
    Ok(())
}

/// Learn a range for every analyte of `training`.
///
/// Fails on the first analyte with no observed values.
pub fn fit_ranges(
    training: &Table,
    lower_pct: f64,
    upper_pct: f64,
    observer: &dyn RangeObserver,
) -> Result<BTreeMap<String, Range>> {
    validate_percentiles(lower_pct, upper_pct)?;
    training
        .columns()
        .map(|(name, cells)| {
            let range = column_range(name, cells, lower_pct, upper_pct, observer)?;
            log::debug!("{name}: range [{}, {}]", range.lower, range.upper);
            Ok((name.to_string(), range))
        })
        .collect()
}

/// Range for a single analyte column.
pub fn column_range(
    analyte: &str,
    cells: &[Cell],
    lower_pct: f64,
    upper_pct: f64,
    observer: &dyn RangeObserver,
) -> Result<Range> {
    let mut values: Vec<f64> = cells.iter().flatten().copied().collect();
    if values.is_empty() {
        return Err(DivergenceError::Data(format!(
            "empty analyte column: {analyte}"
        )));
    }
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let last = n - 1;
    let nominal_lo = (n as f64 * lower_pct).floor() as usize;
    let nominal_hi = (n as f64 * upper_pct).floor() as usize;

    // Pull the upper bound below a tie run that extends past the cutoff.
    let mut hi = nominal_hi;
    if hi < last {
        while hi > 0 && values[hi] == values[hi + 1] {
            hi -= 1;
        }
    } else {
        hi = last;
        observer.observe(&RangeDiagnostic::InsufficientDensity {
            analyte: analyte.to_string(),
            upper_pct,
            observations: n,
        });
    }

    // Push the lower bound above a tie run that straddles the cutoff.
    let mut lo = nominal_lo.min(last);
    if lo > 0 {
        while lo < last && values[lo] == values[lo - 1] {
            lo += 1;
        }
    }

    if values[lo] > values[hi] {
        observer.observe(&RangeDiagnostic::CrossedBounds {
            analyte: analyte.to_string(),
            adjusted_lower: values[lo],
            adjusted_upper: values[hi],
        });
        return Ok(Range::new(
            values[nominal_lo.min(last)],
            values[nominal_hi.min(last)],
        ));
    }

    Ok(Range::new(values[lo], values[hi]))
}
