//! Diagnostics raised while learning ranges.
//!
//! None of these are errors: the range is still produced. They go to a
//! [`RangeObserver`] supplied by the caller, and [`LogObserver`] (the
//! default) forwards them to the `log` facade.

use std::fmt;

/// A non-fatal condition noticed while fitting one analyte.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeDiagnostic {
    /// Too few observations to place the upper bound below the maximum;
    /// the bound was clamped to the largest observed value.
    InsufficientDensity {
        analyte: String,
        upper_pct: f64,
        observations: usize,
    },
    /// Tie adjustment pushed the lower bound above the upper bound; the
    /// unadjusted percentile positions were used instead.
    CrossedBounds {
        analyte: String,
        adjusted_lower: f64,
        adjusted_upper: f64,
    },
}

impl fmt::Display for RangeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeDiagnostic::InsufficientDensity {
                analyte,
                upper_pct,
                observations,
            } => write!(
                f,
                "{analyte} does not have enough values to choose a range at the {upper_pct} level \
                 ({observations} observations); upper bound clamped to the maximum"
            ),
            RangeDiagnostic::CrossedBounds {
                analyte,
                adjusted_lower,
                adjusted_upper,
            } => write!(
                f,
                "{analyte}: tie adjustment crossed the bounds ({adjusted_lower} > {adjusted_upper}); \
                 using unadjusted percentile positions"
            ),
        }
    }
}

/// Receives diagnostics during fitting.
pub trait RangeObserver {
    fn observe(&self, diagnostic: &RangeDiagnostic);
}

impl<F> RangeObserver for F
where
    F: Fn(&RangeDiagnostic),
{
    fn observe(&self, diagnostic: &RangeDiagnostic) {
        self(diagnostic)
    }
}

/// Forwards diagnostics to `log::warn!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl RangeObserver for LogObserver {
    fn observe(&self, diagnostic: &RangeDiagnostic) {
        log::warn!(target: "divergence::ranges", "{diagnostic}");
    }
}

/// Drops every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RangeObserver for NullObserver {
    fn observe(&self, _diagnostic: &RangeDiagnostic) {}
}
