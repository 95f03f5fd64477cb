//! Divergence matrices.
//!
//! Learn a per-analyte normal range from a reference population, label new
//! observations as below (-1), within (0) or above (+1) that range, and
//! summarise how often each analyte diverges.
//!
//! ```text
//!  Table ─[quantize]─▶ DivergenceModel::fit ─▶ ranges
//!                                              │
//!  Table ─────────────────▶ DivergenceModel::transform ─▶ DivergenceMatrix
//!                                                          │
//!                               negative_only / positive_only / probabilities
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod matrix;
pub mod model;
pub mod observer;
pub mod quantize;
pub mod ranges;

pub use aggregate::{
    negative_only, positive_only, probabilities, probabilities_with, MissingPolicy, Over,
    ProbabilityVector,
};
pub use config::{AggregationConfig, Config, ModelConfig};
pub use data::model::{Cell, Table};
pub use error::{DivergenceError, Result};
pub use matrix::DivergenceMatrix;
pub use model::DivergenceModel;
pub use observer::{LogObserver, NullObserver, RangeDiagnostic, RangeObserver};
pub use quantize::quantize;
pub use ranges::Range;
