//! Post-processing of divergence matrices.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DivergenceError, Result};
use crate::matrix::DivergenceMatrix;
use crate::ranges::{ABOVE, BELOW};

/// analyte → probability of divergence in [0, 1].
pub type ProbabilityVector = BTreeMap<String, f64>;

/// Keep only the below-range labels (+1 becomes 0).
pub fn negative_only(matrix: &DivergenceMatrix) -> DivergenceMatrix {
    matrix.zero_out(ABOVE)
}

/// Keep only the above-range labels (-1 becomes 0).
pub fn positive_only(matrix: &DivergenceMatrix) -> DivergenceMatrix {
    matrix.zero_out(BELOW)
}

/// Which divergences count towards a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Over {
    /// Any divergence, either direction.
    #[default]
    Absolute,
    Positive,
    Negative,
}

impl FromStr for Over {
    type Err = DivergenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" => Ok(Over::Absolute),
            "positive" => Ok(Over::Positive),
            "negative" => Ok(Over::Negative),
            _ => Err(DivergenceError::InvalidArgument(format!(
                "unsupported aggregation mode: {s}"
            ))),
        }
    }
}

impl fmt::Display for Over {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Over::Absolute => "absolute",
            Over::Positive => "positive",
            Over::Negative => "negative",
        })
    }
}

/// How missing cells enter a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPolicy {
    /// Missing counts as not divergent; the individual stays in the denominator.
    #[default]
    NonDivergent,
    /// Missing cells are left out of numerator and denominator.
    Exclude,
}

impl FromStr for MissingPolicy {
    type Err = DivergenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "non-divergent" | "nondivergent" => Ok(MissingPolicy::NonDivergent),
            "exclude" => Ok(MissingPolicy::Exclude),
            _ => Err(DivergenceError::InvalidArgument(format!(
                "unsupported missing-value policy: {s}"
            ))),
        }
    }
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingPolicy::NonDivergent => "non-divergent",
            MissingPolicy::Exclude => "exclude",
        })
    }
}

/// Fraction of individuals divergent per analyte, missing cells counted as
/// not divergent.
pub fn probabilities(matrix: &DivergenceMatrix, over: Over) -> Result<ProbabilityVector> {
    probabilities_with(matrix, over, MissingPolicy::default())
}

pub fn probabilities_with(
    matrix: &DivergenceMatrix,
    over: Over,
    missing: MissingPolicy,
) -> Result<ProbabilityVector> {
    if matrix.n_individuals() == 0 {
        return Err(DivergenceError::Data("empty divergence matrix".to_string()));
    }

    let selected = match over {
        Over::Absolute => matrix.abs(),
        Over::Positive => positive_only(matrix),
        Over::Negative => negative_only(matrix).abs(),
    };

    let probs = selected
        .columns()
        .map(|(name, cells)| {
            let sum: f64 = cells.iter().flatten().sum();
            let count = match missing {
                MissingPolicy::NonDivergent => cells.len(),
                MissingPolicy::Exclude => cells.iter().flatten().count(),
            };
            let p = if count == 0 { 0.0 } else { sum / count as f64 };
            (name.to_string(), p)
        })
        .collect();
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;

    fn matrix(cols: Vec<(&str, Vec<Option<f64>>)>) -> DivergenceMatrix {
        let table = Table::from_columns(cols).unwrap();
        DivergenceMatrix::try_from(table).unwrap()
    }

    #[test]
    fn one_sided_filters() {
        let m = matrix(vec![("A", vec![Some(-1.0), Some(0.0), Some(1.0), None])]);
        assert_eq!(
            negative_only(&m).column("A").unwrap(),
            &[Some(-1.0), Some(0.0), Some(0.0), None]
        );
        assert_eq!(
            positive_only(&m).column("A").unwrap(),
            &[Some(0.0), Some(0.0), Some(1.0), None]
        );
    }

    #[test]
    fn probability_modes() {
        let m = matrix(vec![
            ("A", vec![Some(-1.0), Some(1.0), Some(1.0), Some(0.0)]),
            ("B", vec![Some(0.0), Some(0.0), Some(0.0), Some(-1.0)]),
        ]);
        let abs = probabilities(&m, Over::Absolute).unwrap();
        let pos = probabilities(&m, Over::Positive).unwrap();
        let neg = probabilities(&m, Over::Negative).unwrap();
        assert_eq!(abs["A"], 0.75);
        assert_eq!(pos["A"], 0.5);
        assert_eq!(neg["A"], 0.25);
        assert_eq!(abs["B"], 0.25);
        assert_eq!(pos["B"], 0.0);
        assert_eq!(neg["B"], 0.25);
    }

    #[test]
    fn negative_mode_counts_below_range_labels() {
        let m = matrix(vec![("A", vec![Some(-1.0), Some(0.0)])]);
        assert_eq!(probabilities(&m, Over::Absolute).unwrap()["A"], 0.5);
        assert_eq!(probabilities(&m, Over::Positive).unwrap()["A"], 0.0);
        assert_eq!(probabilities(&m, Over::Negative).unwrap()["A"], 0.5);
        // abs() turns -1 into +1, which the negative mode then filters out
        let flipped = negative_only(&m).abs();
        assert_eq!(probabilities(&flipped, Over::Negative).unwrap()["A"], 0.0);
    }

    #[test]
    fn missing_policies_differ_in_denominator() {
        let m = matrix(vec![("A", vec![Some(1.0), None, Some(0.0), None])]);
        let kept = probabilities_with(&m, Over::Absolute, MissingPolicy::NonDivergent).unwrap();
        let excluded = probabilities_with(&m, Over::Absolute, MissingPolicy::Exclude).unwrap();
        assert_eq!(kept["A"], 0.25);
        assert_eq!(excluded["A"], 0.5);

        let blank = matrix(vec![("A", vec![None, None])]);
        let p = probabilities_with(&blank, Over::Absolute, MissingPolicy::Exclude).unwrap();
        assert_eq!(p["A"], 0.0);
    }

    #[test]
    fn unsupported_mode_is_invalid_argument() {
        let err = "total".parse::<Over>().unwrap_err();
        assert_eq!(
            err,
            DivergenceError::InvalidArgument("unsupported aggregation mode: total".to_string())
        );
        assert_eq!("Negative".parse::<Over>().unwrap(), Over::Negative);
        assert!("sometimes".parse::<MissingPolicy>().is_err());
    }

    #[test]
    fn empty_matrix_is_rejected() {
        let m = matrix(vec![("A", vec![])]);
        assert!(matches!(
            probabilities(&m, Over::Absolute),
            Err(DivergenceError::Data(_))
        ));
    }
}
