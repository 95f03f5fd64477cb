use std::ops::Deref;

use crate::data::model::Table;
use crate::error::{DivergenceError, Result};
use crate::ranges::{ABOVE, BELOW, WITHIN};

/// A table whose present cells are all -1.0, 0.0 or +1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceMatrix(Table);

impl DivergenceMatrix {
    /// Wrap a table produced by classification.
    pub(crate) fn from_labels(table: Table) -> Self {
        debug_assert!(table.columns().all(|(_, c)| c.iter().flatten().all(|v| is_label(*v))));
        DivergenceMatrix(table)
    }

    pub fn as_table(&self) -> &Table {
        &self.0
    }

    /// Cell-wise absolute value.
    pub fn abs(&self) -> DivergenceMatrix {
        DivergenceMatrix(self.0.map_values(f64::abs))
    }

    /// Replace every cell equal to `label` with 0.0.
    pub(crate) fn zero_out(&self, label: f64) -> DivergenceMatrix {
        DivergenceMatrix(self.0.map_values(|v| if v == label { WITHIN } else { v }))
    }
}

fn is_label(v: f64) -> bool {
    v == BELOW || v == WITHIN || v == ABOVE
}

impl TryFrom<Table> for DivergenceMatrix {
    type Error = DivergenceError;

    /// Accept an externally built table after checking its cell domain.
    fn try_from(table: Table) -> Result<Self> {
        for (name, cells) in table.columns() {
            if let Some((row, v)) = cells
                .iter()
                .enumerate()
                .find_map(|(i, c)| c.filter(|v| !is_label(*v)).map(|v| (i, v)))
            {
                return Err(DivergenceError::Data(format!(
                    "divergence matrix cell ({row}, {name}) is {v}, expected -1, 0 or 1"
                )));
            }
        }
        Ok(DivergenceMatrix(table))
    }
}

impl Deref for DivergenceMatrix {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.0
    }
}
