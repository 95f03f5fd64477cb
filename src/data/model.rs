use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DivergenceError, Result};

// ---------------------------------------------------------------------------
// Table – individuals (rows) × analytes (named columns)
// ---------------------------------------------------------------------------

/// A single measurement; `None` marks a missing value.
pub type Cell = Option<f64>;

/// A rectangular population table.
///
/// Rows are individuals (positional, with a display label), columns are
/// analytes keyed by name. Columns live in a `BTreeMap`, so iteration is
/// always in analyte-name order regardless of how the table was built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Individual labels, one per row.
    individuals: Vec<String>,
    /// analyte name → one cell per individual.
    columns: BTreeMap<String, Vec<Cell>>,
}

impl Table {
    /// Build a table, checking that every column has one cell per individual.
    ///
    /// NaN cells are normalised to missing.
    pub fn new(individuals: Vec<String>, columns: BTreeMap<String, Vec<Cell>>) -> Result<Self> {
        let n = individuals.len();
        for (name, cells) in &columns {
            if cells.len() != n {
                return Err(DivergenceError::Data(format!(
                    "analyte '{name}' has {} values but the table has {n} individuals",
                    cells.len()
                )));
            }
        }
        let columns = columns
            .into_iter()
            .map(|(name, cells)| {
                let cells = cells.into_iter().map(|c| c.filter(|v| !v.is_nan())).collect();
                (name, cells)
            })
            .collect();
        Ok(Table {
            individuals,
            columns,
        })
    }

    /// Build a table from named columns, labelling individuals by position.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Cell>)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, cells) in columns {
            let name = name.into();
            if map.insert(name.clone(), cells).is_some() {
                return Err(DivergenceError::Data(format!("duplicate analyte '{name}'")));
            }
        }
        let n = map.values().next().map_or(0, Vec::len);
        Table::new((0..n).map(|i| i.to_string()).collect(), map)
    }

    /// Same individuals, new columns. Caller guarantees the column lengths.
    pub(crate) fn with_columns(&self, columns: BTreeMap<String, Vec<Cell>>) -> Table {
        debug_assert!(columns.values().all(|c| c.len() == self.individuals.len()));
        Table {
            individuals: self.individuals.clone(),
            columns,
        }
    }

    pub fn individuals(&self) -> &[String] {
        &self.individuals
    }

    /// Analyte names in sorted order.
    pub fn analytes(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, analyte: &str) -> Option<&[Cell]> {
        self.columns.get(analyte).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn contains_analyte(&self, analyte: &str) -> bool {
        self.columns.contains_key(analyte)
    }

    /// Cell at (row, analyte). `None` for a missing cell or an unknown analyte.
    pub fn get(&self, row: usize, analyte: &str) -> Cell {
        self.columns.get(analyte).and_then(|c| c.get(row).copied().flatten())
    }

    /// One individual's cells, in analyte order.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.n_individuals()` and the table has any analyte.
    pub fn row(&self, row: usize) -> Vec<Cell> {
        self.columns.values().map(|c| c[row]).collect()
    }

    pub fn n_individuals(&self) -> usize {
        self.individuals.len()
    }

    pub fn n_analytes(&self) -> usize {
        self.columns.len()
    }

    /// Apply `f` to every non-missing cell.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, cells)| (name.clone(), cells.iter().map(|c| c.map(&f)).collect()))
            .collect();
        self.with_columns(columns)
    }
}

impl fmt::Display for Table {
    /// Tab-separated dump, mostly for logging and debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "individual")?;
        for name in self.columns.keys() {
            write!(f, "\t{name}")?;
        }
        writeln!(f)?;
        for (i, label) in self.individuals.iter().enumerate() {
            write!(f, "{label}")?;
            for cells in self.columns.values() {
                match cells[i] {
                    Some(v) => write!(f, "\t{v}")?,
                    None => write!(f, "\t<na>")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
