use std::collections::BTreeMap;

use super::model::{Cell, Table};

// ---------------------------------------------------------------------------
// Column selection
// ---------------------------------------------------------------------------

/// Keep only the analytes named in `names` (names the table lacks are ignored).
///
/// Used to align a table with the analytes a model was trained on before
/// transforming it.
pub fn retain_analytes<'a, I>(table: &Table, names: I) -> Table
where
    I: IntoIterator<Item = &'a str>,
{
    let mut columns: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    for name in names {
        if let Some(cells) = table.column(name) {
            columns.insert(name.to_string(), cells.to_vec());
        }
    }
    let dropped = table.n_analytes() - columns.len();
    if dropped > 0 {
        log::info!("dropped {dropped} analytes not present in the selection");
    }
    table.with_columns(columns)
}

/// Split off analytes without a single observed value.
///
/// Returns the remaining table and the names that were removed.
pub fn drop_empty_analytes(table: &Table) -> (Table, Vec<String>) {
    let mut kept: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    let mut removed = Vec::new();
    for (name, cells) in table.columns() {
        if cells.iter().any(Option::is_some) {
            kept.insert(name.to_string(), cells.to_vec());
        } else {
            removed.push(name.to_string());
        }
    }
    if !removed.is_empty() {
        log::warn!("removed analytes with no observations: {}", removed.join(", "));
    }
    (table.with_columns(kept), removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_columns([
            ("A", vec![Some(1.0), None]),
            ("B", vec![None, None]),
            ("C", vec![Some(3.0), Some(4.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn retain_keeps_intersection() {
        let t = retain_analytes(&table(), ["C", "A", "nope"]);
        assert_eq!(t.analytes().collect::<Vec<_>>(), ["A", "C"]);
        assert_eq!(t.n_individuals(), 2);
    }

    #[test]
    fn drop_empty_reports_removed() {
        let (t, removed) = drop_empty_analytes(&table());
        assert_eq!(removed, ["B"]);
        assert!(!t.contains_analyte("B"));
        assert_eq!(t.column("A").unwrap(), &[Some(1.0), None]);
    }
}
