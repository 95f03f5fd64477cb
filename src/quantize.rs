//! Per-individual percentile ranks.

use std::collections::BTreeMap;

use crate::data::model::{Cell, Table};

/// Replace every cell by its percentile rank among the non-missing cells of
/// the same row, as a fraction in (0, 1].
///
/// Ties share the average rank. Missing cells stay missing. This normalises
/// an individual's profile against itself, not against the population.
pub fn quantize(table: &Table) -> Table {
    let names: Vec<String> = table.analytes().map(str::to_string).collect();
    let mut columns: BTreeMap<String, Vec<Cell>> = names
        .iter()
        .map(|name| (name.clone(), Vec::with_capacity(table.n_individuals())))
        .collect();

    for i in 0..table.n_individuals() {
        let ranked = rank_pct(&table.row(i));
        for (name, cell) in names.iter().zip(ranked) {
            if let Some(col) = columns.get_mut(name) {
                col.push(cell);
            }
        }
    }

    table.with_columns(columns)
}

/// Average-rank percentiles of the present values in `cells`.
pub(crate) fn rank_pct(cells: &[Cell]) -> Vec<Cell> {
    let mut present: Vec<(usize, f64)> = cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.map(|v| (i, v)))
        .collect();
    let n = present.len();
    let mut out = vec![None; cells.len()];
    if n == 0 {
        return out;
    }

    present.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && present[j + 1].1 == present[i].1 {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &(idx, _) in &present[i..=j] {
            out[idx] = Some(avg_rank / n as f64);
        }
        i = j + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Cell, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn distinct_values_rank_uniformly() {
        let r = rank_pct(&[Some(30.0), Some(10.0), Some(20.0), Some(40.0)]);
        assert!(approx(r[0], 0.75));
        assert!(approx(r[1], 0.25));
        assert!(approx(r[2], 0.5));
        assert!(approx(r[3], 1.0));
    }

    #[test]
    fn ties_share_average_rank() {
        // ranks 1, 2.5, 2.5, 4
        let r = rank_pct(&[Some(1.0), Some(5.0), Some(5.0), Some(9.0)]);
        assert!(approx(r[0], 0.25));
        assert!(approx(r[1], 0.625));
        assert!(approx(r[2], 0.625));
        assert!(approx(r[3], 1.0));
    }

    #[test]
    fn missing_cells_are_skipped() {
        let r = rank_pct(&[Some(2.0), None, Some(1.0)]);
        assert!(approx(r[0], 1.0));
        assert_eq!(r[1], None);
        assert!(approx(r[2], 0.5));
        assert_eq!(rank_pct(&[None, None]), vec![None, None]);
    }

    #[test]
    fn quantize_works_per_row() {
        let t = Table::from_columns([
            ("A", vec![Some(1.0), Some(100.0)]),
            ("B", vec![Some(2.0), Some(50.0)]),
        ])
        .unwrap();
        let q = quantize(&t);
        assert_eq!(q.column("A").unwrap(), &[Some(0.5), Some(1.0)]);
        assert_eq!(q.column("B").unwrap(), &[Some(1.0), Some(0.5)]);
        assert_eq!(q.individuals(), t.individuals());
    }
}
