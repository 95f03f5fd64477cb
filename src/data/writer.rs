use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use super::model::Table;
use crate::ranges::Range;

/// Header of the label column in written tables.
pub const INDIVIDUAL_COLUMN: &str = "individual";

/// Write a table (or divergence matrix) as CSV. Missing cells are empty.
pub fn write_table_csv<W: Write>(table: &Table, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec![INDIVIDUAL_COLUMN.to_string()];
    header.extend(table.analytes().map(str::to_string));
    writer.write_record(&header).context("writing CSV header")?;

    for (row, label) in table.individuals().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(label.clone());
        record.extend(table.row(row).into_iter().map(format_cell));
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// `analyte,lower,upper`
pub fn write_ranges_csv<W: Write>(ranges: &BTreeMap<String, Range>, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["analyte", "lower", "upper"])
        .context("writing CSV header")?;
    for (name, range) in ranges {
        writer
            .write_record([name.clone(), range.lower.to_string(), range.upper.to_string()])
            .with_context(|| format!("writing range for {name}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// `analyte,probability`
pub fn write_probabilities_csv<W: Write>(probs: &BTreeMap<String, f64>, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["analyte", "probability"])
        .context("writing CSV header")?;
    for (name, p) in probs {
        writer
            .write_record([name.clone(), p.to_string()])
            .with_context(|| format!("writing probability for {name}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

fn format_cell(cell: Option<f64>) -> String {
    cell.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    #[test]
    fn table_csv_reads_back() {
        let table = Table::from_columns([
            ("a", vec![Some(-1.0), None]),
            ("b", vec![Some(0.0), Some(1.0)]),
        ])
        .unwrap();
        let mut buf = Vec::new();
        write_table_csv(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text, "individual,a,b\n0,-1,0\n1,,1\n");
        assert_eq!(read_csv(buf.as_slice()).unwrap(), table);
    }

    #[test]
    fn ranges_and_probabilities() {
        let mut ranges = BTreeMap::new();
        ranges.insert("a".to_string(), Range::new(1.5, 10.0));
        let mut buf = Vec::new();
        write_ranges_csv(&ranges, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "analyte,lower,upper\na,1.5,10\n");

        let mut probs = BTreeMap::new();
        probs.insert("a".to_string(), 0.25);
        let mut buf = Vec::new();
        write_probabilities_csv(&probs, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "analyte,probability\na,0.25\n");
    }
}
