use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a population table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – first column holds individual labels, the rest are numeric analytes
/// * `.json`    – `[{ "id": "...", "<analyte>": 1.5, ... }, ...]`
/// * `.csv`     – header row; first column labels, the rest numeric analytes
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "loaded {} individuals x {} analytes from {}",
        table.n_individuals(),
        table.n_analytes(),
        path.display()
    );
    Ok(table)
}

/// Assemble positional columns into a [`Table`], rejecting duplicate names.
fn build_table(
    individuals: Vec<String>,
    analytes: Vec<String>,
    columns: Vec<Vec<Cell>>,
) -> Result<Table> {
    let mut map = BTreeMap::new();
    for (name, cells) in analytes.into_iter().zip(columns) {
        if map.contains_key(&name) {
            bail!("duplicate analyte column '{name}'");
        }
        map.insert(name, cells);
    }
    Ok(Table::new(individuals, map)?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    read_csv(file)
}

/// CSV layout: header row with column names. The first column labels the
/// individual; every other column is an analyte. Empty cells and
/// `NA` / `NaN` / `null` are missing.
pub fn read_csv<R: Read>(input: R) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.len() < 2 {
        bail!("CSV needs an individual column and at least one analyte column");
    }
    let analytes = headers[1..].to_vec();

    let mut individuals = Vec::new();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); analytes.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        individuals.push(record.get(0).unwrap_or("").trim().to_string());
        for (j, cells) in columns.iter_mut().enumerate() {
            let raw = record.get(j + 1).unwrap_or("");
            cells.push(parse_cell(raw, row_no, &analytes[j])?);
        }
    }

    build_table(individuals, analytes, columns)
}

fn parse_cell(s: &str, row: usize, col: &str) -> Result<Cell> {
    let s = s.trim();
    if is_missing_token(s) {
        return Ok(None);
    }
    let v = s
        .parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))?;
    Ok(Some(v).filter(|v| !v.is_nan()))
}

fn is_missing_token(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "id": "P001", "glucose": 5.1, "sodium": 140.0 },
///   { "id": "P002", "glucose": null, "sodium": 138.0 }
/// ]
/// ```
///
/// `id` is optional (row position is used instead). An analyte absent from
/// a record is missing for that individual.
pub fn parse_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: BTreeSet<&str> = BTreeSet::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        names.extend(obj.keys().map(String::as_str).filter(|k| *k != "id"));
    }

    let mut individuals = Vec::with_capacity(records.len());
    let mut columns: BTreeMap<String, Vec<Cell>> = names
        .iter()
        .map(|n| (n.to_string(), Vec::with_capacity(records.len())))
        .collect();

    for (i, rec) in records.iter().enumerate() {
        let Some(obj) = rec.as_object() else {
            continue;
        };
        individuals.push(match obj.get("id") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => i.to_string(),
        });
        for (name, cells) in columns.iter_mut() {
            let cell = match obj.get(name) {
                None | Some(JsonValue::Null) => None,
                Some(v) => Some(
                    v.as_f64()
                        .with_context(|| format!("Row {i}, {name}: not a number"))?,
                ),
            };
            cells.push(cell);
        }
    }

    Ok(Table::new(individuals, columns)?)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding a population table.
///
/// Expected schema:
/// - first column: Utf8 / LargeUtf8 / Int32 / Int64 individual labels
/// - remaining columns: Float64 / Float32 / Int32 / Int64 analytes, nulls are missing
///
/// Works with files written by both **Pandas** (`df.reset_index().to_parquet()`)
/// and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    if schema.fields().len() < 2 {
        bail!("Parquet file needs an individual column and at least one analyte column");
    }
    let analytes: Vec<String> = schema
        .fields()
        .iter()
        .skip(1)
        .map(|f| f.name().clone())
        .collect();

    let reader = builder.build().context("building parquet reader")?;

    let mut individuals = Vec::new();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); analytes.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let offset = individuals.len();

        let labels = batch.column(0);
        for row in 0..batch.num_rows() {
            individuals.push(extract_label(labels, row, offset + row)?);
        }

        for (j, cells) in columns.iter_mut().enumerate() {
            extend_numeric(cells, batch.column(j + 1))
                .with_context(|| format!("reading analyte '{}'", analytes[j]))?;
        }
    }

    build_table(individuals, analytes, columns)
}

// -- Parquet / Arrow helpers --

/// Individual label at `row`; nulls fall back to the global row position.
fn extract_label(col: &Arc<dyn Array>, row: usize, position: usize) -> Result<String> {
    if col.is_null(row) {
        return Ok(position.to_string());
    }
    let label = match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .context("expected StringArray")?
            .value(row)
            .to_string(),
        DataType::LargeUtf8 => col
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .context("expected LargeStringArray")?
            .value(row)
            .to_string(),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row)
            .to_string(),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row)
            .to_string(),
        other => bail!("Individual column has unsupported type {other:?}"),
    };
    Ok(label)
}

/// Append a numeric Arrow column to `cells`, nulls and NaN as missing.
fn extend_numeric(cells: &mut Vec<Cell>, col: &Arc<dyn Array>) -> Result<()> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            cells.extend(arr.iter().map(|v| v.filter(|v| !v.is_nan())));
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            cells.extend(arr.iter().map(|v| v.map(f64::from).filter(|v| !v.is_nan())));
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            cells.extend(arr.iter().map(|v| v.map(f64::from)));
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            cells.extend(arr.iter().map(|v| v.map(|v| v as f64)));
        }
        other => bail!("Analyte column type {other:?} is not numeric"),
    }
    Ok(())
}
