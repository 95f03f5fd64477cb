use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use divergence::data::writer::write_table_csv;
use divergence::Table;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (analyte, mean, standard deviation), plasma chemistry-ish magnitudes.
const ANALYTES: [(&str, f64, f64); 6] = [
    ("albumin", 42.0, 3.5),
    ("creatinine", 80.0, 15.0),
    ("glucose", 5.2, 0.6),
    ("potassium", 4.3, 0.35),
    ("sodium", 140.0, 2.5),
    ("urea", 5.5, 1.4),
];

const INDIVIDUALS: usize = 200;
const MISSING_RATE: f64 = 0.03;

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let individuals: Vec<String> = (1..=INDIVIDUALS).map(|i| format!("P{i:04}")).collect();

    let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (name, mean, sd) in ANALYTES {
        let cells = (0..INDIVIDUALS)
            .map(|_| {
                let value = rng.gauss(mean, sd);
                // Round to lab precision so ties occur, as in real measurements
                let value = (value * 10.0).round() / 10.0;
                (rng.next_f64() >= MISSING_RATE).then_some(value)
            })
            .collect();
        columns.insert(name.to_string(), cells);
    }

    let table = Table::new(individuals, columns)?;

    // Parquet: label column first, then one nullable Float64 column per analyte
    let mut fields = vec![Field::new("individual", DataType::Utf8, false)];
    let mut arrays: Vec<Arc<dyn arrow::array::Array>> = vec![Arc::new(StringArray::from(
        table.individuals().to_vec(),
    ))];
    for (name, cells) in table.columns() {
        fields.push(Field::new(name, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(cells.to_vec())));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let parquet_path = "sample_population.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    let csv_path = "sample_population.csv";
    let file = std::fs::File::create(csv_path).context("creating CSV output")?;
    write_table_csv(&table, file)?;

    println!(
        "Wrote {} individuals x {} analytes to {parquet_path} and {csv_path}",
        table.n_individuals(),
        table.n_analytes()
    );
    Ok(())
}
