/// Data layer: the table type, file loading, writing and column selection.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  individuals × named analyte columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  align columns with a model, drop empty analytes
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  tables, ranges and probabilities → CSV
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
