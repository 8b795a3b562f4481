/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SampleTable
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ SampleTable  │  group labels + n×p feature matrix
///   └─────────────┘
/// ```
pub mod loader;
pub mod model;
