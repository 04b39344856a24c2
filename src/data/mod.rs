/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  public-trees.csv / records API
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse source → TreeTable (+ dropped-row count)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ TreeTable │  Vec<TreeRecord>, unique values, numeric bounds
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSpec → matched + highlighted indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
