/// Data layer: record types, loading, selection and view building.
///
/// Architecture:
/// ```text
///  historical + predictions (.csv / .json / .parquet)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate → Dataset (memoized by path/mtime)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  university → faculty → course picks, row selection
///   └──────────┘
///        │
///        ├──────────────────┐
///        ▼                  ▼
///   ┌───────────┐    ┌────────────┐
///   │ evolution  │    │ comparison  │  ◄── SelectionSet
///   └───────────┘    └────────────┘
/// ```

pub mod comparison;
pub mod evolution;
pub mod filter;
pub mod loader;
pub mod model;
