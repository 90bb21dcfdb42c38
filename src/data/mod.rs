/// Data layer: core types, workbook loading, and the table pipeline.
///
/// Architecture:
/// ```text
///       .xlsx
///         │
///         ▼
///    ┌──────────┐
///    │  loader   │  parse workbook → Workbook (all sheets)
///    └──────────┘
///         │  sheet selection
///         ▼
///    ┌──────────┐
///    │  table    │  normalize → validate → NormalizedTable
///    └──────────┘
///         │
///         ▼
///    ┌──────────┐
///    │  filter   │  apply FilterSelection → filtered row indices
///    └──────────┘
///         │
///         ▼
///    summary / subscriber groups / value counts / export table
///         │
///         ▼
///    ┌──────────┐
///    │  export   │  encode export table → CSV bytes
///    └──────────┘
/// ```
///
/// Every stage is a pure function over the in-memory table; nothing in this
/// layer holds state between calls.
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod table;
