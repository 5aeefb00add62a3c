//! Data layer: core types, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ loader/store │  parse file → Dataset (memoized by path)
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  apply FilterSpec → filtered Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────────┐
//!   │ aggregate/compare │  per-location stats, top/bottom selection
//!   └───────────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export  │  filtered Dataset → CSV bytes
//!   └──────────┘
//! ```

pub mod aggregate;
pub mod compare;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
pub mod store;
