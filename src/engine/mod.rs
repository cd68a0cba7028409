//! Pure computation over fetched snapshots.

pub mod aggregator;

pub use aggregator::{aggregate, ExposureRules, ExposureSummary, LongShortRatio, SymbolExposure};
