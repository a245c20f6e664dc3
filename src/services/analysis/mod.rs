pub mod charts;
pub mod classify;
pub mod frequency;
pub mod series;
pub mod stats;
pub mod types;

pub use charts::plan;
pub use classify::{classify, numeric_value, ColumnKind};
pub use series::build as build_series;
pub use stats::profile_dataset;
