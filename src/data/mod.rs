//! Data module - remote fetch, dataset cache and trend transforms

mod loader;
mod source;
mod transform;

pub use loader::{Dataset, DatasetCache, LoaderError};
pub use source::{fetch_csv, SourceConfig, SourceError};
pub use transform::{
    compute, export_rows, headline, table_rows, weekly_changes, Headline, Metric, SummaryStats,
    TableRow, TransformError, TrendPoint, TrendSeries, WeeklyChange,
};
