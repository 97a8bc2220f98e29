//! Statistics module - rolling means and summary figures

mod calculator;

pub use calculator::{latest_non_null, latest_weekly_change, rolling_mean, weekly_totals};
