//! Charts module - Chart rendering

mod plotter;
mod renderer;

pub use plotter::{metric_color, TrendPlotter};
pub use renderer::StaticChartRenderer;
