//! GUI module - User interface components

mod app;
mod control_panel;
mod trend_view;

pub use app::CovidScopeApp;
pub use control_panel::{ControlPanel, ControlPanelAction, UserSettings};
pub use trend_view::TrendView;
