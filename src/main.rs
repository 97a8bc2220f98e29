//! CovidScope - COVID-19 Time-Series Analytics & Interactive Trend Dashboard
//!
//! A Rust application that fetches the OWID COVID-19 dataset and renders
//! rolling-average trend charts for a selected country.

mod charts;
mod data;
mod gui;
mod stats;

use eframe::egui;
use gui::CovidScopeApp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("CovidScope"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "CovidScope",
        options,
        Box::new(|cc| Ok(Box::new(CovidScopeApp::new(cc)))),
    )
}
