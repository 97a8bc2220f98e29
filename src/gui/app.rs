//! CovidScope Main Application
//! Main window wiring the control panel, the background data fetch and the
//! dashboard view.

use crate::charts::StaticChartRenderer;
use crate::data::{
    self, Dataset, DatasetCache, SourceConfig, SummaryStats, TransformError, TrendSeries,
};
use crate::gui::trend_view::DashboardData;
use crate::gui::{ControlPanel, ControlPanelAction, TrendView, UserSettings};
use chrono::NaiveDate;
use egui::SidePanel;
use polars::prelude::{CsvWriter, SerWriter};
use rayon::prelude::*;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

/// Fetch result from the background thread
enum FetchResult {
    Progress(String),
    Complete(Box<Dataset>),
    Error(String),
}

/// Main application window.
pub struct CovidScopeApp {
    config: SourceConfig,
    cache: DatasetCache,
    control_panel: ControlPanel,
    trend_view: TrendView,

    // Async dataset fetch
    fetch_rx: Option<Receiver<FetchResult>>,
    is_fetching: bool,
}

impl CovidScopeApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = SourceConfig::from_env();

        let mut control_panel = ControlPanel::new();
        if let Some(storage) = cc.storage {
            if let Some(settings) = eframe::get_value::<UserSettings>(storage, eframe::APP_KEY) {
                control_panel.settings = settings;
            }
        }

        let mut app = Self {
            cache: DatasetCache::new(config.cache_ttl),
            config,
            control_panel,
            trend_view: TrendView::new(),
            fetch_rx: None,
            is_fetching: false,
        };
        // Load on startup, like every visit to the hosted dashboard.
        app.start_fetch();
        app
    }

    /// Start fetching the dataset on a background thread.
    fn start_fetch(&mut self) {
        if self.is_fetching {
            return;
        }
        self.is_fetching = true;
        self.control_panel.set_progress(5.0, "Loading data...");

        let (tx, rx) = channel();
        self.fetch_rx = Some(rx);
        let config = self.config.clone();

        thread::spawn(move || {
            let _ = tx.send(FetchResult::Progress("Downloading dataset...".to_string()));
            let bytes = match data::fetch_csv(&config) {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(FetchResult::Error(e.to_string()));
                    return;
                }
            };

            let _ = tx.send(FetchResult::Progress("Parsing dataset...".to_string()));
            match Dataset::from_csv_bytes(&bytes) {
                Ok(dataset) => {
                    let _ = tx.send(FetchResult::Complete(Box::new(dataset)));
                }
                Err(e) => {
                    let _ = tx.send(FetchResult::Error(e.to_string()));
                }
            }
        });
    }

    /// Check for fetch results from the background thread.
    fn check_fetch_results(&mut self) {
        let rx = self.fetch_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    FetchResult::Progress(status) => {
                        self.control_panel.set_progress(40.0, &status);
                    }
                    FetchResult::Complete(dataset) => {
                        let dataset = *dataset;
                        let countries = dataset.countries().to_vec();
                        let span = dataset.date_span();
                        let rows = dataset.row_count();
                        tracing::info!(rows, countries = countries.len(), "Dataset loaded");

                        self.cache.store(dataset);
                        self.control_panel.update_dataset(countries.clone(), span);
                        self.control_panel.set_progress(
                            100.0,
                            &format!("Loaded {} rows, {} countries", rows, countries.len()),
                        );
                        self.is_fetching = false;
                        should_keep_receiver = false;
                        self.trend_view.clear_error();
                        self.recompute();
                    }
                    FetchResult::Error(error) => {
                        tracing::error!(error = %error, "Dataset load failed");
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {}", error));
                        self.trend_view.set_error(error);
                        self.is_fetching = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.fetch_rx = Some(rx);
            }
        }
    }

    /// The selected date range, clamped to the dataset's span.
    fn selected_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let (min_date, max_date) = self.control_panel.date_span?;
        let settings = &self.control_panel.settings;
        let start = settings
            .date_start
            .unwrap_or(min_date)
            .clamp(min_date, max_date);
        let end = settings
            .date_end
            .unwrap_or(max_date)
            .clamp(min_date, max_date);
        Some(if start <= end { (start, end) } else { (end, start) })
    }

    /// Recompute all derived views for the current selection. Synchronous:
    /// the computation is small and completes within the frame.
    fn recompute(&mut self) {
        let Some(span) = self.selected_span() else {
            return;
        };
        let Some(dataset) = self.cache.get() else {
            return;
        };
        let settings = self.control_panel.settings.clone();
        let window = settings.window.max(1) as usize;

        let computed: Result<Vec<(TrendSeries, SummaryStats)>, TransformError> = settings
            .metrics
            .par_iter()
            .map(|&metric| data::compute(dataset, &settings.country, metric, window, span))
            .collect();

        let result = computed.and_then(|pairs| {
            let headline = data::headline(dataset, &settings.country, span)?;
            let weekly = data::weekly_changes(dataset, &settings.country, span)?;
            let table = data::table_rows(dataset, &settings.country, span)?;
            Ok(DashboardData {
                country: settings.country.clone(),
                summaries: pairs.iter().map(|(s, summary)| (s.metric, *summary)).collect(),
                series: pairs.into_iter().map(|(series, _)| series).collect(),
                headline,
                weekly,
                table,
            })
        });

        match result {
            Ok(dashboard) => self.trend_view.set_data(dashboard),
            Err(e) => {
                tracing::error!(error = %e, "Trend computation failed");
                self.trend_view.set_error(e.to_string());
            }
        }
    }

    /// Export the filtered country rows as CSV.
    fn handle_export_csv(&mut self) {
        let Some(span) = self.selected_span() else {
            return;
        };
        let country = self.control_panel.settings.country.clone();

        let exported = match self.cache.get() {
            Some(dataset) => data::export_rows(dataset, &country, span),
            None => {
                self.control_panel.set_progress(0.0, "No data loaded");
                return;
            }
        };
        let mut df = match exported {
            Ok(df) => df,
            Err(e) => {
                self.control_panel.set_progress(0.0, &format!("Error: {}", e));
                return;
            }
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(format!("covid_data_{}.csv", country.replace(' ', "_")))
            .save_file()
        else {
            return; // User cancelled
        };

        let written = std::fs::File::create(&path)
            .map_err(anyhow::Error::from)
            .and_then(|mut file| {
                CsvWriter::new(&mut file)
                    .finish(&mut df)
                    .map_err(anyhow::Error::from)
            });

        match written {
            Ok(()) => {
                tracing::info!(path = %path.display(), "CSV exported");
                self.control_panel
                    .set_progress(100.0, &format!("Exported {}", path.display()));
                let _ = open::that(&path);
            }
            Err(e) => {
                tracing::error!(error = %e, "CSV export failed");
                self.control_panel.set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    /// Export the current trend chart as a PNG image.
    fn handle_export_png(&mut self) {
        let (series, country) = match &self.trend_view.data {
            Some(data) if !data.series.is_empty() => {
                (data.series.clone(), data.country.clone())
            }
            _ => {
                self.control_panel.set_progress(0.0, "No chart to export");
                return;
            }
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(format!("covid_trends_{}.png", country.replace(' ', "_")))
            .save_file()
        else {
            return; // User cancelled
        };

        match StaticChartRenderer::render_trend_png(&series, &country, &path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Chart exported");
                self.control_panel
                    .set_progress(100.0, &format!("Exported {}", path.display()));
                let _ = open::that(&path);
            }
            Err(e) => {
                tracing::error!(error = %e, "Chart export failed");
                self.control_panel.set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for CovidScopeApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.control_panel.settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_fetch_results();

        // Request repaint while a fetch is in flight
        if self.is_fetching {
            ctx.request_repaint();
        }

        // The cache is handed to the panel for display only; writes go
        // through Refresh below.
        self.control_panel.last_loaded_at = self.cache.last_loaded_at();
        self.control_panel.data_stale = self.cache.is_stale();

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::Refresh => {
                            self.cache.invalidate();
                            self.start_fetch();
                        }
                        ControlPanelAction::SelectionChanged => self.recompute(),
                        ControlPanelAction::ExportCsv => self.handle_export_csv(),
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard View
        egui::CentralPanel::default().show(ctx, |ui| {
            self.trend_view.show(ui);
        });
    }
}
