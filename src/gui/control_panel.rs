//! Control Panel Widget
//! Left side panel with the country/metric/window selection controls and
//! data-source actions.

use crate::data::Metric;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use egui::{Color32, ComboBox, RichText};
use serde::{Deserialize, Serialize};

const FALLBACK_COUNTRY: &str = "United States";

/// User selection state. Country, metrics and window persist across runs;
/// the date range is dataset-dependent and reset on every load.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub country: String,
    pub metrics: Vec<Metric>,
    /// Rolling-average size in days.
    pub window: u32,
    #[serde(skip)]
    pub date_start: Option<NaiveDate>,
    #[serde(skip)]
    pub date_end: Option<NaiveDate>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            country: FALLBACK_COUNTRY.to_string(),
            metrics: vec![Metric::NewCases, Metric::NewDeaths],
            window: 7,
            date_start: None,
            date_end: None,
        }
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub countries: Vec<String>,
    pub country_filter: String,
    pub date_span: Option<(NaiveDate, NaiveDate)>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub data_stale: bool,
    pub progress: f32,
    pub status: String,
    pub controls_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            countries: Vec::new(),
            country_filter: String::new(),
            date_span: None,
            last_loaded_at: None,
            data_stale: true,
            progress: 0.0,
            status: "Ready".to_string(),
            controls_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update available countries and the date span after a dataset load.
    pub fn update_dataset(&mut self, countries: Vec<String>, span: (NaiveDate, NaiveDate)) {
        self.countries = countries;
        self.date_span = Some(span);
        self.controls_enabled = !self.countries.is_empty();

        if !self.countries.iter().any(|c| c == &self.settings.country) {
            self.settings.country = if self.countries.iter().any(|c| c == FALLBACK_COUNTRY) {
                FALLBACK_COUNTRY.to_string()
            } else {
                self.countries.first().cloned().unwrap_or_default()
            };
        }

        // Clamp any previous range into the new span, defaulting to all of it.
        let clamp = |d: Option<NaiveDate>, default: NaiveDate| {
            Some(d.unwrap_or(default).clamp(span.0, span.1))
        };
        self.settings.date_start = clamp(self.settings.date_start, span.0);
        self.settings.date_end = clamp(self.settings.date_end, span.1);
    }

    /// Draw the control panel.
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🦠 CovidScope")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("COVID-19 Trend Dashboard")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let (text, color) = match self.last_loaded_at {
                        Some(at) => {
                            let stamp = at.format("%Y-%m-%d %H:%M UTC").to_string();
                            if self.data_stale {
                                (format!("{stamp} (stale)"), Color32::from_rgb(255, 193, 7))
                            } else {
                                (stamp, Color32::WHITE)
                            }
                        }
                        None => ("Not loaded".to_string(), Color32::GRAY),
                    };
                    ui.label(RichText::new(text).size(12.0).color(color));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("⟳ Refresh").clicked() {
                            action = ControlPanelAction::Refresh;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Selection Section =====
        ui.label(RichText::new("🔧 Selection").size(14.0).strong());
        ui.add_space(8.0);

        let label_width = 80.0;
        let combo_width = 170.0;

        ui.add_enabled_ui(self.controls_enabled, |ui| {
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("Search:"));
                ui.add_sized(
                    [combo_width, 20.0],
                    egui::TextEdit::singleline(&mut self.country_filter),
                );
            });

            ui.add_space(5.0);

            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("Country:"));
                let filter = self.country_filter.to_lowercase();
                ComboBox::from_id_salt("country")
                    .width(combo_width)
                    .selected_text(&self.settings.country)
                    .show_ui(ui, |ui| {
                        for country in self
                            .countries
                            .iter()
                            .filter(|c| filter.is_empty() || c.to_lowercase().contains(&filter))
                        {
                            if ui
                                .selectable_label(self.settings.country == *country, country)
                                .clicked()
                            {
                                self.settings.country = country.clone();
                                action = ControlPanelAction::SelectionChanged;
                            }
                        }
                    });
            });

            ui.add_space(10.0);

            ui.label("Metrics:");
            for metric in Metric::ALL {
                let mut checked = self.settings.metrics.contains(&metric);
                if ui.checkbox(&mut checked, metric.label()).changed() {
                    if checked {
                        self.settings.metrics.push(metric);
                    } else {
                        self.settings.metrics.retain(|m| *m != metric);
                    }
                    // Keep legend order stable regardless of click order.
                    self.settings
                        .metrics
                        .sort_by_key(|m| Metric::ALL.iter().position(|a| a == m));
                    action = ControlPanelAction::SelectionChanged;
                }
            }

            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("Rolling avg:"));
                if ui
                    .add(egui::Slider::new(&mut self.settings.window, 1..=14).text("days"))
                    .changed()
                {
                    action = ControlPanelAction::SelectionChanged;
                }
            });

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            // ===== Date Range Section =====
            ui.label(RichText::new("📅 Date Range").size(14.0).strong());
            ui.add_space(5.0);

            if let Some((min_date, max_date)) = self.date_span {
                let total_days = (max_date - min_date).num_days();
                let mut start_off = self
                    .settings
                    .date_start
                    .map_or(0, |d| (d - min_date).num_days())
                    .clamp(0, total_days);
                let mut end_off = self
                    .settings
                    .date_end
                    .map_or(total_days, |d| (d - min_date).num_days())
                    .clamp(0, total_days);

                let as_date = move |v: f64| {
                    (min_date + Duration::days(v as i64))
                        .format("%Y-%m-%d")
                        .to_string()
                };

                let start_changed = ui
                    .add(
                        egui::Slider::new(&mut start_off, 0..=total_days)
                            .text("from")
                            .custom_formatter(move |v, _| as_date(v)),
                    )
                    .changed();
                let end_changed = ui
                    .add(
                        egui::Slider::new(&mut end_off, 0..=total_days)
                            .text("to")
                            .custom_formatter(move |v, _| as_date(v)),
                    )
                    .changed();

                if start_changed || end_changed {
                    if end_off < start_off {
                        if start_changed {
                            end_off = start_off;
                        } else {
                            start_off = end_off;
                        }
                    }
                    self.settings.date_start = Some(min_date + Duration::days(start_off));
                    self.settings.date_end = Some(min_date + Duration::days(end_off));
                    action = ControlPanelAction::SelectionChanged;
                }
            } else {
                ui.label(RichText::new("No data loaded").size(11.0).color(Color32::GRAY));
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export Section =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.controls_enabled, |ui| {
                let csv_button = egui::Button::new(RichText::new("⬇ Export CSV").size(14.0))
                    .min_size(egui::vec2(180.0, 30.0));
                if ui.add(csv_button).clicked() {
                    action = ControlPanelAction::ExportCsv;
                }

                ui.add_space(8.0);

                let png_button = egui::Button::new(RichText::new("🖼 Export Chart PNG").size(14.0))
                    .min_size(egui::vec2(180.0, 30.0));
                if ui.add(png_button).clicked() {
                    action = ControlPanelAction::ExportPng;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Loaded") || self.status.contains("Exported") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    Refresh,
    SelectionChanged,
    ExportCsv,
    ExportPng,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    #[test]
    fn defaults_match_the_dashboard() {
        let settings = UserSettings::default();
        assert_eq!(settings.country, "United States");
        assert_eq!(settings.metrics, vec![Metric::NewCases, Metric::NewDeaths]);
        assert_eq!(settings.window, 7);
    }

    #[test]
    fn update_dataset_falls_back_on_missing_country() {
        let mut panel = ControlPanel::new();
        panel.settings.country = "Atlantis".to_string();
        panel.update_dataset(
            vec!["Borduria".to_string(), "Testland".to_string()],
            (date(1), date(31)),
        );

        assert_eq!(panel.settings.country, "Borduria");
        assert!(panel.controls_enabled);
        assert_eq!(panel.settings.date_start, Some(date(1)));
        assert_eq!(panel.settings.date_end, Some(date(31)));
    }

    #[test]
    fn update_dataset_clamps_stale_range() {
        let mut panel = ControlPanel::new();
        panel.settings.date_start = Some(date(1));
        panel.settings.date_end = Some(date(31));
        panel.update_dataset(vec!["Testland".to_string()], (date(10), date(20)));

        assert_eq!(panel.settings.date_start, Some(date(10)));
        assert_eq!(panel.settings.date_end, Some(date(20)));
    }
}
