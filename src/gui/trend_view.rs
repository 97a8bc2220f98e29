//! Dashboard View Widget
//! Central panel with headline cards, the trend chart, weekly changes and
//! an optional raw-data table.

use crate::charts::{metric_color, TrendPlotter};
use crate::data::{Headline, Metric, SummaryStats, TableRow, TrendSeries, WeeklyChange};
use egui::{Color32, RichText, ScrollArea};

const CHART_HEIGHT: f32 = 420.0;
const TABLE_ROW_HEIGHT: f32 = 18.0;
const CARD_WIDTH: f32 = 180.0;

const AMBER: Color32 = Color32::from_rgb(255, 193, 7);
const CRIMSON: Color32 = Color32::from_rgb(229, 57, 53);
const EMERALD: Color32 = Color32::from_rgb(67, 160, 71);
const INDIGO: Color32 = Color32::from_rgb(63, 81, 181);

/// Everything derived from one selection, ready to draw.
pub struct DashboardData {
    pub country: String,
    pub series: Vec<TrendSeries>,
    pub summaries: Vec<(Metric, SummaryStats)>,
    pub headline: Headline,
    pub weekly: Vec<WeeklyChange>,
    pub table: Vec<TableRow>,
}

/// Central dashboard area.
pub struct TrendView {
    pub data: Option<DashboardData>,
    pub error: Option<String>,
    pub show_raw_table: bool,
}

impl Default for TrendView {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            show_raw_table: false,
        }
    }
}

impl TrendView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_data(&mut self, data: DashboardData) {
        self.data = Some(data);
        self.error = None;
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Draw the dashboard.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = &self.error {
            let error = error.clone();
            ui.add_space(20.0);
            egui::Frame::none()
                .rounding(8.0)
                .stroke(egui::Stroke::new(2.0, CRIMSON))
                .inner_margin(16.0)
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(format!("⚠ {error}"))
                            .size(15.0)
                            .color(CRIMSON),
                    );
                    ui.label(
                        RichText::new("Change the selection or press Refresh to retry.")
                            .size(12.0)
                            .color(Color32::GRAY),
                    );
                });
            return;
        }

        let Some(data) = &self.data else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            // Title
            ui.add_space(6.0);
            ui.label(
                RichText::new(format!("COVID-19 Trends: {}", data.country))
                    .size(20.0)
                    .strong(),
            );
            if let Some(as_of) = data.headline.as_of {
                ui.label(
                    RichText::new(format!("Last observation: {}", as_of.format("%B %d, %Y")))
                        .size(12.0)
                        .color(Color32::GRAY),
                );
            }
            ui.add_space(10.0);

            Self::draw_headline_cards(ui, &data.headline);
            ui.add_space(14.0);

            // Trend chart
            ui.label(RichText::new("📈 Trend Analysis").size(15.0).strong());
            ui.add_space(6.0);
            if data.series.is_empty() {
                ui.label(
                    RichText::new("Select at least one metric to plot.")
                        .size(13.0)
                        .color(Color32::GRAY),
                );
            } else {
                TrendPlotter::draw_trend_chart(ui, &data.series, CHART_HEIGHT);
            }
            ui.add_space(6.0);
            Self::draw_summaries(ui, &data.summaries);

            ui.add_space(14.0);
            ui.label(RichText::new("📊 Weekly Changes").size(15.0).strong());
            ui.add_space(6.0);
            Self::draw_weekly_changes(ui, &data.weekly);

            ui.add_space(14.0);
            ui.checkbox(&mut self.show_raw_table, "Show raw data");
            if self.show_raw_table {
                ui.add_space(6.0);
                Self::draw_raw_table(ui, &data.table);
            }
        });
    }

    fn draw_headline_cards(ui: &mut egui::Ui, headline: &Headline) {
        ui.horizontal(|ui| {
            Self::draw_card(
                ui,
                "Total Cases",
                headline.total_cases.map(format_count),
                INDIGO,
            );
            Self::draw_card(
                ui,
                "Total Deaths",
                headline.total_deaths.map(format_count),
                CRIMSON,
            );
            Self::draw_card(
                ui,
                "Vaccination Rate",
                headline.vaccination_rate.map(|v| format!("{v:.1}%")),
                EMERALD,
            );
            Self::draw_card(
                ui,
                "Case Fatality Rate",
                headline.case_fatality_rate.map(|v| format!("{v:.2}%")),
                AMBER,
            );
        });
    }

    fn draw_card(ui: &mut egui::Ui, title: &str, value: Option<String>, accent: Color32) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(8.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(CARD_WIDTH);
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).size(13.0).color(accent).strong());
                    ui.label(
                        RichText::new(value.unwrap_or_else(|| "–".to_string()))
                            .size(20.0)
                            .strong(),
                    );
                });
            });
        ui.add_space(10.0);
    }

    fn draw_summaries(ui: &mut egui::Ui, summaries: &[(Metric, SummaryStats)]) {
        ui.horizontal_wrapped(|ui| {
            for (metric, summary) in summaries {
                let text = match summary.latest {
                    Some((date, value)) => format!(
                        "Latest {}: {} on {}",
                        metric.label().to_lowercase(),
                        format_count(value),
                        date.format("%b %d, %Y")
                    ),
                    None => format!("{}: no data", metric.label()),
                };
                ui.label(
                    RichText::new(text)
                        .size(12.0)
                        .color(metric_color(*metric)),
                );
                ui.add_space(16.0);
            }
        });
    }

    fn draw_weekly_changes(ui: &mut egui::Ui, weekly: &[WeeklyChange]) {
        if weekly.is_empty() {
            ui.label(
                RichText::new("No data in the selected range.")
                    .size(12.0)
                    .color(Color32::GRAY),
            );
            return;
        }

        ui.horizontal(|ui| {
            for change in weekly {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(8.0)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.set_width(CARD_WIDTH);
                        ui.vertical(|ui| {
                            ui.label(
                                RichText::new(format!("Weekly {}", change.metric.label().to_lowercase()))
                                    .size(12.0)
                                    .color(metric_color(change.metric)),
                            );
                            ui.label(
                                RichText::new(format_count(change.latest_total))
                                    .size(17.0)
                                    .strong(),
                            );
                            let delta = match change.pct_change {
                                Some(pct) => format!("{pct:+.1}% vs prior week"),
                                None => "no prior week".to_string(),
                            };
                            ui.label(RichText::new(delta).size(11.0).color(Color32::GRAY));
                        });
                    });
                ui.add_space(10.0);
            }
        });
    }

    fn draw_raw_table(ui: &mut egui::Ui, rows: &[TableRow]) {
        let col_width = 110.0;
        let cell = |ui: &mut egui::Ui, text: String| {
            ui.add_sized(
                [col_width, TABLE_ROW_HEIGHT],
                egui::Label::new(RichText::new(text).size(11.0)),
            );
        };

        ui.horizontal(|ui| {
            for header in ["Date", "New cases", "New deaths", "New vaccinations"] {
                ui.add_sized(
                    [col_width, TABLE_ROW_HEIGHT],
                    egui::Label::new(RichText::new(header).size(11.0).strong()),
                );
            }
        });
        ui.separator();

        // Most recent first.
        ScrollArea::vertical()
            .max_height(280.0)
            .show_rows(ui, TABLE_ROW_HEIGHT, rows.len(), |ui, range| {
                for i in range {
                    let row = rows[rows.len() - 1 - i];
                    ui.horizontal(|ui| {
                        cell(ui, row.date.format("%Y-%m-%d").to_string());
                        cell(ui, format_value(row.new_cases));
                        cell(ui, format_value(row.new_deaths));
                        cell(ui, format_value(row.new_vaccinations));
                    });
                }
            });
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(format_count).unwrap_or_else(|| "–".to_string())
}

/// Thousands-separated integer rendering of a count.
fn format_count(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let mut digits = format!("{}", rounded.abs() as u64);

    let mut out = String::new();
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        out = if out.is_empty() {
            tail
        } else {
            format!("{tail},{out}")
        };
    }
    out = if out.is_empty() {
        digits
    } else {
        format!("{digits},{out}")
    };

    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_formatting() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(1234567.4), "1,234,567");
        assert_eq!(format_count(-45678.0), "-45,678");
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(format_value(None), "–");
        assert_eq!(format_value(Some(12.0)), "12");
    }
}
