//! Trend Plotter Module
//! Interactive trend visualization using egui_plot.

use crate::data::{Metric, TrendSeries};
use chrono::{Duration, NaiveDate};
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};

/// Per-metric line colors, shared with the PNG export.
pub fn metric_color(metric: Metric) -> Color32 {
    match metric {
        Metric::NewCases => Color32::from_rgb(63, 81, 181), // Indigo
        Metric::NewDeaths => Color32::from_rgb(229, 57, 53), // Crimson
        Metric::NewVaccinations => Color32::from_rgb(67, 160, 71), // Emerald
    }
}

/// Days since the Unix epoch, the plot's x unit.
fn day_number(date: NaiveDate) -> f64 {
    (date - NaiveDate::default()).num_days() as f64
}

fn day_date(day: f64) -> NaiveDate {
    NaiveDate::default() + Duration::days(day.round() as i64)
}

/// Split a series into runs of consecutive non-null points so that null
/// stretches break the line instead of being interpolated across.
pub fn gap_segments(series: &TrendSeries) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut segments = Vec::new();
    let mut current: Vec<(NaiveDate, f64)> = Vec::new();

    for point in &series.points {
        match point.value {
            Some(value) => current.push((point.date, value)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Creates the interactive trend chart.
pub struct TrendPlotter;

impl TrendPlotter {
    /// Draw one line per selected metric, rolling-averaged, with date
    /// labels on the x-axis.
    pub fn draw_trend_chart(ui: &mut egui::Ui, series_list: &[TrendSeries], height: f32) {
        Plot::new("trend_chart")
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_formatter(|mark, _range| day_date(mark.value).format("%b %d, %y").to_string())
            .label_formatter(|name, value| {
                let date = day_date(value.x).format("%B %d, %Y");
                if name.is_empty() {
                    format!("{}\n{:.0}", date, value.y)
                } else {
                    format!("{}\n{}\n{:.0}", name, date, value.y)
                }
            })
            .show(ui, |plot_ui| {
                for series in series_list {
                    let color = metric_color(series.metric);
                    let name =
                        format!("{} ({}-day avg)", series.metric.label(), series.window);

                    for (i, segment) in gap_segments(series).into_iter().enumerate() {
                        let points: PlotPoints = segment
                            .iter()
                            .map(|&(date, value)| [day_number(date), value])
                            .collect();

                        let mut line = Line::new(points).color(color).width(1.8);
                        // Name only the first segment so the legend shows
                        // one entry per metric.
                        if i == 0 {
                            line = line.name(&name);
                        }
                        plot_ui.line(line);
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrendPoint;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn series(values: &[Option<f64>]) -> TrendSeries {
        TrendSeries {
            country: "Testland".to_string(),
            metric: Metric::NewCases,
            window: 7,
            points: values
                .iter()
                .enumerate()
                .map(|(i, &value)| TrendPoint {
                    date: date(i as u32 + 1),
                    value,
                })
                .collect(),
        }
    }

    #[test]
    fn gaps_split_the_line() {
        let series = series(&[Some(1.0), Some(2.0), None, Some(4.0), None, None, Some(7.0)]);
        let segments = gap_segments(&series);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1], vec![(date(4), 4.0)]);
        assert_eq!(segments[2], vec![(date(7), 7.0)]);
    }

    #[test]
    fn all_null_series_has_no_segments() {
        let series = series(&[None, None]);
        assert!(gap_segments(&series).is_empty());
    }

    #[test]
    fn day_numbers_round_trip() {
        let d = date(15);
        assert_eq!(day_date(day_number(d)), d);
    }
}
