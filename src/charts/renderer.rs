//! Static Chart Renderer
//! Renders the current trend selection to a PNG file using plotters.

use crate::data::{Metric, TrendSeries};
use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::path::Path;

use super::plotter::gap_segments;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn metric_rgb(metric: Metric) -> RGBColor {
    match metric {
        Metric::NewCases => RGBColor(63, 81, 181),
        Metric::NewDeaths => RGBColor(229, 57, 53),
        Metric::NewVaccinations => RGBColor(67, 160, 71),
    }
}

/// Writes trend charts as standalone PNG images.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    pub fn render_trend_png(
        series_list: &[TrendSeries],
        country: &str,
        path: &Path,
    ) -> Result<()> {
        let (start, end) = date_bounds(series_list)
            .ok_or_else(|| anyhow!("No data points to render"))?;
        // Widen a single-day span so the axis range stays non-empty.
        let end = if start == end {
            end + Duration::days(1)
        } else {
            end
        };
        let max_value = value_bound(series_list);

        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| anyhow!("Chart rendering failed: {e}"))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("COVID-19 Trends in {country}"),
                ("sans-serif", 28),
            )
            .margin(18)
            .x_label_area_size(48)
            .y_label_area_size(80)
            .build_cartesian_2d(start..end, 0f64..max_value)
            .map_err(|e| anyhow!("Chart rendering failed: {e}"))?;

        chart
            .configure_mesh()
            .x_labels(10)
            .x_label_formatter(&|date: &NaiveDate| date.format("%Y-%m-%d").to_string())
            .y_desc("Count")
            .draw()
            .map_err(|e| anyhow!("Chart rendering failed: {e}"))?;

        for series in series_list {
            let color = metric_rgb(series.metric);
            let name = format!("{} ({}-day avg)", series.metric.label(), series.window);

            for (i, segment) in gap_segments(series).into_iter().enumerate() {
                let drawn = chart
                    .draw_series(LineSeries::new(segment, color.stroke_width(2)))
                    .map_err(|e| anyhow!("Chart rendering failed: {e}"))?;
                if i == 0 {
                    drawn.label(&name).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
                }
            }
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(|e| anyhow!("Chart rendering failed: {e}"))?;

        root.present()
            .map_err(|e| anyhow!("Failed to write chart image: {e}"))?;
        Ok(())
    }
}

fn date_bounds(series_list: &[TrendSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for point in series_list.iter().flat_map(|s| &s.points) {
        if point.value.is_none() {
            continue;
        }
        bounds = Some(match bounds {
            None => (point.date, point.date),
            Some((lo, hi)) => (lo.min(point.date), hi.max(point.date)),
        });
    }
    bounds
}

fn value_bound(series_list: &[TrendSeries]) -> f64 {
    let max = series_list
        .iter()
        .flat_map(|s| &s.points)
        .filter_map(|p| p.value)
        .fold(0.0f64, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrendPoint;

    fn series(values: &[Option<f64>]) -> TrendSeries {
        TrendSeries {
            country: "Testland".to_string(),
            metric: Metric::NewDeaths,
            window: 7,
            points: values
                .iter()
                .enumerate()
                .map(|(i, &value)| TrendPoint {
                    date: NaiveDate::from_ymd_opt(2021, 2, i as u32 + 1).unwrap(),
                    value,
                })
                .collect(),
        }
    }

    #[test]
    fn bounds_ignore_null_points() {
        let s = series(&[None, Some(5.0), Some(9.0), None]);
        let (lo, hi) = date_bounds(&[s.clone()]).unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2021, 2, 2).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2021, 2, 3).unwrap());
        assert!((value_bound(&[s]) - 9.9).abs() < 1e-9);
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let s = series(&[None, None]);
        assert!(date_bounds(&[s.clone()]).is_none());
        assert_eq!(value_bound(&[s]), 1.0);
    }
}
