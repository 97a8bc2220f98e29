//! Trend Transformer Module
//! Pure derivations from the loaded dataset: rolling trend series, summary
//! figures, headline cards and weekly changes for one country selection.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::loader::{Dataset, COUNTRY_COL, DATE_COL};
use crate::stats;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Unknown country '{0}'")]
    UnknownCountry(String),
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),
    #[error("Rolling window must be at least 1 day")]
    InvalidWindow,
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// The tracked measures, each mapped explicitly to a dataset column.
/// Selections outside this set are rejected at the label boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    NewCases,
    NewDeaths,
    NewVaccinations,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::NewCases, Metric::NewDeaths, Metric::NewVaccinations];

    pub fn column(self) -> &'static str {
        match self {
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::NewVaccinations => "new_vaccinations",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::NewCases => "New cases",
            Metric::NewDeaths => "New deaths",
            Metric::NewVaccinations => "New vaccinations",
        }
    }

    pub fn from_label(label: &str) -> Result<Metric, TransformError> {
        Metric::ALL
            .into_iter()
            .find(|m| m.label() == label)
            .ok_or_else(|| TransformError::UnknownMetric(label.to_string()))
    }
}

// Metrics persist (e.g. in saved UI settings) as their labels; anything
// outside the closed set fails to deserialize instead of slipping through.
impl Serialize for Metric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Metric::from_label(&label).map_err(serde::de::Error::custom)
    }
}

/// One point of a derived trend: the observation date and the rolling
/// value, null when every value in the trailing window was null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Rolling-average series for one (country, metric, window) selection.
/// Ephemeral: recomputed on every selection change, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub country: String,
    pub metric: Metric,
    pub window: usize,
    pub points: Vec<TrendPoint>,
}

/// Latest non-null raw value of the selected metric, with its date.
/// Explicitly empty when the metric has no observations at all.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryStats {
    pub latest: Option<(NaiveDate, f64)>,
}

/// Country headline figures from the most recent row in the selected span.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headline {
    pub as_of: Option<NaiveDate>,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    /// people_vaccinated / population, percent.
    pub vaccination_rate: Option<f64>,
    /// total_deaths / total_cases, percent.
    pub case_fatality_rate: Option<f64>,
}

/// Most recent calendar-week total for one metric and its change versus
/// the prior week.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyChange {
    pub metric: Metric,
    pub latest_total: f64,
    pub pct_change: Option<f64>,
}

/// One row of the raw-data table shown under the chart.
#[derive(Debug, Clone, Copy)]
pub struct TableRow {
    pub date: NaiveDate,
    pub new_cases: Option<f64>,
    pub new_deaths: Option<f64>,
    pub new_vaccinations: Option<f64>,
}

/// Compute the rolling trend and summary for one selection.
///
/// Rows are filtered by country and date span and kept in date order; a
/// date absent from the source stays absent (the window is over
/// observations, not calendar days), while a present date with an empty
/// cell contributes a null point.
pub fn compute(
    dataset: &Dataset,
    country: &str,
    metric: Metric,
    window: usize,
    span: (NaiveDate, NaiveDate),
) -> Result<(TrendSeries, SummaryStats), TransformError> {
    if window == 0 {
        return Err(TransformError::InvalidWindow);
    }

    let df = country_rows(dataset, country, span)?;
    let dates = column_dates(&df)?;
    let raw = column_values(&df, metric.column())?;

    let rolled = stats::rolling_mean(&raw, window);
    let latest = stats::latest_non_null(&dates, &raw);

    let points = dates
        .iter()
        .zip(rolled)
        .map(|(&date, value)| TrendPoint { date, value })
        .collect();

    Ok((
        TrendSeries {
            country: country.to_string(),
            metric,
            window,
            points,
        },
        SummaryStats { latest },
    ))
}

/// Headline figures from the last row of the selected span, nullable
/// field by field.
pub fn headline(
    dataset: &Dataset,
    country: &str,
    span: (NaiveDate, NaiveDate),
) -> Result<Headline, TransformError> {
    let df = country_rows(dataset, country, span)?;
    let dates = column_dates(&df)?;

    let Some(&as_of) = dates.last() else {
        return Ok(Headline::default());
    };
    let last = dates.len() - 1;

    let total_cases = column_values(&df, "total_cases")?[last];
    let total_deaths = column_values(&df, "total_deaths")?[last];
    let people_vaccinated = column_values(&df, "people_vaccinated")?[last];
    let population = column_values(&df, "population")?[last];

    let vaccination_rate = match (people_vaccinated, population) {
        (Some(v), Some(p)) if p > 0.0 => Some(v / p * 100.0),
        _ => None,
    };
    let case_fatality_rate = match (total_deaths, total_cases) {
        (Some(d), Some(c)) if c > 0.0 => Some(d / c * 100.0),
        _ => None,
    };

    Ok(Headline {
        as_of: Some(as_of),
        total_cases,
        total_deaths,
        vaccination_rate,
        case_fatality_rate,
    })
}

/// Week-over-week change of every metric within the selected span.
pub fn weekly_changes(
    dataset: &Dataset,
    country: &str,
    span: (NaiveDate, NaiveDate),
) -> Result<Vec<WeeklyChange>, TransformError> {
    let df = country_rows(dataset, country, span)?;
    let dates = column_dates(&df)?;

    let mut changes = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let values = column_values(&df, metric.column())?;
        if let Some((latest_total, pct_change)) = stats::latest_weekly_change(&dates, &values) {
            changes.push(WeeklyChange {
                metric,
                latest_total,
                pct_change,
            });
        }
    }

    Ok(changes)
}

/// Raw metric rows for the data table, date ascending.
pub fn table_rows(
    dataset: &Dataset,
    country: &str,
    span: (NaiveDate, NaiveDate),
) -> Result<Vec<TableRow>, TransformError> {
    let df = country_rows(dataset, country, span)?;
    let dates = column_dates(&df)?;
    let cases = column_values(&df, "new_cases")?;
    let deaths = column_values(&df, "new_deaths")?;
    let vaccinations = column_values(&df, "new_vaccinations")?;

    Ok(dates
        .iter()
        .enumerate()
        .map(|(i, &date)| TableRow {
            date,
            new_cases: cases[i],
            new_deaths: deaths[i],
            new_vaccinations: vaccinations[i],
        })
        .collect())
}

/// The filtered country rows as a DataFrame, for CSV export.
pub fn export_rows(
    dataset: &Dataset,
    country: &str,
    span: (NaiveDate, NaiveDate),
) -> Result<DataFrame, TransformError> {
    country_rows(dataset, country, span)
}

/// Filter the dataset to one country and date span, sorted by date.
/// Rows without a parseable date are dropped.
fn country_rows(
    dataset: &Dataset,
    country: &str,
    span: (NaiveDate, NaiveDate),
) -> Result<DataFrame, TransformError> {
    if !dataset.contains_country(country) {
        return Err(TransformError::UnknownCountry(country.to_string()));
    }

    let df = dataset
        .dataframe()
        .clone()
        .lazy()
        .filter(col(COUNTRY_COL).eq(lit(country)))
        .sort([DATE_COL], SortMultipleOptions::default())
        .collect()?;

    let flags: Vec<bool> = df
        .column(DATE_COL)?
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .map(|d| d.map(|d| d >= span.0 && d <= span.1).unwrap_or(false))
        .collect();
    let mask = Series::new("span_mask".into(), flags);

    Ok(df.filter(mask.bool()?)?)
}

fn column_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, TransformError> {
    let series = df.column(DATE_COL)?.as_materialized_series();
    // Nulls were masked out in country_rows.
    Ok(series.date()?.as_date_iter().flatten().collect())
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, TransformError> {
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, day).unwrap()
    }

    /// Four consecutive days of Testland data with a null on day 2,
    /// plus an unrelated country to prove filtering.
    fn dataset() -> Dataset {
        let csv = "\
location,date,new_cases,new_deaths,new_vaccinations,total_cases,total_deaths,people_vaccinated,population
Testland,2021-06-01,10,1,100,10,1,100,1000
Testland,2021-06-02,,2,110,10,3,150,1000
Testland,2021-06-03,30,0,,40,3,200,1000
Testland,2021-06-04,40,1,130,80,4,250,1000
Borduria,2021-06-01,999,99,9,999,99,9,99
";
        Dataset::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    fn full_span() -> (NaiveDate, NaiveDate) {
        (date(1), date(30))
    }

    #[test]
    fn worked_example_two_day_window() {
        let dataset = dataset();
        let (series, summary) =
            compute(&dataset, "Testland", Metric::NewCases, 2, full_span()).unwrap();

        let values: Vec<Option<f64>> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(
            values,
            vec![Some(10.0), Some(10.0), Some(30.0), Some(35.0)]
        );
        assert_eq!(summary.latest, Some((date(4), 40.0)));
    }

    #[test]
    fn series_preserves_length_and_date_order() {
        let dataset = dataset();
        let (series, _) =
            compute(&dataset, "Testland", Metric::NewDeaths, 7, full_span()).unwrap();

        assert_eq!(series.points.len(), 4);
        let dates: Vec<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3), date(4)]);
    }

    #[test]
    fn compute_is_pure() {
        let dataset = dataset();
        let a = compute(&dataset, "Testland", Metric::NewVaccinations, 3, full_span()).unwrap();
        let b = compute(&dataset, "Testland", Metric::NewVaccinations, 3, full_span()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_country_is_rejected() {
        let dataset = dataset();
        let err = compute(&dataset, "Atlantis", Metric::NewCases, 7, full_span()).unwrap_err();
        assert!(matches!(err, TransformError::UnknownCountry(name) if name == "Atlantis"));
    }

    #[test]
    fn unknown_metric_label_is_rejected() {
        assert!(Metric::from_label("New cases").is_ok());
        let err = Metric::from_label("Case fatality rate").unwrap_err();
        assert!(matches!(err, TransformError::UnknownMetric(_)));
    }

    #[test]
    fn zero_window_is_rejected() {
        let dataset = dataset();
        let err = compute(&dataset, "Testland", Metric::NewCases, 0, full_span()).unwrap_err();
        assert!(matches!(err, TransformError::InvalidWindow));
    }

    #[test]
    fn date_span_clips_rows() {
        let dataset = dataset();
        let (series, summary) =
            compute(&dataset, "Testland", Metric::NewCases, 1, (date(2), date(3))).unwrap();

        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].value, None);
        assert_eq!(series.points[1].value, Some(30.0));
        assert_eq!(summary.latest, Some((date(3), 30.0)));
    }

    #[test]
    fn summary_is_empty_when_metric_has_no_values() {
        let csv = "\
location,date,new_cases,new_deaths,new_vaccinations,total_cases,total_deaths,people_vaccinated,population
Testland,2021-06-01,,1,,1,1,10,1000
Testland,2021-06-02,,1,,2,2,10,1000
";
        let dataset = Dataset::from_csv_bytes(csv.as_bytes()).unwrap();
        let (series, summary) =
            compute(&dataset, "Testland", Metric::NewCases, 7, full_span()).unwrap();

        assert_eq!(summary.latest, None);
        assert!(series.points.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn headline_rates_from_last_row() {
        let dataset = dataset();
        let headline = headline(&dataset, "Testland", full_span()).unwrap();

        assert_eq!(headline.as_of, Some(date(4)));
        assert_eq!(headline.total_cases, Some(80.0));
        assert_eq!(headline.total_deaths, Some(4.0));
        assert_eq!(headline.vaccination_rate, Some(25.0));
        assert_eq!(headline.case_fatality_rate, Some(5.0));
    }

    #[test]
    fn weekly_changes_cover_all_metrics() {
        let dataset = dataset();
        let changes = weekly_changes(&dataset, "Testland", full_span()).unwrap();

        assert_eq!(changes.len(), 3);
        let cases = changes.iter().find(|c| c.metric == Metric::NewCases).unwrap();
        // All four days fall in one calendar week; the null counts as zero.
        assert_eq!(cases.latest_total, 80.0);
        assert_eq!(cases.pct_change, None);
    }

    #[test]
    fn table_rows_match_raw_values() {
        let dataset = dataset();
        let rows = table_rows(&dataset, "Testland", full_span()).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].date, date(2));
        assert_eq!(rows[1].new_cases, None);
        assert_eq!(rows[1].new_deaths, Some(2.0));
        assert_eq!(rows[3].new_vaccinations, Some(130.0));
    }

    #[test]
    fn export_rows_filters_country() {
        let dataset = dataset();
        let df = export_rows(&dataset, "Testland", full_span()).unwrap();
        assert_eq!(df.height(), 4);

        let df = export_rows(&dataset, "Borduria", full_span()).unwrap();
        assert_eq!(df.height(), 1);
    }
}
