//! Dataset Loader Module
//! Parses the raw CSV into a typed, date-sorted DataFrame using Polars
//! and owns the explicit dataset cache.

use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

pub const COUNTRY_COL: &str = "location";
pub const DATE_COL: &str = "date";

/// Columns the dashboard consumes. Everything else in the source CSV is
/// dropped at load time.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    COUNTRY_COL,
    DATE_COL,
    "new_cases",
    "new_deaths",
    "new_vaccinations",
    "total_cases",
    "total_deaths",
    "people_vaccinated",
    "population",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Source data is missing required column '{0}'")]
    MissingColumn(String),
    #[error("Source data contains no rows")]
    Empty,
}

/// The loaded dataset. Read-only after construction; a refresh replaces it
/// wholesale through the cache.
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
    countries: Vec<String>,
    date_span: (NaiveDate, NaiveDate),
}

impl Dataset {
    /// Parse raw CSV bytes into a dataset restricted to the dashboard
    /// columns, sorted by date ascending.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, LoaderError> {
        let cursor = Cursor::new(bytes);
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(10_000))
            .with_ignore_errors(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .into_reader_with_file_handle(cursor)
            .finish()?;

        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(LoaderError::MissingColumn(name.to_string()));
            }
        }

        let selected: Vec<Expr> = REQUIRED_COLUMNS.iter().map(|name| col(*name)).collect();
        let df = df
            .lazy()
            .select(selected)
            .sort([DATE_COL], SortMultipleOptions::default())
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::Empty);
        }

        let countries = unique_countries(&df)?;
        let date_span = date_span(&df)?;

        Ok(Self {
            df,
            countries,
            date_span,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Sorted unique country names.
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn contains_country(&self, country: &str) -> bool {
        self.countries
            .binary_search_by(|c| c.as_str().cmp(country))
            .is_ok()
    }

    /// Earliest and latest observation dates across all countries.
    pub fn date_span(&self) -> (NaiveDate, NaiveDate) {
        self.date_span
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }
}

fn unique_countries(df: &DataFrame) -> Result<Vec<String>, LoaderError> {
    let unique = df.column(COUNTRY_COL)?.unique()?;
    let series = unique.as_materialized_series();

    let mut countries: Vec<String> = (0..series.len())
        .filter_map(|i| {
            let val = series.get(i).ok()?;
            if val.is_null() {
                None
            } else {
                Some(val.to_string().trim_matches('"').to_string())
            }
        })
        .collect();
    countries.sort();
    Ok(countries)
}

fn date_span(df: &DataFrame) -> Result<(NaiveDate, NaiveDate), LoaderError> {
    let series = df.column(DATE_COL)?.as_materialized_series();
    let dates = series.date()?;

    let mut min: Option<NaiveDate> = None;
    let mut max: Option<NaiveDate> = None;
    for date in dates.as_date_iter().flatten() {
        min = Some(min.map_or(date, |m| m.min(date)));
        max = Some(max.map_or(date, |m| m.max(date)));
    }

    match (min, max) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(LoaderError::Empty),
    }
}

/// Explicit cache for the loaded dataset.
///
/// Written once per refresh and read many times; staleness is advisory
/// (the UI decides when to refetch), never a correctness concern.
pub struct DatasetCache {
    dataset: Option<Dataset>,
    loaded_at: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            dataset: None,
            loaded_at: None,
            ttl,
        }
    }

    /// Replace the cached dataset wholesale and stamp the load time.
    pub fn store(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.loaded_at = Some(Utc::now());
    }

    pub fn get(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.dataset = None;
        self.loaded_at = None;
    }

    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// True when nothing is loaded or the TTL has elapsed.
    pub fn is_stale(&self) -> bool {
        match self.loaded_at {
            None => true,
            Some(at) => Utc::now()
                .signed_duration_since(at)
                .to_std()
                .map(|elapsed| elapsed >= self.ttl)
                .unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
location,date,new_cases,new_deaths,new_vaccinations,total_cases,total_deaths,people_vaccinated,population
Testland,2021-01-02,5,1,,15,2,100,1000
Testland,2021-01-01,10,,20,10,1,80,1000
Borduria,2021-01-01,3,0,1,3,0,50,500
";

    #[test]
    fn parses_csv_and_sorts_by_date() {
        let dataset = Dataset::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.countries(), ["Borduria", "Testland"]);

        let (first, last) = dataset.date_span();
        assert_eq!(first, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
    }

    #[test]
    fn country_lookup() {
        let dataset = Dataset::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        assert!(dataset.contains_country("Testland"));
        assert!(!dataset.contains_country("Atlantis"));
    }

    #[test]
    fn missing_column_is_rejected() {
        let csv = "location,date,new_cases\nTestland,2021-01-01,10\n";
        let err = Dataset::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(name) if name == "new_deaths"));
    }

    #[test]
    fn empty_body_is_rejected() {
        let header = "location,date,new_cases,new_deaths,new_vaccinations,\
total_cases,total_deaths,people_vaccinated,population\n";
        assert!(matches!(
            Dataset::from_csv_bytes(header.as_bytes()),
            Err(LoaderError::Empty) | Err(LoaderError::Csv(_))
        ));
    }

    #[test]
    fn cache_staleness_and_invalidate() {
        let dataset = Dataset::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();

        let mut cache = DatasetCache::new(Duration::from_secs(3600));
        assert!(cache.is_stale());
        assert!(cache.last_loaded_at().is_none());

        cache.store(dataset.clone());
        assert!(!cache.is_stale());
        assert!(cache.get().is_some());
        assert!(cache.last_loaded_at().is_some());

        cache.invalidate();
        assert!(cache.is_stale());
        assert!(cache.get().is_none());

        // A zero TTL is stale immediately after a store.
        let mut cache = DatasetCache::new(Duration::from_secs(0));
        cache.store(dataset);
        assert!(cache.is_stale());
    }
}
