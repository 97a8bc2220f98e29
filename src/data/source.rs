//! Remote Data Source Module
//! Downloads the OWID COVID-19 CSV over HTTPS.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_URL: &str = "https://covid.ourworldindata.org/data/owid-covid-data.csv";

const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const FETCH_TIMEOUT_SECS: u64 = 180;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Data source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Data source returned status {0}")]
    Status(StatusCode),
}

/// Source location and cache policy, read once from the environment.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub cache_ttl: Duration,
}

impl SourceConfig {
    /// Read `COVIDSCOPE_DATA_URL` and `COVIDSCOPE_CACHE_TTL_SECS` from the
    /// environment (`.env` supported), falling back to built-in defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let url = std::env::var("COVIDSCOPE_DATA_URL")
            .unwrap_or_else(|_| DEFAULT_DATA_URL.to_string());

        let cache_ttl = std::env::var("COVIDSCOPE_CACHE_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        Self { url, cache_ttl }
    }
}

/// Download the CSV body. All-or-nothing: any failure is an error,
/// never a partial body.
pub fn fetch_csv(config: &SourceConfig) -> Result<Vec<u8>, SourceError> {
    tracing::info!(url = %config.url, "Fetching COVID-19 dataset");

    let client = Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;

    let resp = client.get(&config.url).send()?;
    if !resp.status().is_success() {
        return Err(SourceError::Status(resp.status()));
    }

    let bytes = resp.bytes()?;
    tracing::info!(bytes = bytes.len(), "Dataset downloaded");
    Ok(bytes.to_vec())
}
