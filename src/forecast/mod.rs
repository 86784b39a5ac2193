//! Forecast sources
//!
//! A [`ForecastSource`] turns a user's location query into a resolved
//! [`LocationCoordinate`] and fetches the raw record series for it. Each
//! call is a single request bounded by the configured timeout; failures are
//! reported, never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, warn};

use crate::config::{ForecastProvider, NormalizerConfig, StyleConfig};
use crate::models::{ForecastRecord, ForecastSummary, LocationCoordinate};
use crate::{Result, StyleError, normalizer, regions};

pub mod kma;
pub mod openweathermap;

pub use kma::KmaSource;
pub use openweathermap::OpenWeatherMapSource;

/// What the user asked for, before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Region catalogue selection
    Region {
        region: String,
        district: Option<String>,
    },
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Free-form place name, resolved by geocoding
    Name(String),
}

impl LocationQuery {
    /// Parse free-form location input (coordinates, region names, city names)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StyleError::validation("Location cannot be empty"));
        }

        if let Some((lat, lon)) = parse_coordinates(input) {
            return Ok(LocationQuery::Coordinates(lat, lon));
        }

        let mut words = input.split_whitespace();
        if let Some(first) = words.next() {
            if regions::find_region(first).is_ok() {
                let rest = words.collect::<Vec<_>>().join(" ");
                return Ok(LocationQuery::Region {
                    region: first.to_string(),
                    district: (!rest.is_empty()).then_some(rest),
                });
            }
        }

        Ok(LocationQuery::Name(input.to_string()))
    }
}

/// Parse coordinates from string like "37.5665,126.9780" or "37.5665 126.9780"
fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() != 2 {
        return None;
    }

    let lat = parts[0].parse::<f64>().ok()?;
    let lon = parts[1].parse::<f64>().ok()?;

    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Short provider name for logs and messages
    fn name(&self) -> &'static str;

    /// Resolve a query to a location this source can forecast for
    async fn resolve(&self, query: &LocationQuery) -> Result<LocationCoordinate>;

    /// Fetch the raw forecast records for `location` as of `now` (local time)
    async fn fetch(
        &self,
        location: &LocationCoordinate,
        now: NaiveDateTime,
    ) -> Result<Vec<ForecastRecord>>;
}

/// Build the configured forecast source.
///
/// Fails with a configuration error when its credential is missing, before
/// any request is made.
pub fn from_config(config: &StyleConfig) -> Result<Box<dyn ForecastSource>> {
    let client = http_client(config.forecast.timeout_seconds)?;
    match config.forecast.provider {
        ForecastProvider::Kma => Ok(Box::new(KmaSource::new(client, config)?)),
        ForecastProvider::OpenWeatherMap => {
            Ok(Box::new(OpenWeatherMapSource::new(client, config)?))
        }
    }
}

/// Resolve, fetch and normalize in one sequential pass
pub async fn summarize(
    source: &dyn ForecastSource,
    query: &LocationQuery,
    target: NaiveDate,
    now: NaiveDateTime,
    settings: &NormalizerConfig,
) -> Result<ForecastSummary> {
    let location = source.resolve(query).await?;
    debug!("Resolved {:?} to {}", query, location);
    let records = source.fetch(&location, now).await?;
    normalizer::summarize(&location, target, now, &records, settings)
}

/// HTTP client shared by the forecast adapters
pub fn http_client(timeout_seconds: u32) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(concat!("stylecast/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StyleError::config(format!("Failed to create HTTP client: {e}")))
}

/// Send a request and return the body of a successful response.
///
/// Transport failures map to [`StyleError::SourceUnavailable`]; a non-success
/// status maps to [`StyleError::SourceRejected`] carrying the message
/// `extract_message` finds in the body, or the raw body.
pub(crate) async fn fetch_body(
    source: &str,
    request: RequestBuilder,
    extract_message: fn(&str) -> Option<String>,
) -> Result<String> {
    let start_time = Instant::now();

    let response = request.send().await.map_err(|e| {
        warn!("{source} request failed: {e}");
        transport_error(source, &e)
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| transport_error(source, &e))?;
    let duration = start_time.elapsed();

    if !status.is_success() {
        let message = extract_message(&body).unwrap_or_else(|| body.trim().to_string());
        warn!(
            "{source} responded with HTTP {} in {:.3}s: {}",
            status.as_u16(),
            duration.as_secs_f64(),
            message
        );
        return Err(StyleError::rejected(format!(
            "{message} (HTTP {})",
            status.as_u16()
        )));
    }

    info!(
        "{source} responded in {:.3}s ({} bytes)",
        duration.as_secs_f64(),
        body.len()
    );
    if duration.as_secs() > 5 {
        warn!("Slow {source} response: {:.3}s", duration.as_secs_f64());
    }

    Ok(body)
}

fn transport_error(source: &str, err: &reqwest::Error) -> StyleError {
    if err.is_timeout() {
        StyleError::unavailable(format!("{source} did not answer in time, retry later"))
    } else {
        StyleError::unavailable(format!("{source} could not be reached: {err}"))
    }
}
