//! OpenWeatherMap source: direct geocoding plus the 5 day / 3 hour forecast
//!
//! OpenWeatherMap vocabulary is translated into the canonical KMA codes so
//! the normalizer sees one scale for every source.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{ForecastSource, LocationQuery, fetch_body};
use crate::config::StyleConfig;
use crate::models::codes::{
    PRECIPITATION_NONE, PRECIPITATION_RAIN, PRECIPITATION_RAIN_AND_SNOW, PRECIPITATION_SNOW,
    SKY_CLEAR, SKY_MOSTLY_CLOUDY, SKY_OVERCAST,
};
use crate::models::{ForecastRecord, LocationCoordinate, Observation};
use crate::{Result, StyleError, regions};

/// Geocoding result from the OpenWeatherMap direct geocoding API
#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingResult {
    pub name: String,
    #[serde(default)]
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GeocodingResult {
    /// Location labelled in `language` when a local name exists
    #[must_use]
    pub fn into_location(self, language: &str) -> LocationCoordinate {
        let name = self
            .local_names
            .as_ref()
            .and_then(|names| names.get(language).or_else(|| names.get("ko")))
            .cloned()
            .unwrap_or(self.name);
        let label = match self.country {
            Some(country) => format!("{name}, {country}"),
            None => name,
        };
        LocationCoordinate::lat_lon(label, self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<Entry>,
    city: Option<City>,
}

#[derive(Debug, Deserialize)]
struct City {
    /// Shift from UTC in seconds
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct Entry {
    /// Unix timestamp (UTC)
    dt: i64,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    clouds: Option<Clouds>,
    /// Probability of precipitation, 0.0-1.0
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    id: u16,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenWeatherMapSource {
    client: Client,
    base_url: String,
    geo_url: String,
    api_key: String,
    units: String,
    language: String,
}

impl OpenWeatherMapSource {
    pub fn new(client: Client, config: &StyleConfig) -> Result<Self> {
        let owm = &config.forecast.openweathermap;
        Ok(Self {
            client,
            base_url: owm.base_url.trim_end_matches('/').to_string(),
            geo_url: owm.geo_url.trim_end_matches('/').to_string(),
            api_key: config.openweathermap_api_key()?.to_string(),
            units: owm.units.clone(),
            language: owm.language.clone(),
        })
    }

    /// Look up a place name, returning the best match
    #[instrument(skip(self))]
    pub async fn geocode(&self, name: &str) -> Result<LocationCoordinate> {
        info!("Geocoding location: '{}'", name);
        let url = format!(
            "{}/direct?q={}&limit=1&appid={}",
            self.geo_url,
            urlencoding::encode(name),
            self.api_key
        );
        let body = fetch_body(self.name(), self.client.get(url), error_message).await?;

        let results: Vec<GeocodingResult> = serde_json::from_str(&body)
            .map_err(|e| StyleError::rejected(format!("unreadable geocoding response: {e}")))?;

        match results.into_iter().next() {
            Some(result) => {
                debug!("Found {} ({:.4}, {:.4})", result.name, result.lat, result.lon);
                Ok(result.into_location(&self.language))
            }
            None => {
                warn!("No results found for location '{}'", name);
                Err(StyleError::validation(format!("Location not found: {name}")))
            }
        }
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherMapSource {
    fn name(&self) -> &'static str {
        "OpenWeatherMap"
    }

    async fn resolve(&self, query: &LocationQuery) -> Result<LocationCoordinate> {
        match query {
            LocationQuery::Region { region, district } => {
                Ok(regions::resolve(region, district.as_deref())?.lat_lon_location())
            }
            LocationQuery::Coordinates(lat, lon) => Ok(LocationCoordinate::lat_lon(
                format!("{lat:.4}, {lon:.4}"),
                *lat,
                *lon,
            )),
            LocationQuery::Name(name) => self.geocode(name).await,
        }
    }

    #[instrument(skip(self, location), fields(location = %location.label))]
    async fn fetch(
        &self,
        location: &LocationCoordinate,
        now: NaiveDateTime,
    ) -> Result<Vec<ForecastRecord>> {
        let (lat, lon) = location.lat_lon_pair().ok_or_else(|| {
            StyleError::validation(format!(
                "{} has only grid coordinates; OpenWeatherMap needs latitude/longitude",
                location.label
            ))
        })?;

        let request = self.client.get(format!("{}/forecast", self.base_url)).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.api_key.clone()),
            ("units", self.units.clone()),
            ("lang", self.language.clone()),
        ]);

        let body = fetch_body(self.name(), request, error_message).await?;
        parse_forecast(&body, now)
    }
}

/// Parse a 5 day / 3 hour forecast body into local-time records
pub fn parse_forecast(body: &str, now: NaiveDateTime) -> Result<Vec<ForecastRecord>> {
    let response: ForecastResponse = serde_json::from_str(body).map_err(|e| {
        warn!("Malformed OpenWeatherMap response: {e}");
        StyleError::no_forecast(now.date(), format!("malformed forecast payload: {e}"))
    })?;

    if response.list.is_empty() {
        return Err(StyleError::no_forecast(
            now.date(),
            "forecast payload has no entries",
        ));
    }

    let offset = response.city.map_or(0, |c| c.timezone);
    let mut records = Vec::with_capacity(response.list.len() * 4);

    for entry in &response.list {
        let Some(local) = DateTime::from_timestamp(entry.dt + offset, 0) else {
            warn!("Skipping entry with out-of-range timestamp {}", entry.dt);
            continue;
        };
        let local = local.naive_utc();
        let (date, time) = (local.date(), Some(local.time()));
        let mut push = |observation| records.push(ForecastRecord::new(date, time, observation));

        push(Observation::Temperature(entry.main.temp));
        if let Some(clouds) = &entry.clouds {
            push(Observation::Sky(sky_code(clouds.all)));
        }
        if let Some(condition) = entry.weather.first() {
            push(Observation::PrecipitationType(precipitation_code(condition.id)));
        }
        if let Some(pop) = entry.pop {
            let percent = (pop * 100.0).round().clamp(0.0, 100.0) as u8;
            push(Observation::PrecipitationProbability(percent));
        }
    }

    debug!(
        "Mapped {} OpenWeatherMap entries to {} records",
        response.list.len(),
        records.len()
    );
    Ok(records)
}

/// Cloud cover percentage to canonical sky code
fn sky_code(cloud_cover: u8) -> u16 {
    match cloud_cover {
        0..=50 => SKY_CLEAR,
        51..=80 => SKY_MOSTLY_CLOUDY,
        _ => SKY_OVERCAST,
    }
}

/// OpenWeatherMap condition id to canonical precipitation code
fn precipitation_code(condition: u16) -> u8 {
    match condition {
        200..=299 => PRECIPITATION_RAIN,
        300..=399 => 5,
        511 | 611..=616 => PRECIPITATION_RAIN_AND_SNOW,
        520..=531 => 4,
        500..=599 => PRECIPITATION_RAIN,
        600..=699 => PRECIPITATION_SNOW,
        _ => PRECIPITATION_NONE,
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::config::NormalizerConfig;
    use chrono::{NaiveDate, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_forecast_shifts_to_local_time() {
        // 2026-10-14 18:00 UTC is 2026-10-15 03:00 in Seoul (+9h)
        let body = r#"{"cod":"200","message":0,"cnt":1,"list":[
            {"dt":1792000800,"main":{"temp":11.3,"temp_min":10.0,"temp_max":12.0},
             "weather":[{"id":500,"main":"Rain","description":"실 비"}],
             "clouds":{"all":90},"pop":0.62,"dt_txt":"2026-10-14 18:00:00"}],
            "city":{"name":"Seoul","timezone":32400}}"#;

        let records = parse_forecast(body, now()).unwrap();
        assert_eq!(records.len(), 4);
        let expected_date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert!(records.iter().all(|r| r.date == expected_date));
        assert_eq!(records[0].hour(), Some(3));
        assert_eq!(records[0].observation, Observation::Temperature(11.3));
        assert_eq!(records[1].observation, Observation::Sky(SKY_OVERCAST));
        assert_eq!(
            records[2].observation,
            Observation::PrecipitationType(PRECIPITATION_RAIN)
        );
        assert_eq!(records[3].observation, Observation::PrecipitationProbability(62));
    }

    #[test]
    fn test_missing_condition_leaves_probability_to_decide() {
        // 2026-10-14 00:00 UTC is 09:00 in Seoul
        let body = r#"{"cod":"200","message":0,"cnt":1,"list":[
            {"dt":1791936000,"main":{"temp":15.0},"weather":[],"pop":0.9}],
            "city":{"name":"Seoul","timezone":32400}}"#;

        let records = parse_forecast(body, now()).unwrap();
        assert!(
            !records
                .iter()
                .any(|r| matches!(r.observation, Observation::PrecipitationType(_)))
        );
        assert!(records.contains(&ForecastRecord::new(
            now().date(),
            NaiveTime::from_hms_opt(9, 0, 0),
            Observation::PrecipitationProbability(90)
        )));

        let location = LocationCoordinate::lat_lon("서울", 37.5665, 126.978);
        let summary = crate::normalizer::summarize(
            &location,
            now().date(),
            now(),
            &records,
            &NormalizerConfig::default(),
        )
        .unwrap();
        assert!(summary.has_precipitation);
    }

    #[test]
    fn test_empty_list_is_data_gap() {
        let body = r#"{"cod":"200","message":0,"cnt":0,"list":[]}"#;
        assert_eq!(parse_forecast(body, now()).unwrap_err().kind(), ErrorKind::DataGap);
        assert_eq!(parse_forecast("not json", now()).unwrap_err().kind(), ErrorKind::DataGap);
    }

    #[test]
    fn test_code_translation() {
        assert_eq!(sky_code(10), SKY_CLEAR);
        assert_eq!(sky_code(75), SKY_MOSTLY_CLOUDY);
        assert_eq!(sky_code(100), SKY_OVERCAST);
        assert_eq!(precipitation_code(800), PRECIPITATION_NONE);
        assert_eq!(precipitation_code(211), PRECIPITATION_RAIN);
        assert_eq!(precipitation_code(521), 4);
        assert_eq!(precipitation_code(511), PRECIPITATION_RAIN_AND_SNOW);
        assert_eq!(precipitation_code(601), PRECIPITATION_SNOW);
        assert_eq!(precipitation_code(741), PRECIPITATION_NONE);
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"cod":401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}"#;
        assert!(error_message(body).unwrap().starts_with("Invalid API key"));
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_geocoding_result_prefers_local_name() {
        let result = GeocodingResult {
            name: "Seoul".to_string(),
            local_names: Some(HashMap::from([("ko".to_string(), "서울".to_string())])),
            lat: 37.5666791,
            lon: 126.9782914,
            country: Some("KR".to_string()),
            state: None,
        };
        let location = result.into_location("kr");
        assert_eq!(location.label, "서울, KR");
        assert_eq!(location.grid_cell(), (60, 127));
    }
}
