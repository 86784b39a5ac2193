//! KMA village forecast (단기예보) source
//!
//! The service publishes eight forecast batches a day. The newest batch
//! whose slots include the current hour is requested in a single page; its items are mapped to
//! [`ForecastRecord`]s, dropping categories the normalizer does not use.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ForecastSource, LocationQuery, fetch_body};
use crate::config::StyleConfig;
use crate::models::{ForecastRecord, LocationCoordinate, Observation};
use crate::{Result, StyleError, regions};

/// Hours at which village forecast batches are issued
pub const ISSUE_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];

/// Delay between the nominal issue time and availability through the API
pub const PUBLICATION_DELAY_MINUTES: i64 = 10;

const RESULT_OK: &str = "00";
const RESULT_NO_DATA: &str = "03";

/// `OpenAPI_ServiceResponse` gateway envelope
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(rename = "cmmMsgHeader")]
    header: GatewayHeader,
}

#[derive(Debug, Deserialize)]
struct GatewayHeader {
    #[serde(rename = "errMsg")]
    err_msg: Option<String>,
    #[serde(rename = "returnAuthMsg")]
    return_auth_msg: Option<String>,
    #[serde(rename = "returnReasonCode")]
    return_reason_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: KmaResponse,
}

#[derive(Debug, Deserialize)]
struct KmaResponse {
    header: Header,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    result_code: String,
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    items: Option<Items>,
}

#[derive(Debug, Deserialize)]
struct Items {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    category: String,
    fcst_date: String,
    fcst_time: String,
    fcst_value: String,
}

pub struct KmaSource {
    client: Client,
    base_url: String,
    service_key: String,
    page_size: u32,
}

impl KmaSource {
    pub fn new(client: Client, config: &StyleConfig) -> Result<Self> {
        let service_key = config.kma_service_key()?.to_string();
        Ok(Self {
            client,
            base_url: config.forecast.kma.base_url.trim_end_matches('/').to_string(),
            service_key,
            page_size: config.forecast.kma.page_size,
        })
    }
}

/// Latest issue time whose batch is published at `now`
#[must_use]
pub fn latest_issue(now: NaiveDateTime) -> NaiveDateTime {
    let delay = Duration::minutes(PUBLICATION_DELAY_MINUTES);
    for &hour in ISSUE_HOURS.iter().rev() {
        if let Some(issued) = now.date().and_hms_opt(hour, 0, 0) {
            if issued + delay <= now {
                return issued;
            }
        }
    }
    // before the first batch of the day is out, use yesterday's last one
    (now.date() - Duration::days(1))
        .and_hms_opt(ISSUE_HOURS[ISSUE_HOURS.len() - 1], 0, 0)
        .unwrap_or(now)
}

/// Issue time of the newest published batch that still covers the current hour.
///
/// A batch starts one hour after it is issued, so during the issue hour
/// itself the previous batch is requested.
#[must_use]
pub fn issue_time(now: NaiveDateTime) -> NaiveDateTime {
    let issued = latest_issue(now);
    if issued.date() == now.date() && issued.hour() == now.hour() {
        latest_issue(issued - Duration::minutes(1))
    } else {
        issued
    }
}

#[async_trait]
impl ForecastSource for KmaSource {
    fn name(&self) -> &'static str {
        "KMA"
    }

    async fn resolve(&self, query: &LocationQuery) -> Result<LocationCoordinate> {
        match query {
            LocationQuery::Region { region, district } => {
                Ok(regions::resolve(region, district.as_deref())?.grid_location())
            }
            LocationQuery::Coordinates(lat, lon) => Ok(LocationCoordinate::lat_lon(
                format!("{lat:.4}, {lon:.4}"),
                *lat,
                *lon,
            )),
            LocationQuery::Name(name) => regions::resolve(name, None)
                .map(|site| site.grid_location())
                .map_err(|_| {
                    StyleError::validation(format!(
                        "'{name}' is not a known region. The KMA source needs a region or coordinates."
                    ))
                }),
        }
    }

    #[instrument(skip(self, location), fields(location = %location.label))]
    async fn fetch(
        &self,
        location: &LocationCoordinate,
        now: NaiveDateTime,
    ) -> Result<Vec<ForecastRecord>> {
        let (nx, ny) = location.grid_cell();
        let issued = issue_time(now);
        debug!("Requesting KMA batch issued {} for grid {},{}", issued, nx, ny);

        let request = self
            .client
            .get(format!("{}/getVilageFcst", self.base_url))
            .query(&[
                ("serviceKey", self.service_key.clone()),
                ("pageNo", "1".to_string()),
                ("numOfRows", self.page_size.to_string()),
                ("dataType", "JSON".to_string()),
                ("base_date", issued.format("%Y%m%d").to_string()),
                ("base_time", issued.format("%H%M").to_string()),
                ("nx", nx.to_string()),
                ("ny", ny.to_string()),
            ]);

        let body = fetch_body(self.name(), request, xml_error_message).await?;
        parse_response(&body, now.date())
    }
}

/// Parse a village forecast response body into records.
///
/// `today` only labels the data-gap error of an empty or malformed payload.
pub fn parse_response(body: &str, today: NaiveDate) -> Result<Vec<ForecastRecord>> {
    // service-key failures come back as XML with a 200 status
    if body.trim_start().starts_with('<') {
        let message = xml_error_message(body).unwrap_or_else(|| body.trim().to_string());
        return Err(StyleError::rejected(message));
    }

    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        warn!("Malformed KMA response: {e}");
        StyleError::no_forecast(today, format!("malformed forecast payload: {e}"))
    })?;
    let response = envelope.response;

    match response.header.result_code.as_str() {
        RESULT_OK => {}
        RESULT_NO_DATA => {
            return Err(StyleError::no_forecast(today, response.header.result_msg));
        }
        _ => return Err(StyleError::rejected(response.header.result_msg)),
    }

    let items = response
        .body
        .and_then(|b| b.items)
        .map(|i| i.item)
        .unwrap_or_default();
    if items.is_empty() {
        return Err(StyleError::no_forecast(today, "forecast payload has no items"));
    }

    let total = items.len();
    let records: Vec<ForecastRecord> = items.iter().filter_map(to_record).collect();
    debug!("Mapped {} of {} KMA items to records", records.len(), total);
    Ok(records)
}

fn to_record(item: &Item) -> Option<ForecastRecord> {
    let build: fn(&str) -> Option<Observation> = match item.category.as_str() {
        "TMP" => |v: &str| v.parse().ok().map(Observation::Temperature),
        "TMN" => |v: &str| v.parse().ok().map(Observation::TemperatureMin),
        "TMX" => |v: &str| v.parse().ok().map(Observation::TemperatureMax),
        "SKY" => |v: &str| v.parse().ok().map(Observation::Sky),
        "PTY" => |v: &str| v.parse().ok().map(Observation::PrecipitationType),
        "POP" => |v: &str| v.parse().ok().map(Observation::PrecipitationProbability),
        _ => return None,
    };

    let Ok(date) = NaiveDate::parse_from_str(&item.fcst_date, "%Y%m%d") else {
        warn!("Skipping {} item with bad date '{}'", item.category, item.fcst_date);
        return None;
    };
    let time = NaiveTime::parse_from_str(&item.fcst_time, "%H%M").ok();
    let Some(observation) = build(item.fcst_value.trim()) else {
        warn!(
            "Skipping {} item with bad value '{}'",
            item.category, item.fcst_value
        );
        return None;
    };

    Some(ForecastRecord::new(date, time, observation))
}

/// Error text of the XML envelope data.go.kr uses for gateway errors
fn xml_error_message(body: &str) -> Option<String> {
    let response: GatewayResponse = from_str(body).ok()?;
    let header = response.header;
    debug!(
        "KMA gateway error, reason code {}",
        header.return_reason_code.as_deref().unwrap_or("-")
    );
    [header.return_auth_msg, header.err_msg]
        .into_iter()
        .flatten()
        .map(|m| m.trim().to_string())
        .find(|m| !m.is_empty())
}
