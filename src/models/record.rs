//! Raw forecast records as delivered by a forecast source

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// One measured or predicted value
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "category", content = "value", rename_all = "snake_case")]
pub enum Observation {
    /// Instantaneous temperature in Celsius
    Temperature(f64),
    /// Minimum temperature of the day in Celsius
    TemperatureMin(f64),
    /// Maximum temperature of the day in Celsius
    TemperatureMax(f64),
    /// Canonical sky code (see [`super::codes::sky_condition`])
    Sky(u16),
    /// Canonical precipitation type code, 0 meaning none
    PrecipitationType(u8),
    /// Probability of precipitation in percent
    PrecipitationProbability(u8),
}

/// One observation/prediction slot
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastRecord {
    /// Calendar day the value applies to
    pub date: NaiveDate,
    /// Time of day, absent for daily-only values
    pub time: Option<NaiveTime>,
    pub observation: Observation,
}

impl ForecastRecord {
    #[must_use]
    pub fn new(date: NaiveDate, time: Option<NaiveTime>, observation: Observation) -> Self {
        Self {
            date,
            time,
            observation,
        }
    }

    /// Hour of day of this slot, if it has one
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        self.time.map(|t| t.hour())
    }
}
