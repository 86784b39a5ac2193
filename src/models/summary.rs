//! Normalized forecast summary passed to the prompt assembler

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::codes::{PrecipitationKind, SkyCondition};

/// Temperature part of a summary
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Temperature {
    /// Daily range for a day other than today
    Range { low: f64, high: f64 },
    /// Temperature at the current hour, when the target day is today
    Current { value: f64 },
    /// No usable temperature for the day (or no slot at the current hour)
    Unavailable,
}

impl Temperature {
    /// Format temperature with unit
    #[must_use]
    pub fn format(&self) -> String {
        match self {
            Temperature::Range { low, high } => format!("최저 {low:.1}°C / 최고 {high:.1}°C"),
            Temperature::Current { value } => format!("현재 {value:.1}°C"),
            Temperature::Unavailable => "기온 정보 없음".to_string(),
        }
    }
}

/// Compact description of one forecast day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastSummary {
    /// Label of the location the forecast was requested for
    pub location: String,
    pub date: NaiveDate,
    pub temperature: Temperature,
    /// Most frequent sky state of the day
    pub sky: SkyCondition,
    pub has_precipitation: bool,
    /// Most frequent precipitation kind, when a discrete type was reported
    pub precipitation_kind: Option<PrecipitationKind>,
}

impl std::fmt::Display for ForecastSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.location, self.date)?;
        writeln!(f, "   🌡️ {}", self.temperature.format())?;
        writeln!(f, "   ☁️ {}", self.sky)?;
        match (self.has_precipitation, self.precipitation_kind) {
            (true, Some(kind)) => writeln!(f, "   ☔ 강수 있음 ({})", kind.label()),
            (true, None) => writeln!(f, "   ☔ 강수 가능성 높음"),
            (false, _) => writeln!(f, "   🌂 강수 없음"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_format() {
        let range = Temperature::Range {
            low: 9.0,
            high: 18.5,
        };
        assert_eq!(range.format(), "최저 9.0°C / 최고 18.5°C");
        assert_eq!(Temperature::Current { value: 18.0 }.format(), "현재 18.0°C");
        assert_eq!(Temperature::Unavailable.format(), "기온 정보 없음");
    }

    #[test]
    fn test_summary_display_mentions_precipitation_kind() {
        let summary = ForecastSummary {
            location: "서울".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            temperature: Temperature::Unavailable,
            sky: SkyCondition::Overcast,
            has_precipitation: true,
            precipitation_kind: Some(PrecipitationKind::Rain),
        };
        let text = summary.to_string();
        assert!(text.contains("서울 (2026-10-15)"));
        assert!(text.contains("흐림"));
        assert!(text.contains("강수 있음 (비)"));
    }
}
