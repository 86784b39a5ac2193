//! Forecast normalization
//!
//! Condenses a raw multi-day record series into the [`ForecastSummary`] of
//! a single target day. The function is pure: the caller supplies "now" and
//! the records, nothing is fetched or cached here.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::config::NormalizerConfig;
use crate::models::codes::{precipitation_kind, sky_condition};
use crate::models::{
    ForecastRecord, ForecastSummary, LocationCoordinate, Observation, SkyCondition, Temperature,
};
use crate::{Result, StyleError};

/// Records of the target day, split by category in arrival order
#[derive(Debug, Default)]
struct DayGroups {
    temperatures: Vec<(Option<u32>, f64)>,
    minimums: Vec<f64>,
    maximums: Vec<f64>,
    sky_codes: Vec<u16>,
    precipitation_types: Vec<u8>,
    probabilities: Vec<u8>,
}

impl DayGroups {
    fn collect<'a>(records: impl Iterator<Item = &'a ForecastRecord>) -> Self {
        let mut groups = Self::default();
        for record in records {
            match record.observation {
                Observation::Temperature(t) => groups.temperatures.push((record.hour(), t)),
                Observation::TemperatureMin(t) => groups.minimums.push(t),
                Observation::TemperatureMax(t) => groups.maximums.push(t),
                Observation::Sky(code) => groups.sky_codes.push(code),
                Observation::PrecipitationType(code) => groups.precipitation_types.push(code),
                Observation::PrecipitationProbability(p) => groups.probabilities.push(p),
            }
        }
        groups
    }
}

/// Summarize the forecast for `target` from `records`.
///
/// Fails with [`StyleError::NoForecast`] when no record falls on `target`.
pub fn summarize(
    location: &LocationCoordinate,
    target: NaiveDate,
    now: NaiveDateTime,
    records: &[ForecastRecord],
    settings: &NormalizerConfig,
) -> Result<ForecastSummary> {
    let mut day = records.iter().filter(|r| r.date == target).peekable();
    if day.peek().is_none() {
        debug!(
            "No records for {} among {} records for {}",
            target,
            records.len(),
            location.label
        );
        return Err(StyleError::no_forecast(
            target,
            format!("the source returned no entries for {target}"),
        ));
    }
    let groups = DayGroups::collect(day);

    debug!(
        "Summarizing {}: {} temperatures, {} sky, {} precipitation type, {} probability records",
        target,
        groups.temperatures.len(),
        groups.sky_codes.len(),
        groups.precipitation_types.len(),
        groups.probabilities.len()
    );

    let temperature = if target == now.date() {
        current_temperature(&groups, now.hour(), settings.current_hour_tolerance)
    } else {
        daily_range(&groups)
    };

    let sky = mode(&groups.sky_codes).map_or(SkyCondition::Unreported, sky_condition);

    let has_precipitation = if groups.precipitation_types.is_empty() {
        groups
            .probabilities
            .iter()
            .any(|&p| p > settings.precipitation_threshold_percent)
    } else {
        groups.precipitation_types.iter().any(|&code| code != 0)
    };

    let wet_codes: Vec<u8> = groups
        .precipitation_types
        .iter()
        .copied()
        .filter(|&code| code != 0)
        .collect();
    let precipitation_kind = mode(&wet_codes).and_then(precipitation_kind);

    Ok(ForecastSummary {
        location: location.label.clone(),
        date: target,
        temperature,
        sky,
        has_precipitation,
        precipitation_kind,
    })
}

fn daily_range(groups: &DayGroups) -> Temperature {
    let instantaneous = || groups.temperatures.iter().map(|&(_, t)| t);

    let low = groups
        .minimums
        .iter()
        .copied()
        .reduce(f64::min)
        .or_else(|| instantaneous().reduce(f64::min));
    let high = groups
        .maximums
        .iter()
        .copied()
        .reduce(f64::max)
        .or_else(|| instantaneous().reduce(f64::max));

    match (low, high) {
        (Some(low), Some(high)) if low > high => {
            warn!("Daily minimum {low} exceeds maximum {high}, reordering");
            Temperature::Range {
                low: high,
                high: low,
            }
        }
        (Some(low), Some(high)) => Temperature::Range { low, high },
        _ => Temperature::Unavailable,
    }
}

fn current_temperature(groups: &DayGroups, hour: u32, tolerance: u32) -> Temperature {
    let mut best: Option<(u32, f64)> = None;
    for &(slot_hour, value) in &groups.temperatures {
        let Some(slot_hour) = slot_hour else {
            continue;
        };
        let distance = slot_hour.abs_diff(hour);
        if distance > tolerance {
            continue;
        }
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, value));
        }
    }

    match best {
        Some((_, value)) => Temperature::Current { value },
        None => {
            debug!("No temperature slot within {tolerance}h of hour {hour}");
            Temperature::Unavailable
        }
    }
}

/// Most frequent value; ties go to the value seen first
fn mode<T: Copy + PartialEq>(values: &[T]) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut winner: Option<(T, usize)> = None;
    for (value, count) in counts {
        if winner.is_none_or(|(_, best)| count > best) {
            winner = Some((value, count));
        }
    }
    winner.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use chrono::NaiveTime;
    use rstest::rstest;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn at(hour: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, 0, 0)
    }

    fn now() -> NaiveDateTime {
        date(14).and_hms_opt(14, 25, 0).unwrap()
    }

    fn seoul() -> LocationCoordinate {
        LocationCoordinate::grid("서울", 60, 127)
    }

    fn settings() -> NormalizerConfig {
        NormalizerConfig::default()
    }

    fn record(day: u32, hour: u32, observation: Observation) -> ForecastRecord {
        ForecastRecord::new(date(day), at(hour), observation)
    }

    #[test]
    fn test_empty_payload_is_data_gap() {
        let err = summarize(&seoul(), date(15), now(), &[], &settings()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataGap);
    }

    #[test]
    fn test_only_other_dates_is_data_gap() {
        let records = vec![
            record(14, 15, Observation::Temperature(20.0)),
            record(16, 6, Observation::TemperatureMin(8.0)),
            record(16, 9, Observation::Sky(1)),
        ];
        let err = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap_err();
        assert!(matches!(err, StyleError::NoForecast { date: d, .. } if d == date(15)));
    }

    #[test]
    fn test_future_day_uses_daily_extremes() {
        let records = vec![
            record(15, 6, Observation::TemperatureMin(7.0)),
            record(15, 9, Observation::Temperature(11.0)),
            record(15, 15, Observation::TemperatureMax(19.0)),
            record(15, 15, Observation::Temperature(18.0)),
        ];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(
            summary.temperature,
            Temperature::Range {
                low: 7.0,
                high: 19.0
            }
        );
        assert_eq!(summary.location, "서울");
        assert_eq!(summary.date, date(15));
    }

    #[test]
    fn test_future_day_falls_back_to_instantaneous_values() {
        let records = vec![
            record(16, 3, Observation::Temperature(4.5)),
            record(16, 12, Observation::Temperature(13.0)),
            record(16, 21, Observation::Temperature(8.0)),
        ];
        let summary = summarize(&seoul(), date(16), now(), &records, &settings()).unwrap();
        assert_eq!(
            summary.temperature,
            Temperature::Range {
                low: 4.5,
                high: 13.0
            }
        );
    }

    #[test]
    fn test_inverted_extremes_keep_high_above_low() {
        let records = vec![
            record(15, 6, Observation::TemperatureMin(21.0)),
            record(15, 15, Observation::TemperatureMax(12.0)),
        ];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        match summary.temperature {
            Temperature::Range { low, high } => {
                assert!(high >= low);
                assert_eq!((low, high), (12.0, 21.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_future_day_without_temperatures_is_unavailable() {
        let records = vec![record(15, 9, Observation::Sky(4))];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(summary.temperature, Temperature::Unavailable);
        assert_eq!(summary.sky, SkyCondition::Overcast);
    }

    #[test]
    fn test_today_reports_current_hour() {
        let records = vec![
            record(14, 13, Observation::Temperature(17.0)),
            record(14, 14, Observation::Temperature(18.0)),
            record(14, 15, Observation::TemperatureMax(21.0)),
            record(14, 15, Observation::Temperature(19.0)),
        ];
        let summary = summarize(&seoul(), date(14), now(), &records, &settings()).unwrap();
        assert_eq!(summary.temperature, Temperature::Current { value: 18.0 });
    }

    #[test]
    fn test_today_without_exact_hour_is_unavailable() {
        let records = vec![
            record(14, 12, Observation::Temperature(17.0)),
            record(14, 15, Observation::Temperature(19.0)),
        ];
        let summary = summarize(&seoul(), date(14), now(), &records, &settings()).unwrap();
        assert_eq!(summary.temperature, Temperature::Unavailable);
    }

    #[test]
    fn test_today_tolerance_picks_closest_slot() {
        let records = vec![
            record(14, 12, Observation::Temperature(17.0)),
            record(14, 15, Observation::Temperature(19.0)),
        ];
        let settings = NormalizerConfig {
            current_hour_tolerance: 2,
            ..NormalizerConfig::default()
        };
        let summary = summarize(&seoul(), date(14), now(), &records, &settings).unwrap();
        assert_eq!(summary.temperature, Temperature::Current { value: 19.0 });
    }

    #[test]
    fn test_duplicate_current_hour_takes_first() {
        let records = vec![
            record(14, 14, Observation::Temperature(18.0)),
            record(14, 14, Observation::Temperature(25.0)),
        ];
        let summary = summarize(&seoul(), date(14), now(), &records, &settings()).unwrap();
        assert_eq!(summary.temperature, Temperature::Current { value: 18.0 });
    }

    #[rstest]
    #[case::majority(&[1, 3, 1], SkyCondition::Clear)]
    #[case::tie_first_seen(&[4, 1, 1, 4], SkyCondition::Overcast)]
    #[case::tie_first_seen_reversed(&[3, 4], SkyCondition::MostlyCloudy)]
    #[case::single(&[3], SkyCondition::MostlyCloudy)]
    #[case::unknown_code(&[9, 9, 1], SkyCondition::Unknown(9))]
    fn test_sky_mode(#[case] codes: &[u16], #[case] expected: SkyCondition) {
        let records: Vec<ForecastRecord> = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| record(15, i as u32, Observation::Sky(code)))
            .collect();
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(summary.sky, expected);
    }

    #[test]
    fn test_missing_sky_is_unreported() {
        let records = vec![record(15, 9, Observation::Temperature(12.0))];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(summary.sky, SkyCondition::Unreported);
        assert!(!summary.has_precipitation);
    }

    #[rstest]
    #[case::one_above_threshold(&[10, 45, 5], true)]
    #[case::all_below(&[10, 35], false)]
    #[case::exactly_threshold(&[40], false)]
    fn test_probability_fallback(#[case] probabilities: &[u8], #[case] expected: bool) {
        let records: Vec<ForecastRecord> = probabilities
            .iter()
            .enumerate()
            .map(|(i, &p)| record(15, i as u32, Observation::PrecipitationProbability(p)))
            .collect();
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(summary.has_precipitation, expected);
        assert_eq!(summary.precipitation_kind, None);
    }

    #[test]
    fn test_discrete_type_overrides_probability() {
        let records = vec![
            record(15, 9, Observation::PrecipitationType(0)),
            record(15, 9, Observation::PrecipitationProbability(90)),
            record(15, 12, Observation::PrecipitationType(0)),
            record(15, 12, Observation::PrecipitationProbability(80)),
        ];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert!(!summary.has_precipitation);
    }

    #[test]
    fn test_discrete_type_reports_kind() {
        let records = vec![
            record(15, 9, Observation::PrecipitationType(0)),
            record(15, 12, Observation::PrecipitationType(3)),
            record(15, 15, Observation::PrecipitationType(1)),
            record(15, 18, Observation::PrecipitationType(3)),
        ];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert!(summary.has_precipitation);
        assert_eq!(
            summary.precipitation_kind,
            Some(crate::models::PrecipitationKind::Snow)
        );
    }

    #[test]
    fn test_configured_threshold() {
        let records = vec![record(15, 9, Observation::PrecipitationProbability(35))];
        let settings = NormalizerConfig {
            precipitation_threshold_percent: 30,
            ..NormalizerConfig::default()
        };
        let summary = summarize(&seoul(), date(15), now(), &records, &settings).unwrap();
        assert!(summary.has_precipitation);
    }

    #[test]
    fn test_only_target_day_contributes() {
        // today: 25..30, tomorrow: 5..10; ranges are disjoint
        let records = vec![
            record(14, 6, Observation::TemperatureMin(25.0)),
            record(14, 14, Observation::Temperature(28.0)),
            record(14, 15, Observation::TemperatureMax(30.0)),
            record(14, 14, Observation::Sky(4)),
            record(14, 14, Observation::PrecipitationType(1)),
            record(15, 6, Observation::TemperatureMin(5.0)),
            record(15, 12, Observation::Temperature(8.0)),
            record(15, 15, Observation::TemperatureMax(10.0)),
            record(15, 12, Observation::Sky(1)),
            record(15, 12, Observation::PrecipitationType(0)),
        ];
        let summary = summarize(&seoul(), date(15), now(), &records, &settings()).unwrap();
        assert_eq!(
            summary.temperature,
            Temperature::Range {
                low: 5.0,
                high: 10.0
            }
        );
        assert_eq!(summary.sky, SkyCondition::Clear);
        assert!(!summary.has_precipitation);
    }

    #[test]
    fn test_mode_helper() {
        assert_eq!(mode::<u8>(&[]), None);
        assert_eq!(mode(&[2, 2, 5, 5]), Some(2));
        assert_eq!(mode(&[5, 2, 2]), Some(2));
    }
}
