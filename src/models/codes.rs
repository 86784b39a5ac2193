//! Static code tables shared by all forecast sources
//!
//! Sources translate their own vocabulary into the canonical KMA codes, so
//! one table serves every provider. Codes missing from a table resolve to an
//! explicit unknown value instead of failing.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Sky state of a forecast day
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkyCondition {
    Clear,
    MostlyCloudy,
    Overcast,
    /// A code the lookup table does not know
    Unknown(u16),
    /// The source reported no sky state for the day
    Unreported,
}

impl SkyCondition {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SkyCondition::Clear => "맑음",
            SkyCondition::MostlyCloudy => "구름많음",
            SkyCondition::Overcast => "흐림",
            SkyCondition::Unknown(_) | SkyCondition::Unreported => "알 수 없음",
        }
    }
}

impl std::fmt::Display for SkyCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of precipitation for a non-zero precipitation code
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationKind {
    Rain,
    RainAndSnow,
    Snow,
    Shower,
    Drizzle,
    Sleet,
    SnowFlurry,
    Unknown(u8),
}

impl PrecipitationKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            PrecipitationKind::Rain => "비",
            PrecipitationKind::RainAndSnow => "비/눈",
            PrecipitationKind::Snow => "눈",
            PrecipitationKind::Shower => "소나기",
            PrecipitationKind::Drizzle => "빗방울",
            PrecipitationKind::Sleet => "빗방울눈날림",
            PrecipitationKind::SnowFlurry => "눈날림",
            PrecipitationKind::Unknown(_) => "알 수 없음",
        }
    }
}

pub const SKY_CLEAR: u16 = 1;
pub const SKY_MOSTLY_CLOUDY: u16 = 3;
pub const SKY_OVERCAST: u16 = 4;

pub const PRECIPITATION_NONE: u8 = 0;
pub const PRECIPITATION_RAIN: u8 = 1;
pub const PRECIPITATION_RAIN_AND_SNOW: u8 = 2;
pub const PRECIPITATION_SNOW: u8 = 3;

static SKY_TABLE: LazyLock<HashMap<u16, SkyCondition>> = LazyLock::new(|| {
    HashMap::from([
        (SKY_CLEAR, SkyCondition::Clear),
        (SKY_MOSTLY_CLOUDY, SkyCondition::MostlyCloudy),
        (SKY_OVERCAST, SkyCondition::Overcast),
    ])
});

static PRECIPITATION_TABLE: LazyLock<HashMap<u8, PrecipitationKind>> = LazyLock::new(|| {
    HashMap::from([
        (PRECIPITATION_RAIN, PrecipitationKind::Rain),
        (PRECIPITATION_RAIN_AND_SNOW, PrecipitationKind::RainAndSnow),
        (PRECIPITATION_SNOW, PrecipitationKind::Snow),
        (4, PrecipitationKind::Shower),
        (5, PrecipitationKind::Drizzle),
        (6, PrecipitationKind::Sleet),
        (7, PrecipitationKind::SnowFlurry),
    ])
});

/// Look up a canonical sky code
#[must_use]
pub fn sky_condition(code: u16) -> SkyCondition {
    SKY_TABLE
        .get(&code)
        .copied()
        .unwrap_or(SkyCondition::Unknown(code))
}

/// Look up a canonical precipitation code, `None` for "no precipitation"
#[must_use]
pub fn precipitation_kind(code: u8) -> Option<PrecipitationKind> {
    if code == PRECIPITATION_NONE {
        return None;
    }
    Some(
        PRECIPITATION_TABLE
            .get(&code)
            .copied()
            .unwrap_or(PrecipitationKind::Unknown(code)),
    )
}
