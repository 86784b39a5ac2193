//! Per-user conversation state
//!
//! A [`SessionContext`] holds the styling profile, the selected location
//! and target date, and the chat history. It is owned by the caller and
//! passed explicitly to every turn.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, Role};
use crate::forecast::LocationQuery;
use crate::{Result, StyleError, regions};

/// Furthest day ahead a forecast may be requested for
pub const MAX_FORECAST_DAYS: i64 = 5;

/// Assistant message every session starts with
pub const GREETING: &str = "안녕하세요! 당신만의 스타일리스트가 되어드릴게요. 어떤 도움이 필요하세요?";

/// Canned questions offered as shortcuts
pub const QUICK_PROMPTS: [&str; 3] = ["오늘 뭐 입지? 👕", "주말 데이트룩 추천 💖", "소개팅룩 추천해줘 ✨"];

const DEFAULT_AGE: &str = "20대";
const DEFAULT_TPO: &str = "일상";

/// Defines a profile choice enum with Korean labels and lenient parsing
macro_rules! profile_choice {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = StyleError;

            fn from_str(s: &str) -> Result<Self> {
                let needle = s.trim();
                $(
                    if needle == $label
                        || needle.eq_ignore_ascii_case(stringify!($variant))
                        $(|| needle == $alias || needle.eq_ignore_ascii_case($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(StyleError::validation(format!(
                    "Unknown {} '{}'. Choose one of: {}",
                    stringify!($name),
                    needle,
                    $name::ALL.iter().map(|v| v.label()).collect::<Vec<_>>().join(", ")
                )))
            }
        }
    };
}

profile_choice! {
    Gender {
        Female => "여성" | "f",
        Male => "남성" | "m",
    }
}

profile_choice! {
    StylePreference {
        Casual => "캐주얼",
        Minimal => "미니멀",
        Street => "스트릿",
        Formal => "포멀",
        Vintage => "빈티지",
        Sporty => "스포티",
    }
}

profile_choice! {
    PersonalColor {
        Unknown => "모름" | "none",
        SpringWarm => "봄 웜톤 (Spring Warm)" | "봄 웜톤" | "spring",
        SummerCool => "여름 쿨톤 (Summer Cool)" | "여름 쿨톤" | "summer",
        AutumnWarm => "가을 웜톤 (Autumn Warm)" | "가을 웜톤" | "autumn",
        WinterCool => "겨울 쿨톤 (Winter Cool)" | "겨울 쿨톤" | "winter",
    }
}

/// Styling profile used to personalise advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Gender,
    /// Free-form age band, e.g. "20대"
    pub age: String,
    pub height_cm: Option<u16>,
    pub weight_kg: Option<u16>,
    pub style: StylePreference,
    /// Time, place and occasion, e.g. "주말 데이트"
    pub tpo: String,
    /// Preferred or avoided colours, free-form
    pub color_preference: Option<String>,
    pub personal_color: PersonalColor,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            gender: Gender::Female,
            age: DEFAULT_AGE.to_string(),
            height_cm: None,
            weight_kg: None,
            style: StylePreference::Casual,
            tpo: DEFAULT_TPO.to_string(),
            color_preference: None,
            personal_color: PersonalColor::Unknown,
        }
    }
}

/// TPO implied by a canned question
fn tpo_for_prompt(prompt: &str) -> &'static str {
    if prompt.contains("데이트") {
        "주말 데이트"
    } else if prompt.contains("소개팅") {
        "소개팅"
    } else {
        DEFAULT_TPO
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub profile: UserProfile,
    location: LocationQuery,
    target_date: NaiveDate,
    history: Vec<ChatMessage>,
}

impl SessionContext {
    /// Fresh session: default profile, Seoul as a whole, today, greeting
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            profile: UserProfile::default(),
            location: LocationQuery::Region {
                region: "서울".to_string(),
                district: Some(regions::ALL_DISTRICTS.to_string()),
            },
            target_date: today,
            history: vec![ChatMessage::new(Role::Assistant, GREETING)],
        }
    }

    #[must_use]
    pub fn location(&self) -> &LocationQuery {
        &self.location
    }

    #[must_use]
    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Choose the date to dress for, within today and the next few days
    pub fn set_target_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<()> {
        let last = today + Duration::days(MAX_FORECAST_DAYS);
        if date < today || date > last {
            return Err(StyleError::validation(format!(
                "Date {date} is out of range. Choose a date between {today} and {last}."
            )));
        }
        self.target_date = date;
        Ok(())
    }

    /// Select a catalogue region and optional district
    pub fn select_location(&mut self, region: &str, district: Option<&str>) -> Result<()> {
        let resolved = regions::resolve(region, district)?;
        let region = regions::find_region(region)?;
        let district = if resolved.label == region.name {
            regions::ALL_DISTRICTS.to_string()
        } else {
            resolved.site.name.to_string()
        };
        self.location = LocationQuery::Region {
            region: region.name.to_string(),
            district: Some(district),
        };
        Ok(())
    }

    /// Use a free-form location; catalogue names are validated first
    pub fn set_location(&mut self, query: LocationQuery) -> Result<()> {
        match query {
            LocationQuery::Region { region, district } => {
                self.select_location(&region, district.as_deref())
            }
            other => {
                self.location = other;
                Ok(())
            }
        }
    }

    /// Return the canned question at `index`, updating the TPO to match
    pub fn apply_quick_prompt(&mut self, index: usize) -> Result<&'static str> {
        let prompt = QUICK_PROMPTS.get(index).copied().ok_or_else(|| {
            StyleError::validation(format!(
                "Quick prompt {} does not exist. Choose 1-{}.",
                index + 1,
                QUICK_PROMPTS.len()
            ))
        })?;
        self.profile.tpo = tpo_for_prompt(prompt).to_string();
        Ok(prompt)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::new(Role::Assistant, content));
    }
}
