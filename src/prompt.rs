//! Prompt assembly for the stylist model

use chrono::{Datelike, NaiveDate};

use crate::chat::ChatRequest;
use crate::models::ForecastSummary;
use crate::session::{PersonalColor, UserProfile};

const NOT_PROVIDED: &str = "정보 없음";

const SYSTEM_PROMPT: &str = "\
당신은 사용자의 개인 정보, TPO(시간, 장소, 상황), 패션 취향, 그리고 **퍼스널 컬러**를 깊이 이해하고 분석하여 현재 계절과 날씨에 맞는 패션을 추천하는 전문 AI 스타일리스트입니다.

1. 주어진 '현재 계절', '날씨 정보', '사용자 정보', 특히 **퍼스널 컬러**를 최우선으로 고려합니다. 퍼스널 컬러에 맞는 색상 조합을 적극적으로 제안해주세요.
2. 기온과 하늘 상태, 강수 여부에 맞춰 겉옷과 소재, 우산이나 방수 아이템이 필요한지 알려주세요.
3. '패션 추천' 섹션에서 사용자의 TPO와 선호 스타일에 맞춰, 상의, 하의, 겉옷, 액세서리 등을 조합하여 1~2가지의 완성된 착장을 제안합니다. 각 착장의 스타일과 분위기를 설명해주세요.
4. '스타일링 팁' 섹션에서 추천한 옷을 더 잘 소화할 수 있는 팁이나, 다른 아이템과 조합하는 방법을 추가로 제안합니다.
5. 모든 답변은 매우 친절하고, 전문적이며, 사용자의 자신감을 북돋아 주는 긍정적인 말투를 사용해주세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Season::Spring => "봄",
            Season::Summer => "여름",
            Season::Autumn => "가을",
            Season::Winter => "겨울",
        }
    }
}

/// Season of the date being dressed for
#[must_use]
pub fn season(date: NaiveDate) -> Season {
    Season::from_month(date.month())
}

fn or_not_provided(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { NOT_PROVIDED } else { value }
}

/// Bullet list describing the user
#[must_use]
pub fn profile_text(profile: &UserProfile) -> String {
    let mut text = format!(
        "- 성별: {}\n- 나이: {}\n- 선호 스타일: {}\n- TPO: {}\n",
        profile.gender.label(),
        or_not_provided(&profile.age),
        profile.style.label(),
        or_not_provided(&profile.tpo)
    );
    if let Some(height) = profile.height_cm {
        text.push_str(&format!("- 키: {height}cm\n"));
    }
    if let Some(weight) = profile.weight_kg {
        text.push_str(&format!("- 몸무게: {weight}kg\n"));
    }
    if let Some(color) = profile
        .color_preference
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        text.push_str(&format!("- 선호/기피 색상: {color}\n"));
    }
    if profile.personal_color != PersonalColor::Unknown {
        text.push_str(&format!(
            "- 퍼스널 컬러: {}\n",
            profile.personal_color.label()
        ));
    }
    text
}

/// Bullet list describing the forecast
#[must_use]
pub fn weather_text(summary: &ForecastSummary) -> String {
    let precipitation = match (summary.has_precipitation, summary.precipitation_kind) {
        (true, Some(kind)) => format!("있음 ({})", kind.label()),
        (true, None) => "있음".to_string(),
        (false, _) => "없음".to_string(),
    };
    format!(
        "- 지역: {}\n- 날짜: {}\n- 기온: {}\n- 하늘: {}\n- 강수: {}\n",
        summary.location,
        summary.date.format("%Y-%m-%d"),
        summary.temperature.format(),
        summary.sky.label(),
        precipitation
    )
}

#[must_use]
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// User message combining season, weather, profile and the request
#[must_use]
pub fn user_prompt(summary: &ForecastSummary, profile: &UserProfile, request: &str) -> String {
    format!(
        "현재 계절과 날씨, 아래 사용자 정보를 바탕으로, 요청에 맞는 패션 스타일을 추천해줘.\n\n\
         [현재 계절]\n{}\n\n\
         [날씨 정보]\n{}\n\
         [사용자 정보]\n{}\n\
         [사용자 요청]\n{}\n",
        season(summary.date).label(),
        weather_text(summary),
        profile_text(profile),
        request.trim()
    )
}

/// Full completion request for one turn
#[must_use]
pub fn build_request(summary: &ForecastSummary, profile: &UserProfile, request: &str) -> ChatRequest {
    ChatRequest {
        system: system_prompt().to_string(),
        user: user_prompt(summary, profile, request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrecipitationKind, SkyCondition, Temperature};
    use crate::session::{Gender, StylePreference};
    use rstest::rstest;

    fn summary() -> ForecastSummary {
        ForecastSummary {
            location: "서울 강남구".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            temperature: Temperature::Range {
                low: 9.0,
                high: 19.5,
            },
            sky: SkyCondition::MostlyCloudy,
            has_precipitation: true,
            precipitation_kind: Some(PrecipitationKind::Rain),
        }
    }

    #[rstest]
    #[case(1, Season::Winter)]
    #[case(3, Season::Spring)]
    #[case(5, Season::Spring)]
    #[case(6, Season::Summer)]
    #[case(8, Season::Summer)]
    #[case(9, Season::Autumn)]
    #[case(11, Season::Autumn)]
    #[case(12, Season::Winter)]
    fn test_season_from_month(#[case] month: u32, #[case] expected: Season) {
        assert_eq!(Season::from_month(month), expected);
    }

    #[test]
    fn test_default_profile_text() {
        let text = profile_text(&UserProfile::default());
        assert_eq!(text, "- 성별: 여성\n- 나이: 20대\n- 선호 스타일: 캐주얼\n- TPO: 일상\n");
    }

    #[test]
    fn test_profile_text_optional_fields() {
        let profile = UserProfile {
            gender: Gender::Male,
            age: "  ".to_string(),
            height_cm: Some(178),
            weight_kg: Some(70),
            style: StylePreference::Street,
            tpo: String::new(),
            color_preference: Some("파란색 선호".to_string()),
            personal_color: PersonalColor::SummerCool,
        };
        let text = profile_text(&profile);
        assert!(text.contains("- 나이: 정보 없음\n"));
        assert!(text.contains("- TPO: 정보 없음\n"));
        assert!(text.contains("- 키: 178cm\n"));
        assert!(text.contains("- 몸무게: 70kg\n"));
        assert!(text.contains("- 선호/기피 색상: 파란색 선호\n"));
        assert!(text.contains("- 퍼스널 컬러: 여름 쿨톤 (Summer Cool)\n"));
    }

    #[test]
    fn test_weather_text() {
        let text = weather_text(&summary());
        assert!(text.contains("- 지역: 서울 강남구"));
        assert!(text.contains("- 날짜: 2026-10-15"));
        assert!(text.contains("- 기온: 최저 9.0°C / 최고 19.5°C"));
        assert!(text.contains("- 하늘: 구름많음"));
        assert!(text.contains("- 강수: 있음 (비)"));

        let mut dry = summary();
        dry.has_precipitation = false;
        dry.temperature = Temperature::Unavailable;
        let text = weather_text(&dry);
        assert!(text.contains("- 강수: 없음"));
        assert!(text.contains("기온 정보 없음"));
    }

    #[test]
    fn test_user_prompt_sections_in_order() {
        let prompt = user_prompt(&summary(), &UserProfile::default(), "  주말 데이트룩 추천 💖 ");
        let positions: Vec<usize> = ["[현재 계절]\n가을", "[날씨 정보]", "[사용자 정보]", "[사용자 요청]\n주말 데이트룩 추천 💖\n"]
            .iter()
            .map(|section| prompt.find(section).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_build_request_uses_system_instruction() {
        let request = build_request(&summary(), &UserProfile::default(), "뭐 입지?");
        assert!(request.system.contains("퍼스널 컬러"));
        assert!(request.system.contains("1~2가지"));
        assert!(request.user.ends_with("뭐 입지?\n"));
    }
}
