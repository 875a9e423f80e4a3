//! Bilingual Feedback Report
//!
//! Compiled once at the end of a session from the final [`LearnerProfile`].
//! The Arabic section re-labels the same values under Arabic keys; the content
//! itself is never translated.

use crate::profile::LearnerProfile;
use serde::{Deserialize, Serialize};

/// Rendered in place of any attribute the session never captured.
pub const NOT_AVAILABLE: &str = "N/A";

/// The content type the report is stored under.
pub const CONTENT_TYPE: &str = "application/json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnglishSection {
    #[serde(rename = "Goal")]
    pub goal: String,
    #[serde(rename = "Background")]
    pub background: String,
    #[serde(rename = "Estimated Level")]
    pub level: String,
    #[serde(rename = "Scenario Practiced")]
    pub scenario: String,
    #[serde(rename = "Strengths")]
    pub strengths: String,
    #[serde(rename = "Areas to Improve")]
    pub areas_to_improve: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArabicSection {
    #[serde(rename = "الهدف")]
    pub goal: String,
    #[serde(rename = "الخلفية")]
    pub background: String,
    #[serde(rename = "المستوى المتوقع")]
    pub level: String,
    #[serde(rename = "السيناريو")]
    pub scenario: String,
    #[serde(rename = "نقاط القوة")]
    pub strengths: String,
    #[serde(rename = "نقاط التحسين")]
    pub areas_to_improve: String,
}

impl From<&EnglishSection> for ArabicSection {
    fn from(english: &EnglishSection) -> Self {
        Self {
            goal: english.goal.clone(),
            background: english.background.clone(),
            level: english.level.clone(),
            scenario: english.scenario.clone(),
            strengths: english.strengths.clone(),
            areas_to_improve: english.areas_to_improve.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub english: EnglishSection,
    pub arabic: ArabicSection,
}

impl Report {
    /// Builds the report, rendering unset attributes as [`NOT_AVAILABLE`].
    pub fn compile(profile: &LearnerProfile) -> Self {
        let render = |field: &Option<String>| {
            field
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        let english = EnglishSection {
            goal: render(&profile.goal),
            background: render(&profile.background),
            level: render(&profile.level),
            scenario: render(&profile.scenario),
            strengths: render(&profile.strengths),
            areas_to_improve: render(&profile.areas_to_improve),
        };
        let arabic = ArabicSection::from(&english);
        Self { english, arabic }
    }

    /// Serializes the report as indented UTF-8 JSON. Arabic text is written
    /// literally, not as `\u` escapes.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// The storage key for a room's report: `<prefix>_<room>.json`.
    pub fn object_key(prefix: &str, room: &str) -> String {
        format!("{}_{}.json", prefix, room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn full_profile() -> LearnerProfile {
        LearnerProfile {
            goal: Some("job interview".into()),
            background: Some("engineer".into()),
            level: Some("70%".into()),
            scenario: Some("job interview roleplay".into()),
            strengths: Some("clear pronunciation".into()),
            areas_to_improve: Some("grammar tenses".into()),
        }
    }

    #[test]
    fn test_compile_full_profile() {
        let report = Report::compile(&full_profile());
        let value = serde_json::to_value(&report).unwrap();

        let english = value["english"].as_object().unwrap();
        let arabic = value["arabic"].as_object().unwrap();
        assert_eq!(english.len(), 6);
        assert_eq!(arabic.len(), 6);

        assert_eq!(english["Goal"], "job interview");
        assert_eq!(arabic["الهدف"], "job interview");
        assert_eq!(english["Estimated Level"], "70%");
        assert_eq!(arabic["المستوى المتوقع"], "70%");

        let mut english_values: Vec<&Value> = english.values().collect();
        let mut arabic_values: Vec<&Value> = arabic.values().collect();
        english_values.sort_by_key(|v| v.to_string());
        arabic_values.sort_by_key(|v| v.to_string());
        assert_eq!(english_values, arabic_values);
    }

    #[test]
    fn test_compile_renders_sentinel_for_unset_fields() {
        let mut profile = full_profile();
        profile.scenario = None;
        profile.level = None;

        let report = Report::compile(&profile);
        assert_eq!(report.english.scenario, NOT_AVAILABLE);
        assert_eq!(report.arabic.scenario, NOT_AVAILABLE);
        assert_eq!(report.english.level, "N/A");
        assert_eq!(report.arabic.level, "N/A");
        assert_eq!(report.english.goal, "job interview");

        let empty = Report::compile(&LearnerProfile::new());
        assert_eq!(empty.arabic.areas_to_improve, NOT_AVAILABLE);
    }

    #[test]
    fn test_json_keeps_arabic_literal() {
        let bytes = Report::compile(&full_profile()).to_json_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("\"نقاط القوة\": \"clear pronunciation\""));
        assert!(!text.contains("\\u"));
        assert!(text.starts_with("{\n  \"english\": {"));
    }

    #[test]
    fn test_object_key() {
        assert_eq!(
            Report::object_key("english_feedback_report", "room-42"),
            "english_feedback_report_room-42.json"
        );
    }
}
