//! Snapshot types for environment rules and person history
//!
//! Field names follow the camelCase JSON the collection API serves, so a
//! fetched environment or person payload deserializes directly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type SurveyId = String;

/// Where the survey modal is anchored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    BottomLeft,
    #[default]
    BottomRight,
    TopLeft,
    TopRight,
    Center,
}

/// Theme styling for the rendered survey
///
/// Only the two override switches are interpreted here; the theme values
/// themselves are passed through to the renderer untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styling {
    /// Product level: surveys may replace the product theme
    #[serde(default)]
    pub allow_style_overwrite: bool,

    /// Survey level: this survey replaces the product theme
    #[serde(default)]
    pub overwrite_theme_styling: bool,

    #[serde(flatten)]
    pub theme: serde_json::Map<String, Value>,
}

/// Product-wide display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub click_outside_close: bool,
    #[serde(default)]
    pub dark_overlay: bool,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub in_app_survey_branding: bool,
    /// Days to wait after any display before showing another survey
    #[serde(default)]
    pub recontact_days: Option<u32>,
    #[serde(default)]
    pub styling: Styling,
}

/// Per-survey replacements for product display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOverrides {
    #[serde(default)]
    pub click_outside_close: Option<bool>,
    #[serde(default)]
    pub dark_overlay: Option<bool>,
    #[serde(default)]
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub code: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A language a survey is translated into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyLanguage {
    pub language: Language,
    #[serde(default)]
    pub default: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Hidden fields a survey declares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenFields {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub field_ids: Vec<String>,
}

impl Default for HiddenFields {
    fn default() -> Self {
        Self {
            enabled: true,
            field_ids: Vec::new(),
        }
    }
}

/// How often a survey may be shown to the same person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayOption {
    DisplayOnce,
    #[default]
    DisplayMultiple,
    DisplaySome,
    RespondMultiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
}

/// A survey and its targeting rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: SurveyId,
    #[serde(default)]
    pub name: String,
    /// Share of triggers that show the survey, 0-100. Absent means always.
    #[serde(default)]
    pub display_percentage: Option<f64>,
    /// Seconds between trigger and hand-off to the renderer
    #[serde(default)]
    pub delay: u64,
    #[serde(default)]
    pub hidden_fields: HiddenFields,
    #[serde(default)]
    pub styling: Option<Styling>,
    #[serde(default)]
    pub product_overwrites: Option<ProductOverrides>,
    #[serde(default)]
    pub languages: Vec<SurveyLanguage>,
    #[serde(default)]
    pub display_option: DisplayOption,
    #[serde(default)]
    pub display_limit: Option<u32>,
    #[serde(default)]
    pub recontact_days: Option<u32>,
    #[serde(default)]
    pub segment: Option<Segment>,
    /// Question definitions, owned by the renderer
    #[serde(default)]
    pub questions: Value,
}

impl Survey {
    /// A survey with default rules, shown on every trigger
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_percentage: None,
            delay: 0,
            hidden_fields: HiddenFields::default(),
            styling: None,
            product_overwrites: None,
            languages: Vec::new(),
            display_option: DisplayOption::default(),
            display_limit: None,
            recontact_days: None,
            segment: None,
            questions: Value::Null,
        }
    }
}

/// Product settings and survey catalog as last fetched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub surveys: Vec<Survey>,
}

impl EnvironmentSnapshot {
    pub fn survey(&self, id: &str) -> Option<&Survey> {
        self.surveys.iter().find(|s| s.id == id)
    }
}

/// One past display of a survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub survey_id: SurveyId,
    pub created_at: DateTime<Utc>,
}

/// What is known about the current visitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSnapshot {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Surveys responded to, oldest first
    #[serde(default)]
    pub responses: Vec<SurveyId>,
    /// Surveys displayed, oldest first
    #[serde(default)]
    pub displays: Vec<DisplayRecord>,
    #[serde(default)]
    pub last_display_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub segments: Vec<String>,
}

impl PersonSnapshot {
    /// Copy of this snapshot with a display appended at the tail
    pub fn with_display(&self, survey_id: &str, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.displays.push(DisplayRecord {
            survey_id: survey_id.to_string(),
            created_at: at,
        });
        next.last_display_at = Some(at);
        next
    }

    /// Copy of this snapshot with a response appended at the tail
    pub fn with_response(&self, survey_id: &str) -> Self {
        let mut next = self.clone();
        next.responses.push(survey_id.to_string());
        next
    }

    pub fn has_responded(&self, survey_id: &str) -> bool {
        self.responses.iter().any(|id| id == survey_id)
    }

    pub fn display_count(&self, survey_id: &str) -> usize {
        self.displays
            .iter()
            .filter(|d| d.survey_id == survey_id)
            .count()
    }
}

/// Everything the engine reads: both snapshots plus the surveys they make eligible
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub environment: EnvironmentSnapshot,
    pub person: PersonSnapshot,
    #[serde(default)]
    pub filtered_surveys: Vec<SurveyId>,
}

impl ClientState {
    pub fn is_eligible(&self, survey_id: &str) -> bool {
        self.filtered_surveys.iter().any(|id| id == survey_id)
    }
}
