//! Render request passed to the rendering module

use serde::Serialize;

use super::styling::{resolve_chrome, resolve_styling};
use crate::eligibility::HiddenFieldMap;
use crate::state::{Placement, Product, Styling, Survey};

/// Everything the renderer needs to show one survey
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub survey: Survey,
    pub is_branding_enabled: bool,
    pub click_outside: bool,
    pub dark_overlay: bool,
    pub placement: Placement,
    pub language_code: String,
    pub styling: Styling,
    #[serde(rename = "hiddenFieldsRecord")]
    pub hidden_fields: HiddenFieldMap,
}

impl RenderRequest {
    pub fn new(
        product: &Product,
        survey: &Survey,
        language_code: impl Into<String>,
        hidden_fields: HiddenFieldMap,
    ) -> Self {
        let chrome = resolve_chrome(product, survey);
        Self {
            survey: survey.clone(),
            is_branding_enabled: product.in_app_survey_branding,
            click_outside: chrome.click_outside,
            dark_overlay: chrome.dark_overlay,
            placement: chrome.placement,
            language_code: language_code.into(),
            styling: resolve_styling(product, survey),
            hidden_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_takes_branding_from_product() {
        let product = Product {
            in_app_survey_branding: true,
            placement: Placement::TopLeft,
            ..Default::default()
        };
        let survey = Survey::new("s1", "Survey");
        let hidden = HiddenFieldMap::from([("plan".to_string(), json!("pro"))]);

        let request = RenderRequest::new(&product, &survey, "default", hidden);
        assert!(request.is_branding_enabled);
        assert_eq!(request.placement, Placement::TopLeft);
        assert_eq!(request.language_code, "default");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["hiddenFieldsRecord"]["plan"], "pro");
        assert_eq!(json["placement"], "topLeft");
    }
}
