//! Styling and UI chrome resolution

use crate::state::{Placement, Product, Styling, Survey};

/// Theme handed to the renderer
///
/// The survey's own styling wins only when the product allows overwrites and
/// the survey opts in.
pub fn resolve_styling(product: &Product, survey: &Survey) -> Styling {
    if !product.styling.allow_style_overwrite {
        return product.styling.clone();
    }

    match &survey.styling {
        Some(styling) if styling.overwrite_theme_styling => styling.clone(),
        _ => product.styling.clone(),
    }
}

/// Modal behaviour settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome {
    pub click_outside: bool,
    pub dark_overlay: bool,
    pub placement: Placement,
}

/// Survey overrides first, then product defaults
pub fn resolve_chrome(product: &Product, survey: &Survey) -> Chrome {
    let overrides = survey.product_overwrites.clone().unwrap_or_default();
    Chrome {
        click_outside: overrides
            .click_outside_close
            .unwrap_or(product.click_outside_close),
        dark_overlay: overrides.dark_overlay.unwrap_or(product.dark_overlay),
        placement: overrides.placement.unwrap_or(product.placement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProductOverrides;
    use serde_json::json;

    fn themed(brand: &str, overwrite: bool) -> Styling {
        let mut theme = serde_json::Map::new();
        theme.insert("brandColor".to_string(), json!(brand));
        Styling {
            allow_style_overwrite: overwrite,
            overwrite_theme_styling: overwrite,
            theme,
        }
    }

    #[test]
    fn product_styling_when_overwrite_not_allowed() {
        let product = Product {
            styling: themed("#000", false),
            ..Default::default()
        };
        let mut survey = Survey::new("s1", "Survey");
        survey.styling = Some(themed("#fff", true));

        assert_eq!(resolve_styling(&product, &survey).theme["brandColor"], "#000");
    }

    #[test]
    fn survey_styling_when_both_opt_in() {
        let product = Product {
            styling: themed("#000", true),
            ..Default::default()
        };
        let mut survey = Survey::new("s1", "Survey");
        survey.styling = Some(themed("#fff", true));

        assert_eq!(resolve_styling(&product, &survey).theme["brandColor"], "#fff");
    }

    #[test]
    fn survey_without_opt_in_keeps_product_styling() {
        let product = Product {
            styling: themed("#000", true),
            ..Default::default()
        };
        let mut survey = Survey::new("s1", "Survey");
        survey.styling = Some(themed("#fff", false));

        assert_eq!(resolve_styling(&product, &survey).theme["brandColor"], "#000");
    }

    #[test]
    fn chrome_prefers_survey_overrides() {
        let product = Product {
            click_outside_close: true,
            dark_overlay: false,
            placement: Placement::BottomRight,
            ..Default::default()
        };
        let mut survey = Survey::new("s1", "Survey");
        survey.product_overwrites = Some(ProductOverrides {
            dark_overlay: Some(true),
            placement: Some(Placement::Center),
            ..Default::default()
        });

        let chrome = resolve_chrome(&product, &survey);
        assert!(chrome.click_outside);
        assert!(chrome.dark_overlay);
        assert_eq!(chrome.placement, Placement::Center);
    }
}
