//! Language variant selection

use std::collections::BTreeMap;

use crate::state::Survey;

/// Language code meaning "the survey's own default language"
pub const DEFAULT_LANGUAGE: &str = "default";

/// Person attribute holding the visitor's chosen language
pub const LANGUAGE_ATTRIBUTE: &str = "language";

/// Pick the language to render `survey` in for a visitor with `attributes`.
///
/// Returns `None` when the survey is multilingual but does not offer the
/// visitor's language; the trigger must then be dropped rather than falling
/// back to the default.
pub fn select_language(survey: &Survey, attributes: &BTreeMap<String, String>) -> Option<String> {
    if survey.languages.len() <= 1 {
        return Some(DEFAULT_LANGUAGE.to_string());
    }

    let Some(wanted) = attributes.get(LANGUAGE_ATTRIBUTE) else {
        return Some(DEFAULT_LANGUAGE.to_string());
    };
    let wanted = wanted.to_lowercase();

    let selected = survey.languages.iter().find(|l| {
        l.language.code.to_lowercase() == wanted
            || l
                .language
                .alias
                .as_deref()
                .is_some_and(|alias| alias.to_lowercase() == wanted)
    })?;

    if selected.default {
        return Some(DEFAULT_LANGUAGE.to_string());
    }
    if !selected.enabled {
        return None;
    }
    Some(selected.language.code.clone())
}

/// Code of the language the survey marks as its default
pub fn default_language_code(survey: &Survey) -> Option<&str> {
    survey
        .languages
        .iter()
        .find(|l| l.default)
        .map(|l| l.language.code.as_str())
}
