//! Hidden field merging

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::state::HiddenFields;

/// Hidden field values keyed by field id
pub type HiddenFieldMap = BTreeMap<String, Value>;

/// Keep the supplied values the survey declares, drop the rest.
///
/// Declared fields without a supplied value stay absent; nothing is defaulted.
pub fn merge_hidden_fields(
    declared: &HiddenFields,
    supplied: Option<&HiddenFieldMap>,
) -> HiddenFieldMap {
    let Some(supplied) = supplied else {
        return HiddenFieldMap::new();
    };

    if !declared.enabled {
        if !supplied.is_empty() {
            warn!("Hidden fields are not enabled for this survey");
        }
        return HiddenFieldMap::new();
    }

    let mut merged = HiddenFieldMap::new();
    let mut unknown = Vec::new();
    for (key, value) in supplied {
        if declared.field_ids.iter().any(|id| id == key) {
            merged.insert(key.clone(), value.clone());
        } else {
            unknown.push(key.as_str());
        }
    }

    if !unknown.is_empty() {
        warn!(fields = ?unknown, "Dropping undeclared hidden fields");
    }

    merged
}
