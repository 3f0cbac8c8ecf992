//! Response update payloads

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::eligibility::HiddenFieldMap;

/// Page URL and trigger action a response was captured under
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// What the renderer reports after each answered question or page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseUpdate {
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    /// Time to complete per question, in milliseconds
    #[serde(default)]
    pub ttc: BTreeMap<String, u64>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// One entry of the delivery queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponseUpdate {
    pub data: BTreeMap<String, Value>,
    pub ttc: BTreeMap<String, u64>,
    pub finished: bool,
    pub language_code: String,
    pub meta: ResponseMeta,
    pub variables: BTreeMap<String, Value>,
    pub hidden_fields: HiddenFieldMap,
    pub display_id: Option<String>,
}

impl QueuedResponseUpdate {
    /// Answer data with hidden field values folded in, sent when the response is created
    pub fn data_with_hidden_fields(&self) -> BTreeMap<String, Value> {
        let mut data = self.data.clone();
        for (key, value) in &self.hidden_fields {
            data.insert(key.clone(), value.clone());
        }
        data
    }
}
