//! HTTP transport against the client collection API.
//!
//! Endpoints, relative to `{api_host}/api/v1/client/{environment_id}`:
//!
//! | Call                  | Method | Path               |
//! |-----------------------|--------|--------------------|
//! | create display        | POST   | `/displays`        |
//! | create response       | POST   | `/responses`       |
//! | update response       | PUT    | `/responses/{id}`  |
//! | request upload target | POST   | `/storage`         |
//!
//! Every answer is wrapped as `{ "data": ... }`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::traits::{
    DisplayCreated, DisplayRequest, FileUpload, SubmissionContext, SubmissionReceipt, Transport,
    UploadConfig,
};
use crate::config::ClientConfig;
use crate::delivery::{QueuedResponseUpdate, ResponseMeta};
use crate::eligibility::HiddenFieldMap;
use crate::error::TransportError;

// ────────────────────────────────────────────────────────────────────────────
// API payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct IdData {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponseBody<'a> {
    survey_id: &'a str,
    user_id: Option<&'a str>,
    display_id: Option<&'a str>,
    finished: bool,
    data: BTreeMap<String, Value>,
    ttc: &'a BTreeMap<String, u64>,
    language: &'a str,
    meta: &'a ResponseMeta,
    variables: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponseBody<'a> {
    finished: bool,
    data: &'a BTreeMap<String, Value>,
    ttc: &'a BTreeMap<String, u64>,
    language: &'a str,
    meta: &'a ResponseMeta,
    variables: &'a BTreeMap<String, Value>,
    hidden_fields: &'a HiddenFieldMap,
    display_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageRequestBody<'a> {
    file_name: &'a str,
    file_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    survey_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_file_extensions: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageTarget {
    signed_url: String,
    file_url: String,
    #[serde(default)]
    updated_file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    file_base64: &'a str,
    file_name: &'a str,
    file_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    survey_id: Option<&'a str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Transport
// ────────────────────────────────────────────────────────────────────────────

/// [`Transport`] backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &ClientConfig, client: reqwest::Client) -> Result<Self, TransportError> {
        let host = Url::parse(&config.api_host)
            .map_err(|e| TransportError::InvalidHost(format!("{}: {}", config.api_host, e)))?;
        let base_url = format!(
            "{}/api/v1/client/{}",
            host.as_str().trim_end_matches('/'),
            config.environment_id
        );
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_data<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        Ok(envelope.data)
    }

    fn require_id(data: IdData, what: &str) -> Result<String, TransportError> {
        data.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TransportError::Malformed(format!("{} answered without an id", what)))
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request(e.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_display(
        &self,
        request: &DisplayRequest,
    ) -> Result<DisplayCreated, TransportError> {
        let response = self
            .client
            .post(self.endpoint("displays"))
            .json(request)
            .send()
            .await
            .map_err(request_error)?;

        let data: IdData = Self::read_data(response).await?;
        let id = Self::require_id(data, "display creation")?;
        debug!(survey_id = %request.survey_id, display_id = %id, "Display created");
        Ok(DisplayCreated { id })
    }

    async fn submit_response(
        &self,
        update: &QueuedResponseUpdate,
        context: &SubmissionContext,
    ) -> Result<SubmissionReceipt, TransportError> {
        match &context.response_id {
            None => {
                let body = CreateResponseBody {
                    survey_id: &context.survey_id,
                    user_id: context.user_id.as_deref(),
                    display_id: context.display_id.as_deref().or(update.display_id.as_deref()),
                    finished: update.finished,
                    data: update.data_with_hidden_fields(),
                    ttc: &update.ttc,
                    language: &update.language_code,
                    meta: &update.meta,
                    variables: &update.variables,
                };
                let response = self
                    .client
                    .post(self.endpoint("responses"))
                    .json(&body)
                    .send()
                    .await
                    .map_err(request_error)?;

                let data: IdData = Self::read_data(response).await?;
                let response_id = Self::require_id(data, "response creation")?;
                debug!(survey_id = %context.survey_id, response_id = %response_id, "Response created");
                Ok(SubmissionReceipt { response_id })
            }
            Some(response_id) => {
                let body = UpdateResponseBody {
                    finished: update.finished,
                    data: &update.data,
                    ttc: &update.ttc,
                    language: &update.language_code,
                    meta: &update.meta,
                    variables: &update.variables,
                    hidden_fields: &update.hidden_fields,
                    display_id: context.display_id.as_deref(),
                };
                let response = self
                    .client
                    .put(self.endpoint(&format!("responses/{}", response_id)))
                    .json(&body)
                    .send()
                    .await
                    .map_err(request_error)?;

                let _: Value = Self::read_data(response).await?;
                Ok(SubmissionReceipt {
                    response_id: response_id.clone(),
                })
            }
        }
    }

    async fn upload_file(
        &self,
        file: &FileUpload,
        config: &UploadConfig,
    ) -> Result<String, TransportError> {
        let body = StorageRequestBody {
            file_name: &file.name,
            file_type: &file.mime_type,
            survey_id: config.survey_id.as_deref(),
            allowed_file_extensions: config.allowed_file_extensions.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint("storage"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let target: StorageTarget = Self::read_data(response).await?;

        let upload = UploadBody {
            file_base64: &file.base64,
            file_name: target.updated_file_name.as_deref().unwrap_or(&file.name),
            file_type: &file.mime_type,
            survey_id: config.survey_id.as_deref(),
        };
        let response = self
            .client
            .post(&target.signed_url)
            .json(&upload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(target.file_url)
    }
}
