//! Transport trait and request types
//!
//! The transport turns engine requests into calls against the collection API.
//! [`super::HttpTransport`] talks to a real server; [`super::MockTransport`]
//! scripts outcomes for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliverySession, QueuedResponseUpdate};
use crate::error::TransportError;

/// Request to record that a survey was shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRequest {
    pub survey_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayCreated {
    pub id: String,
}

/// Session identity a response update is submitted under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionContext {
    pub survey_id: String,
    pub display_id: Option<String>,
    /// `None` until the response exists remotely; the transport creates it then
    pub response_id: Option<String>,
    pub user_id: Option<String>,
}

impl From<&DeliverySession> for SubmissionContext {
    fn from(session: &DeliverySession) -> Self {
        Self {
            survey_id: session.survey_id().to_string(),
            display_id: session.display_id().map(str::to_string),
            response_id: session.response_id().map(str::to_string),
            user_id: session.user_id().map(str::to_string),
        }
    }
}

/// Outcome of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub response_id: String,
}

/// A file picked in a file-upload question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Data URL or plain base64 of the file contents
    pub base64: String,
}

/// Constraints the question puts on uploads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_file_extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_id: Option<String>,
}

/// Remote collection API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Record a display and return its id
    async fn create_display(&self, request: &DisplayRequest)
    -> Result<DisplayCreated, TransportError>;

    /// Create the response (no `response_id` in context) or update it
    async fn submit_response(
        &self,
        update: &QueuedResponseUpdate,
        context: &SubmissionContext,
    ) -> Result<SubmissionReceipt, TransportError>;

    /// Upload a file and return the URL it is served from
    async fn upload_file(
        &self,
        file: &FileUpload,
        config: &UploadConfig,
    ) -> Result<String, TransportError>;
}
