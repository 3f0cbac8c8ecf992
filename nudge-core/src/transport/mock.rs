//! Mock transport for testing
//!
//! MockTransport lets tests script the outcome of each call and inspect
//! every call made, in order. Calls with no scripted outcome succeed.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::traits::{
    DisplayCreated, DisplayRequest, FileUpload, SubmissionContext, SubmissionReceipt, Transport,
    UploadConfig,
};
use crate::delivery::QueuedResponseUpdate;
use crate::error::TransportError;

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    CreateDisplay(DisplayRequest),
    SubmitResponse {
        update: QueuedResponseUpdate,
        context: SubmissionContext,
    },
    UploadFile {
        file: FileUpload,
        config: UploadConfig,
    },
}

#[derive(Default)]
struct MockState {
    displays: VecDeque<Result<DisplayCreated, TransportError>>,
    submissions: VecDeque<Result<(), TransportError>>,
    uploads: VecDeque<Result<String, TransportError>>,
    calls: Vec<TransportCall>,
}

/// Scripted implementation of [`Transport`]
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::default(),
            latency,
        }
    }

    /// Queue the outcome of the next `create_display`
    pub fn queue_display(&self, outcome: Result<DisplayCreated, TransportError>) {
        self.lock().displays.push_back(outcome);
    }

    /// Queue the outcome of the next `submit_response`
    pub fn queue_submission(&self, outcome: Result<(), TransportError>) {
        self.lock().submissions.push_back(outcome);
    }

    /// Make the next `count` submissions fail with `error` (convenience method)
    pub fn fail_submissions(&self, count: usize, error: TransportError) {
        let mut state = self.lock();
        for _ in 0..count {
            state.submissions.push_back(Err(error.clone()));
        }
    }

    /// Queue the outcome of the next `upload_file`
    pub fn queue_upload(&self, outcome: Result<String, TransportError>) {
        self.lock().uploads.push_back(outcome);
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Updates passed to `submit_response`, including failed attempts
    pub fn submitted_updates(&self) -> Vec<QueuedResponseUpdate> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SubmitResponse { update, .. } => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contexts passed to `submit_response`, including failed attempts
    pub fn submitted_contexts(&self) -> Vec<SubmissionContext> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SubmitResponse { context, .. } => Some(context.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submission_count(&self) -> usize {
        self.submitted_updates().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_display(
        &self,
        request: &DisplayRequest,
    ) -> Result<DisplayCreated, TransportError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.push(TransportCall::CreateDisplay(request.clone()));
        state.displays.pop_front().unwrap_or_else(|| {
            Ok(DisplayCreated {
                id: Uuid::new_v4().to_string(),
            })
        })
    }

    async fn submit_response(
        &self,
        update: &QueuedResponseUpdate,
        context: &SubmissionContext,
    ) -> Result<SubmissionReceipt, TransportError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.push(TransportCall::SubmitResponse {
            update: update.clone(),
            context: context.clone(),
        });
        state.submissions.pop_front().unwrap_or(Ok(()))?;

        let response_id = context
            .response_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(SubmissionReceipt { response_id })
    }

    async fn upload_file(
        &self,
        file: &FileUpload,
        config: &UploadConfig,
    ) -> Result<String, TransportError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.push(TransportCall::UploadFile {
            file: file.clone(),
            config: config.clone(),
        });
        state
            .uploads
            .pop_front()
            .unwrap_or_else(|| Ok(format!("https://files.invalid/{}", file.name)))
    }
}
