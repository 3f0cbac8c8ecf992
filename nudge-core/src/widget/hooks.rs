//! Callbacks handed to the rendering module

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use super::SurveyWidget;
use super::presentation::Presentation;
use crate::delivery::{DeliverySession, QueuedResponseUpdate, ResponseMeta, ResponseUpdate};
use crate::eligibility::{DEFAULT_LANGUAGE, default_language_code};
use crate::error::{NudgeError, TransportError};
use crate::transport::{DisplayRequest, FileUpload, UploadConfig};

/// The rendering module's way back into the engine
///
/// Every hook is bound to the presentation it was created for.
#[derive(Clone)]
pub struct RenderHooks {
    widget: SurveyWidget,
    presentation: Arc<Presentation>,
}

impl RenderHooks {
    pub(crate) fn new(widget: SurveyWidget, presentation: Arc<Presentation>) -> Self {
        Self {
            widget,
            presentation,
        }
    }

    pub fn presentation(&self) -> &Arc<Presentation> {
        &self.presentation
    }

    /// First paint: record the display remotely and in the person history
    pub async fn on_display(&self) -> Result<(), NudgeError> {
        let survey_id = self.presentation.survey().id.clone();
        let request = DisplayRequest {
            survey_id: survey_id.clone(),
            user_id: self.widget.store().get().person.user_id.clone(),
        };

        let created = match self.widget.transport().create_display(&request).await {
            Ok(created) if !created.id.is_empty() => created,
            Ok(_) | Err(TransportError::Malformed(_)) => {
                error!(survey_id = %survey_id, "Display creation returned no id, closing survey");
                self.widget.close_presentation(self.presentation.id());
                return Err(NudgeError::MalformedDisplay { survey_id });
            }
            Err(e) => {
                warn!(survey_id = %survey_id, error = %e, "Could not create display");
                self.presentation.handlers().report_error(true);
                return Err(e.into());
            }
        };

        let session = self
            .presentation
            .with_session(|s| s.mark_displayed(&created.id).map(|()| s.clone()))?;
        self.presentation.queue().update_survey_state(&session)?;

        self.widget
            .store()
            .update_person(|person| person.with_display(&survey_id, Utc::now()));
        debug!(survey_id = %survey_id, display_id = %created.id, "Survey displayed");
        Ok(())
    }

    /// An answer or page was submitted
    pub fn on_response(&self, update: ResponseUpdate) {
        let survey = self.presentation.survey();
        let user_id = self.widget.store().get().person.user_id.clone();

        let session: DeliverySession = self.presentation.with_session(|s| {
            if let Some(user_id) = user_id {
                s.attach_user(user_id);
            }
            s.clone()
        });
        let queue = self.presentation.queue();
        if let Err(e) = queue.update_survey_state(&session) {
            warn!(error = %e, "Could not rebind delivery queue");
        }

        let language_code = if update.language == DEFAULT_LANGUAGE {
            default_language_code(survey)
                .unwrap_or(DEFAULT_LANGUAGE)
                .to_string()
        } else {
            update.language
        };

        queue.add(QueuedResponseUpdate {
            data: update.data,
            ttc: update.ttc,
            finished: update.finished,
            language_code,
            meta: ResponseMeta {
                url: self.widget.page_url(),
                action: self.presentation.action().map(str::to_string),
            },
            variables: update.variables,
            hidden_fields: self.presentation.hidden_fields().clone(),
            display_id: session.display_id().map(str::to_string),
        });

        if self.presentation.claim_first_response() {
            self.widget
                .store()
                .update_person(|person| person.with_response(&survey.id));
        }
    }

    /// The visitor closed the survey
    pub fn on_close(&self) {
        self.widget.close_presentation(self.presentation.id());
    }

    /// Upload a file picked in a file question, returning its URL
    pub async fn on_file_upload(
        &self,
        file: FileUpload,
        config: UploadConfig,
    ) -> Result<String, NudgeError> {
        let url = self.widget.transport().upload_file(&file, &config).await?;
        debug!(file = %file.name, "File uploaded");
        Ok(url)
    }

    /// The visitor asked to retry after a delivery failure
    pub fn on_retry(&self) {
        self.presentation.handlers().report_error(false);
        self.presentation.queue().retry();
    }

    /// Let the rendering module receive error and finished state changes
    pub fn register_handlers(
        &self,
        on_error: impl Fn(bool) + Send + Sync + 'static,
        on_finished: impl Fn(bool) + Send + Sync + 'static,
    ) {
        self.presentation
            .handlers()
            .register(Arc::new(on_error), Arc::new(on_finished));
    }
}

impl std::fmt::Debug for RenderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHooks")
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}
