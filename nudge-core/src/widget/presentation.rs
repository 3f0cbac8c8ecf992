//! One running presentation of a survey

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::delivery::{DeliveryQueue, DeliverySession, QueueCallbacks, QueueConfig};
use crate::eligibility::HiddenFieldMap;
use crate::state::Survey;
use crate::transport::Transport;

type Handler = Arc<dyn Fn(bool) + Send + Sync>;

/// Error and finished handlers the rendering module registers after render
#[derive(Default)]
pub(crate) struct HandlerSlot {
    on_error: Mutex<Option<Handler>>,
    on_finished: Mutex<Option<Handler>>,
}

impl HandlerSlot {
    pub(crate) fn register(&self, on_error: Handler, on_finished: Handler) {
        *lock(&self.on_error) = Some(on_error);
        *lock(&self.on_finished) = Some(on_finished);
    }

    pub(crate) fn report_error(&self, value: bool) {
        let handler = lock(&self.on_error).clone();
        match handler {
            Some(f) => f(value),
            None if value => warn!("Error reported before the renderer registered a handler"),
            None => {}
        }
    }

    pub(crate) fn report_finished(&self, value: bool) {
        let handler = lock(&self.on_finished).clone();
        if let Some(f) = handler {
            f(value);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State owned by a single trigger, from render until close
pub struct Presentation {
    id: u64,
    survey: Survey,
    action: Option<String>,
    language_code: String,
    hidden_fields: HiddenFieldMap,
    session: Arc<Mutex<DeliverySession>>,
    queue: DeliveryQueue,
    handlers: Arc<HandlerSlot>,
    response_recorded: AtomicBool,
}

impl Presentation {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        survey: Survey,
        action: Option<String>,
        language_code: String,
        hidden_fields: HiddenFieldMap,
        user_id: Option<String>,
        transport: Arc<dyn Transport>,
        queue_config: QueueConfig,
    ) -> Self {
        let session = DeliverySession::new(&survey.id, user_id);
        let shared = Arc::new(Mutex::new(session.clone()));
        let handlers = Arc::new(HandlerSlot::default());

        let callbacks = {
            let on_failed = Arc::clone(&handlers);
            let on_finished = Arc::clone(&handlers);
            let synced = Arc::clone(&shared);
            QueueCallbacks::new()
                .on_failed(move |_| on_failed.report_error(true))
                .on_finished(move || on_finished.report_finished(true))
                .on_session_update(move |queued| {
                    if let Err(e) = lock(&synced).absorb(queued) {
                        warn!(error = %e, "Could not sync session from delivery queue");
                    }
                })
        };
        let queue = DeliveryQueue::new(queue_config, transport, session, callbacks);

        Self {
            id,
            survey,
            action,
            language_code,
            hidden_fields,
            session: shared,
            queue,
            handlers,
            response_recorded: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Language the survey was rendered in
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn hidden_fields(&self) -> &HiddenFieldMap {
        &self.hidden_fields
    }

    /// Snapshot of the session
    pub fn session(&self) -> DeliverySession {
        lock(&self.session).clone()
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub(crate) fn handlers(&self) -> &HandlerSlot {
        &self.handlers
    }

    /// Apply `f` to the session and return the result
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut DeliverySession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    /// True the first time only
    pub(crate) fn claim_first_response(&self) -> bool {
        !self.response_recorded.swap(true, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presentation")
            .field("id", &self.id)
            .field("survey_id", &self.survey.id)
            .field("language_code", &self.language_code)
            .finish_non_exhaustive()
    }
}
