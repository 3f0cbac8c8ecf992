//! Ordered, retrying delivery of response updates
//!
//! One [`DeliveryQueue`] serves one delivery session. Updates are sent in the
//! order they were added with at most one submission in flight. A failing head
//! entry is retried up to the configured budget; after that the queue halts,
//! reports the failure once, and waits for [`DeliveryQueue::retry`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::session::DeliverySession;
use super::update::QueuedResponseUpdate;
use crate::error::SessionError;
use crate::transport::{SubmissionContext, Transport};

/// Retry budget and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Attempts allowed after the first failure before the queue halts
    pub retry_attempts: u32,
    /// Pause before an automatic retry
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

type FailedFn = Arc<dyn Fn(&QueuedResponseUpdate) + Send + Sync>;
type FinishedFn = Arc<dyn Fn() + Send + Sync>;
type SessionFn = Arc<dyn Fn(&DeliverySession) + Send + Sync>;

/// Callbacks the queue reports through
#[derive(Clone, Default)]
pub struct QueueCallbacks {
    on_failed: Option<FailedFn>,
    on_finished: Option<FinishedFn>,
    on_session_update: Option<SessionFn>,
}

impl QueueCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once each time the queue halts, with the entry left at the head
    pub fn on_failed(mut self, f: impl Fn(&QueuedResponseUpdate) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Arc::new(f));
        self
    }

    /// Called once, when the terminal update is accepted
    pub fn on_finished(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_finished = Some(Arc::new(f));
        self
    }

    /// Called after every accepted submission with the queue's session
    pub fn on_session_update(mut self, f: impl Fn(&DeliverySession) + Send + Sync + 'static) -> Self {
        self.on_session_update = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for QueueCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueCallbacks")
            .field("on_failed", &self.on_failed.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .field("on_session_update", &self.on_session_update.is_some())
            .finish()
    }
}

/// What the queue is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Nothing in flight; either empty or waiting for the next `add`
    Idle,
    /// A drain is running (including pauses between retries)
    Sending,
    /// Retry budget exhausted; waiting for `retry`
    Halted,
}

#[derive(Debug)]
struct Pending {
    update: QueuedResponseUpdate,
    failures: u32,
}

#[derive(Debug)]
struct QueueState {
    entries: VecDeque<Pending>,
    session: DeliverySession,
    in_flight: bool,
    halted: bool,
    finished_reported: bool,
}

struct Inner {
    config: QueueConfig,
    transport: Arc<dyn Transport>,
    callbacks: QueueCallbacks,
    state: Mutex<QueueState>,
    status: watch::Sender<QueueStatus>,
    /// Runtime the queue was built on; drains run here whatever thread calls `add`
    runtime: Option<Handle>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the drain slot if there is work and nobody holds it
    fn try_claim(&self, state: &mut QueueState) -> bool {
        if state.in_flight || state.halted || state.entries.is_empty() {
            return false;
        }
        state.in_flight = true;
        self.status.send_replace(QueueStatus::Sending);
        true
    }

    /// Run a claimed drain in the background
    ///
    /// Without a runtime the claim is given back and entries stay queued for
    /// the next `add`, `retry` or `process_queue` made from a runtime.
    fn spawn_drain(self: &Arc<Self>) {
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());
        match runtime {
            Some(handle) => {
                handle.spawn(drain(self.clone()));
            }
            None => {
                warn!("No Tokio runtime available, response updates stay queued");
                self.lock().in_flight = false;
                self.status.send_replace(QueueStatus::Idle);
            }
        }
    }
}

/// Serialized submission pipeline for one delivery session
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct DeliveryQueue {
    inner: Arc<Inner>,
}

impl DeliveryQueue {
    /// Build a queue bound to the current Tokio runtime, if there is one
    pub fn new(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
        session: DeliverySession,
        callbacks: QueueCallbacks,
    ) -> Self {
        let (status, _) = watch::channel(QueueStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                callbacks,
                state: Mutex::new(QueueState {
                    entries: VecDeque::new(),
                    session,
                    in_flight: false,
                    halted: false,
                    finished_reported: false,
                }),
                status,
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    /// Append an update and start draining in the background
    ///
    /// Safe to call from threads outside the runtime the queue was built on.
    pub fn add(&self, update: QueuedResponseUpdate) {
        let claimed = {
            let mut state = self.inner.lock();
            state.session.accumulate(&update);
            state.entries.push_back(Pending {
                update,
                failures: 0,
            });
            debug!(pending = state.entries.len(), "Response update queued");
            self.inner.try_claim(&mut state)
        };
        if claimed {
            self.inner.spawn_drain();
        }
    }

    /// Drain on the current task; returns at once if a drain is already running or the queue is halted
    pub async fn process_queue(&self) {
        let claimed = {
            let mut state = self.inner.lock();
            self.inner.try_claim(&mut state)
        };
        if claimed {
            drain(self.inner.clone()).await;
        }
    }

    /// Resume a halted queue with a fresh budget for the head entry
    pub fn retry(&self) {
        let claimed = {
            let mut state = self.inner.lock();
            if !state.halted {
                debug!("Retry requested while queue is not halted");
                return;
            }
            state.halted = false;
            if let Some(head) = state.entries.front_mut() {
                head.failures = 0;
            }
            self.inner.status.send_replace(QueueStatus::Idle);
            self.inner.try_claim(&mut state)
        };
        if claimed {
            self.inner.spawn_drain();
        }
    }

    /// Merge a newer view of the session into the one submissions are sent under
    ///
    /// Pending entries are left untouched.
    pub fn update_survey_state(&self, session: &DeliverySession) -> Result<(), SessionError> {
        self.inner.lock().session.absorb(session)
    }

    /// Current session as the queue sees it
    pub fn session(&self) -> DeliverySession {
        self.inner.lock().session.clone()
    }

    /// Number of entries not yet accepted
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_halted(&self) -> bool {
        self.inner.lock().halted
    }

    pub fn status(&self) -> QueueStatus {
        *self.inner.status.borrow()
    }

    /// Wait until no drain is running and return where the queue ended up
    pub async fn settled(&self) -> QueueStatus {
        let mut rx = self.inner.status.subscribe();
        match rx.wait_for(|status| *status != QueueStatus::Sending).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        }
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("DeliveryQueue")
            .field("config", &self.inner.config)
            .field("pending", &state.entries.len())
            .field("halted", &state.halted)
            .field("survey_id", &state.session.survey_id())
            .finish()
    }
}

/// Send entries head first until the queue is empty or halts
///
/// The caller must hold the drain slot (see `Inner::try_claim`).
async fn drain(inner: Arc<Inner>) {
    loop {
        let (update, context) = {
            let mut state = inner.lock();
            match state.entries.front() {
                Some(head) => (head.update.clone(), SubmissionContext::from(&state.session)),
                None => {
                    state.in_flight = false;
                    inner.status.send_replace(QueueStatus::Idle);
                    return;
                }
            }
        };

        match inner.transport.submit_response(&update, &context).await {
            Ok(receipt) => {
                let (session, finished_now) = {
                    let mut state = inner.lock();
                    state.entries.pop_front();
                    if let Err(e) = state.session.record_response(&receipt.response_id) {
                        warn!(error = %e, "Transport returned a different response id");
                    }
                    let mut finished_now = false;
                    if update.finished {
                        state.session.finish();
                        finished_now = !state.finished_reported;
                        state.finished_reported = true;
                    }
                    (state.session.clone(), finished_now)
                };

                debug!(
                    survey_id = %session.survey_id(),
                    response_id = %receipt.response_id,
                    finished = update.finished,
                    "Response update delivered"
                );
                if let Some(f) = &inner.callbacks.on_session_update {
                    f(&session);
                }
                if finished_now {
                    if let Some(f) = &inner.callbacks.on_finished {
                        f();
                    }
                }
            }
            Err(e) => {
                let failures = {
                    let mut guard = inner.lock();
                    let state = &mut *guard;
                    let failures = match state.entries.front_mut() {
                        Some(head) => {
                            head.failures += 1;
                            head.failures
                        }
                        None => 0,
                    };
                    if failures > inner.config.retry_attempts {
                        state.halted = true;
                        state.in_flight = false;
                        inner.status.send_replace(QueueStatus::Halted);
                    }
                    failures
                };

                if failures > inner.config.retry_attempts {
                    error!(
                        survey_id = %context.survey_id,
                        attempts = failures,
                        error = %e,
                        "Response delivery halted"
                    );
                    if let Some(f) = &inner.callbacks.on_failed {
                        f(&update);
                    }
                    return;
                }

                warn!(
                    survey_id = %context.survey_id,
                    attempt = failures,
                    error = %e,
                    "Response delivery failed, retrying"
                );
                if !inner.config.retry_delay.is_zero() {
                    tokio::time::sleep(inner.config.retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config(retry_attempts: u32) -> QueueConfig {
        QueueConfig {
            retry_attempts,
            retry_delay: Duration::ZERO,
        }
    }

    fn update(marker: &str, finished: bool) -> QueuedResponseUpdate {
        QueuedResponseUpdate {
            data: [(marker.to_string(), serde_json::json!(marker))].into(),
            finished,
            ..Default::default()
        }
    }

    fn queue_with(transport: Arc<MockTransport>, config: QueueConfig) -> DeliveryQueue {
        DeliveryQueue::new(
            config,
            transport,
            DeliverySession::new("s1", None),
            QueueCallbacks::new(),
        )
    }

    #[test]
    fn default_config_allows_two_retries() {
        let config = QueueConfig::default();
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn first_submission_creates_then_later_ones_update() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));

        queue.add(update("a", false));
        assert_eq!(queue.settled().await, QueueStatus::Idle);
        queue.add(update("b", true));
        assert_eq!(queue.settled().await, QueueStatus::Idle);

        let contexts = transport.submitted_contexts();
        assert!(contexts[0].response_id.is_none());
        assert!(contexts[1].response_id.is_some());
        assert!(queue.session().is_finished());
    }

    #[tokio::test]
    async fn failed_head_is_retried_automatically_within_budget() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_submissions(2, TransportError::Request("offline".to_string()));
        let queue = queue_with(transport.clone(), fast_config(2));

        queue.add(update("a", false));
        assert_eq!(queue.settled().await, QueueStatus::Idle);
        assert!(queue.is_empty());
        assert_eq!(transport.submission_count(), 3);
    }

    #[tokio::test]
    async fn halts_after_budget_and_reports_once() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_submissions(10, TransportError::Request("offline".to_string()));
        let failed = Arc::new(AtomicUsize::new(0));
        let counter = failed.clone();
        let queue = DeliveryQueue::new(
            fast_config(1),
            transport.clone(),
            DeliverySession::new("s1", None),
            QueueCallbacks::new().on_failed(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        queue.add(update("a", false));
        assert_eq!(queue.settled().await, QueueStatus::Halted);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert_eq!(transport.submission_count(), 2);
        assert_eq!(queue.len(), 1);

        // Adding while halted does not restart delivery
        queue.add(update("b", false));
        assert_eq!(queue.settled().await, QueueStatus::Halted);
        assert_eq!(transport.submission_count(), 2);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn retry_resumes_halted_queue() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_submissions(1, TransportError::Request("offline".to_string()));
        let queue = queue_with(transport.clone(), fast_config(0));

        queue.add(update("a", false));
        assert_eq!(queue.settled().await, QueueStatus::Halted);

        queue.retry();
        assert_eq!(queue.settled().await, QueueStatus::Idle);
        assert!(queue.is_empty());
        assert!(!queue.is_halted());
    }

    #[tokio::test]
    async fn add_from_plain_thread_drains_on_owning_runtime() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));

        let handle = queue.clone();
        let joined = std::thread::spawn(move || handle.add(update("a", true))).join();
        assert!(joined.is_ok());

        assert_eq!(queue.settled().await, QueueStatus::Idle);
        assert!(queue.is_empty());
        assert_eq!(transport.submission_count(), 1);
    }

    #[tokio::test]
    async fn retry_from_plain_thread_resumes() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_submissions(1, TransportError::Request("offline".to_string()));
        let queue = queue_with(transport.clone(), fast_config(0));

        queue.add(update("a", false));
        assert_eq!(queue.settled().await, QueueStatus::Halted);

        let handle = queue.clone();
        assert!(std::thread::spawn(move || handle.retry()).join().is_ok());
        assert_eq!(queue.settled().await, QueueStatus::Idle);
        assert!(queue.is_empty());
    }

    #[test]
    fn add_without_any_runtime_keeps_entry_queued() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));

        queue.add(update("a", false));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.status(), QueueStatus::Idle);
        assert_eq!(transport.submission_count(), 0);
    }

    #[tokio::test]
    async fn retry_on_running_queue_is_ignored() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));
        queue.retry();
        assert_eq!(queue.status(), QueueStatus::Idle);
        assert_eq!(transport.submission_count(), 0);
    }

    #[tokio::test]
    async fn process_queue_without_entries_returns() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));
        queue.process_queue().await;
        assert_eq!(transport.submission_count(), 0);
    }

    #[tokio::test]
    async fn survey_state_update_reaches_next_submission() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport.clone(), fast_config(2));

        let mut session = DeliverySession::new("s1", Some("u1".to_string()));
        session.mark_displayed("d1").unwrap();
        queue.update_survey_state(&session).unwrap();

        queue.add(update("a", false));
        queue.settled().await;

        let context = &transport.submitted_contexts()[0];
        assert_eq!(context.display_id.as_deref(), Some("d1"));
        assert_eq!(context.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn survey_state_for_other_survey_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let queue = queue_with(transport, fast_config(2));
        let other = DeliverySession::new("s2", None);
        assert!(queue.update_survey_state(&other).is_err());
        assert_eq!(queue.session().survey_id(), "s1");
    }
}
