//! Display orchestration
//!
//! [`SurveyWidget`] is the context object a host keeps per page: it owns the
//! single-flight slot (at most one survey on screen), the display gate and the
//! renderer loader, and it wires each presentation's session and queue to the
//! rendering module through [`RenderHooks`].

mod hooks;
mod presentation;

pub use hooks::RenderHooks;
pub use presentation::Presentation;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::delivery::DeliverySession;
use crate::eligibility::{DisplayGate, HiddenFieldMap, merge_hidden_fields, select_language};
use crate::error::NudgeError;
use crate::render::{RenderRequest, RendererLoader, RendererSource};
use crate::state::{StateStore, Survey};
use crate::transport::Transport;

/// Extra data a host passes along with a trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProperties {
    #[serde(default)]
    pub hidden_fields: Option<HiddenFieldMap>,
}

/// Why a trigger did not show anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRejection {
    /// Lost the display percentage roll
    DisplayPercentage,
    /// Another survey holds the slot
    AlreadyRunning,
    /// Survey is not offered in the visitor's language
    UnsupportedLanguage,
    /// Closed while the renderer was loading
    Cancelled,
}

/// Result of a trigger that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Rendered { presentation_id: u64 },
    Scheduled { presentation_id: u64, delay: Duration },
    Skipped(PolicyRejection),
}

enum ActiveSlot {
    Idle,
    Reserved(u64),
    Running(Arc<Presentation>),
}

impl ActiveSlot {
    fn holds(&self, id: u64) -> bool {
        match self {
            ActiveSlot::Idle => false,
            ActiveSlot::Reserved(reserved) => *reserved == id,
            ActiveSlot::Running(presentation) => presentation.id() == id,
        }
    }
}

struct WidgetInner {
    config: ClientConfig,
    store: Arc<StateStore>,
    transport: Arc<dyn Transport>,
    loader: RendererLoader,
    gate: Mutex<DisplayGate>,
    active: Mutex<ActiveSlot>,
    next_id: AtomicU64,
    page_url: Mutex<Option<String>>,
}

impl WidgetInner {
    fn active(&self) -> MutexGuard<'_, ActiveSlot> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the single-flight slot for one trigger until committed
///
/// Dropping an uncommitted guard frees the slot.
struct ActivationGuard<'a> {
    inner: &'a WidgetInner,
    id: u64,
    armed: bool,
}

impl<'a> ActivationGuard<'a> {
    fn acquire(inner: &'a WidgetInner) -> Option<Self> {
        let mut slot = inner.active();
        if !matches!(*slot, ActiveSlot::Idle) {
            return None;
        }
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = ActiveSlot::Reserved(id);
        Some(Self {
            inner,
            id,
            armed: true,
        })
    }

    /// Turn the reservation into a running presentation; false if it was closed meanwhile
    fn commit(mut self, presentation: Arc<Presentation>) -> bool {
        self.armed = false;
        let mut slot = self.inner.active();
        if matches!(*slot, ActiveSlot::Reserved(id) if id == self.id) {
            *slot = ActiveSlot::Running(presentation);
            true
        } else {
            false
        }
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.inner.active();
        if matches!(*slot, ActiveSlot::Reserved(id) if id == self.id) {
            *slot = ActiveSlot::Idle;
            debug!(presentation_id = self.id, "Released survey slot");
        }
    }
}

/// Orchestrates survey presentations for one page
///
/// Cloning is cheap; clones share the same slot and state.
#[derive(Clone)]
pub struct SurveyWidget {
    inner: Arc<WidgetInner>,
}

impl SurveyWidget {
    pub fn new(
        config: ClientConfig,
        store: Arc<StateStore>,
        transport: Arc<dyn Transport>,
        source: Arc<dyn RendererSource>,
    ) -> Self {
        let loader = RendererLoader::new(source, config.renderer_url());
        Self {
            inner: Arc::new(WidgetInner {
                config,
                store,
                transport,
                loader,
                gate: Mutex::new(DisplayGate::new()),
                active: Mutex::new(ActiveSlot::Idle),
                next_id: AtomicU64::new(0),
                page_url: Mutex::new(None),
            }),
        }
    }

    /// Replace the display gate, e.g. with a seeded one
    pub fn with_display_gate(self, gate: DisplayGate) -> Self {
        *self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner) = gate;
        self
    }

    /// URL recorded in the meta of every response update
    pub fn set_page_url(&self, url: impl Into<String>) {
        *self.inner.page_url.lock().unwrap_or_else(PoisonError::into_inner) = Some(url.into());
    }

    pub fn page_url(&self) -> Option<String> {
        self.inner
            .page_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Try to show `survey`
    ///
    /// Policy rejections are not errors; they come back as
    /// [`TriggerOutcome::Skipped`]. The slot is freed on every path that does
    /// not end in a rendered or scheduled presentation.
    pub async fn trigger(
        &self,
        survey: &Survey,
        action: Option<&str>,
        properties: Option<&TrackProperties>,
    ) -> Result<TriggerOutcome, NudgeError> {
        let percentage = survey.display_percentage.unwrap_or(100.0);
        let show = self
            .inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_display(percentage);
        if !show {
            debug!(survey = %survey.name, "Survey display skipped based on display percentage");
            return Ok(TriggerOutcome::Skipped(PolicyRejection::DisplayPercentage));
        }

        let hidden_fields = merge_hidden_fields(
            &survey.hidden_fields,
            properties.and_then(|p| p.hidden_fields.as_ref()),
        );

        let Some(guard) = ActivationGuard::acquire(&self.inner) else {
            debug!("A survey is already running, skipping");
            return Ok(TriggerOutcome::Skipped(PolicyRejection::AlreadyRunning));
        };

        let state = self.inner.store.get();
        let Some(language_code) = select_language(survey, &state.person.attributes) else {
            debug!(survey = %survey.name, "Survey is not available in the requested language");
            return Ok(TriggerOutcome::Skipped(PolicyRejection::UnsupportedLanguage));
        };

        let presentation = Arc::new(Presentation::new(
            guard.id,
            survey.clone(),
            action.map(str::to_string),
            language_code.clone(),
            hidden_fields.clone(),
            state.person.user_id.clone(),
            Arc::clone(&self.inner.transport),
            self.inner.config.queue_config(),
        ));
        let request = RenderRequest::new(
            &state.environment.product,
            survey,
            language_code,
            hidden_fields,
        );

        let renderer = self.inner.loader.load().await?;

        let presentation_id = guard.id;
        if !guard.commit(Arc::clone(&presentation)) {
            debug!(presentation_id, "Survey closed while the renderer was loading");
            return Ok(TriggerOutcome::Skipped(PolicyRejection::Cancelled));
        }
        let hooks = RenderHooks::new(self.clone(), presentation);

        if survey.delay == 0 {
            info!(survey = %survey.name, presentation_id, "Rendering survey");
            renderer.render(request, hooks);
            return Ok(TriggerOutcome::Rendered { presentation_id });
        }

        let delay = Duration::from_secs(survey.delay);
        debug!(survey = %survey.name, delay_secs = survey.delay, "Delaying survey");
        let widget = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if widget.is_active(presentation_id) {
                info!(presentation_id, "Rendering delayed survey");
                renderer.render(request, hooks);
            } else {
                debug!(presentation_id, "Dropping delayed survey, it is no longer active");
            }
        });
        Ok(TriggerOutcome::Scheduled {
            presentation_id,
            delay,
        })
    }

    /// Close whatever is showing and recompute eligibility
    ///
    /// Safe to call when nothing is running.
    pub fn close(&self) {
        *self.inner.active() = ActiveSlot::Idle;
        self.inner.store.refresh_eligibility();
        debug!("Survey closed");
    }

    /// Close presentation `id` if it still holds the slot; always recompute eligibility
    pub(crate) fn close_presentation(&self, id: u64) {
        {
            let mut slot = self.inner.active();
            if slot.holds(id) {
                *slot = ActiveSlot::Idle;
            }
        }
        self.inner.store.refresh_eligibility();
        debug!(presentation_id = id, "Presentation closed");
    }

    pub fn is_running(&self) -> bool {
        !matches!(*self.inner.active(), ActiveSlot::Idle)
    }

    fn is_active(&self, id: u64) -> bool {
        self.inner.active().holds(id)
    }

    /// The presentation holding the slot, once rendering has started
    pub fn active_presentation(&self) -> Option<Arc<Presentation>> {
        match &*self.inner.active() {
            ActiveSlot::Running(presentation) => Some(Arc::clone(presentation)),
            _ => None,
        }
    }

    pub fn active_session(&self) -> Option<DeliverySession> {
        self.active_presentation().map(|p| p.session())
    }
}

impl std::fmt::Debug for SurveyWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyWidget")
            .field("environment_id", &self.inner.config.environment_id)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
