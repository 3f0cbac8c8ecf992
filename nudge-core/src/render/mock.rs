//! In-process renderer for tests
//!
//! [`MockRenderer`] records every render call and keeps the hooks so a test
//! can play the part of the rendering module.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::request::RenderRequest;
use super::traits::{RendererSource, SurveyRenderer};
use crate::error::LoadError;
use crate::widget::RenderHooks;

/// Records render calls
#[derive(Default)]
pub struct MockRenderer {
    calls: Mutex<Vec<(RenderRequest, RenderHooks)>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_count(&self) -> usize {
        self.lock().len()
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.lock().iter().map(|(request, _)| request.clone()).collect()
    }

    /// Hooks of the most recent render call
    pub fn last_hooks(&self) -> Option<RenderHooks> {
        self.lock().last().map(|(_, hooks)| hooks.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(RenderRequest, RenderHooks)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SurveyRenderer for MockRenderer {
    fn render(&self, request: RenderRequest, hooks: RenderHooks) {
        self.lock().push((request, hooks));
    }
}

/// Source that always hands out the same renderer
pub struct StaticSource {
    renderer: Arc<dyn SurveyRenderer>,
    fetches: AtomicUsize,
    failures: AtomicUsize,
    latency: Duration,
}

impl StaticSource {
    pub fn new(renderer: Arc<dyn SurveyRenderer>) -> Self {
        Self {
            renderer,
            fetches: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `count` fetches fail
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RendererSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<Arc<dyn SurveyRenderer>, LoadError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LoadError::Fetch {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(Arc::clone(&self.renderer))
    }
}
