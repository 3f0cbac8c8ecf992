//! Rendering module boundary

use std::sync::Arc;

use async_trait::async_trait;

use super::request::RenderRequest;
use crate::error::LoadError;
use crate::widget::RenderHooks;

/// A loaded rendering module
///
/// `render` hands control over and returns at once; the module reports back
/// through the hooks.
pub trait SurveyRenderer: Send + Sync {
    fn render(&self, request: RenderRequest, hooks: RenderHooks);
}

/// Where rendering modules are fetched from
#[async_trait]
pub trait RendererSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Arc<dyn SurveyRenderer>, LoadError>;
}
