//! Memoized rendering module loader

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::traits::{RendererSource, SurveyRenderer};
use crate::error::LoadError;

/// Loads the rendering module once and hands out the cached instance
///
/// Concurrent callers wait on the same fetch. A failed fetch is not cached,
/// the next call tries again.
pub struct RendererLoader {
    source: Arc<dyn RendererSource>,
    url: String,
    cell: OnceCell<Arc<dyn SurveyRenderer>>,
}

impl RendererLoader {
    pub fn new(source: Arc<dyn RendererSource>, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn load(&self) -> Result<Arc<dyn SurveyRenderer>, LoadError> {
        let renderer = self
            .cell
            .get_or_try_init(|| async {
                debug!(url = %self.url, "Loading rendering module");
                self.source.fetch(&self.url).await.inspect_err(|e| {
                    warn!(error = %e, "Failed to load rendering module");
                })
            })
            .await?;
        Ok(Arc::clone(renderer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mock::{MockRenderer, StaticSource};

    #[tokio::test]
    async fn concurrent_loads_fetch_once() {
        let source = Arc::new(StaticSource::new(Arc::new(MockRenderer::new())));
        let loader = RendererLoader::new(source.clone(), "https://surveys.example.com/js/surveys.umd.cjs");

        let (a, b) = tokio::join!(loader.load(), loader.load());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(source.fetch_count(), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let source = Arc::new(StaticSource::new(Arc::new(MockRenderer::new())));
        source.fail_next(1);
        let loader = RendererLoader::new(source.clone(), "https://surveys.example.com/js/surveys.umd.cjs");

        assert!(loader.load().await.is_err());
        assert!(!loader.is_loaded());
        assert!(loader.load().await.is_ok());
        assert_eq!(source.fetch_count(), 2);
    }
}
