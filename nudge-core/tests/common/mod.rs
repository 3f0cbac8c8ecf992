//! Shared test utilities for nudge-core integration tests

use std::sync::Arc;

use nudge_core::render::{MockRenderer, StaticSource};
use nudge_core::state::{EnvironmentSnapshot, PersonSnapshot, StateStore, Survey};
use nudge_core::transport::MockTransport;
use nudge_core::{ClientConfig, SurveyWidget};

/// Widget wired to in-process doubles
pub struct Harness {
    pub widget: SurveyWidget,
    pub store: Arc<StateStore>,
    pub transport: Arc<MockTransport>,
    pub renderer: Arc<MockRenderer>,
    pub source: Arc<StaticSource>,
}

/// Config with immediate retries so tests never sleep
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::new("https://surveys.example.com", "env-test");
    config.retry_delay_ms = 0;
    config
}

#[allow(dead_code)]
pub fn harness(surveys: Vec<Survey>) -> Harness {
    harness_with_person(surveys, PersonSnapshot::default())
}

pub fn harness_with_person(surveys: Vec<Survey>, person: PersonSnapshot) -> Harness {
    let environment = EnvironmentSnapshot {
        surveys,
        ..Default::default()
    };
    let store = Arc::new(StateStore::new(environment, person));
    let transport = Arc::new(MockTransport::new());
    let renderer = Arc::new(MockRenderer::new());
    let source = Arc::new(StaticSource::new(renderer.clone()));
    let widget = SurveyWidget::new(test_config(), store.clone(), transport.clone(), source.clone());

    Harness {
        widget,
        store,
        transport,
        renderer,
        source,
    }
}
