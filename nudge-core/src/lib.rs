//! nudge-core: in-app survey delivery engine
//!
//! This crate decides whether to show a survey to the current visitor, tracks
//! each presentation, and delivers partial and final responses in order:
//!
//! - **State** - [`StateStore`] holds the environment and person snapshots and the eligible survey list
//! - **Eligibility** - [`DisplayGate`], [`select_language`] and [`filter_surveys`]
//! - **Delivery** - [`DeliverySession`] and the retrying [`DeliveryQueue`]
//! - **Orchestration** - [`SurveyWidget`] triggers surveys and hands them to a renderer via [`RenderHooks`]
//! - **Transport** - [`Transport`] trait with [`HttpTransport`] and [`MockTransport`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use nudge_core::{
//!     ClientConfig, EnvironmentSnapshot, HttpTransport, MockRenderer, PersonSnapshot, StateStore,
//!     StaticSource, SurveyWidget,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://localhost:3000", "env-1");
//!     let store = Arc::new(StateStore::new(EnvironmentSnapshot::default(), PersonSnapshot::default()));
//!     let transport = Arc::new(HttpTransport::new(&config)?);
//!     let source = Arc::new(StaticSource::new(Arc::new(MockRenderer::new())));
//!
//!     let widget = SurveyWidget::new(config, store.clone(), transport, source);
//!     let state = store.get();
//!     if let Some(survey) = state.filtered_surveys.first().and_then(|id| state.environment.survey(id)) {
//!         widget.trigger(survey, Some("page_view"), None).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! trigger ──▶ DisplayGate ──▶ slot ──▶ language ──▶ RendererLoader ──▶ SurveyRenderer
//!                                                                          │ hooks
//!                  StateStore ◀── on_display / on_response ◀───────────────┘
//!                                              │
//!                                              ▼
//!                                DeliveryQueue ──▶ Transport
//! ```

pub mod config;
pub mod delivery;
pub mod eligibility;
pub mod error;
pub mod render;
pub mod state;
pub mod transport;
pub mod widget;

// Re-export key types for convenience
pub use config::ClientConfig;
pub use delivery::{
    AccumulatedResponse, DeliveryQueue, DeliverySession, QueueCallbacks, QueueConfig, QueueStatus,
    QueuedResponseUpdate, ResponseMeta, ResponseUpdate, SessionState,
};
pub use eligibility::{
    AllowAll, DisplayGate, EnvironmentPolicy, HiddenFieldMap, PolicyContext, RecontactPolicy,
    filter_surveys, merge_hidden_fields, select_language,
};
pub use error::{LoadError, NudgeError, SessionError, StateError, TransportError};
pub use render::{
    MockRenderer, RenderRequest, RendererLoader, RendererSource, StaticSource, SurveyRenderer,
};
pub use state::{ClientState, EnvironmentSnapshot, PersonSnapshot, StateStore, Survey};
pub use transport::{HttpTransport, MockTransport, Transport};
pub use widget::{
    PolicyRejection, Presentation, RenderHooks, SurveyWidget, TrackProperties, TriggerOutcome,
};
