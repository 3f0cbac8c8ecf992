//! Eligibility decisions over state snapshots
//!
//! - [`DisplayGate`] - probabilistic display gating
//! - [`select_language`] - which language variant to render
//! - [`filter_surveys`] - which surveys currently qualify
//! - [`merge_hidden_fields`] - which hidden field values travel with a response

mod filter;
mod gate;
mod hidden;
mod language;

pub use filter::{AllowAll, EnvironmentPolicy, PolicyContext, RecontactPolicy, filter_surveys};
pub use gate::DisplayGate;
pub use hidden::{HiddenFieldMap, merge_hidden_fields};
pub use language::{DEFAULT_LANGUAGE, LANGUAGE_ATTRIBUTE, default_language_code, select_language};
