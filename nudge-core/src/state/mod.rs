//! Environment and person snapshots and the store that owns them

pub mod persist;
mod store;
mod types;

pub use store::StateStore;
pub use types::{
    ClientState, DisplayOption, DisplayRecord, EnvironmentSnapshot, HiddenFields, Language,
    PersonSnapshot, Placement, Product, ProductOverrides, Segment, Styling, Survey, SurveyId,
    SurveyLanguage,
};
