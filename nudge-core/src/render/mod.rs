//! Rendering module boundary, loader and request building

mod loader;
pub mod mock;
mod request;
mod styling;
mod traits;

pub use loader::RendererLoader;
pub use mock::{MockRenderer, StaticSource};
pub use request::RenderRequest;
pub use styling::{Chrome, resolve_chrome, resolve_styling};
pub use traits::{RendererSource, SurveyRenderer};
