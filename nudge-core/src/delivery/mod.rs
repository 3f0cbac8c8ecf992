//! Delivery sessions and the response queue

mod queue;
mod session;
mod update;

pub use queue::{DeliveryQueue, QueueCallbacks, QueueConfig, QueueStatus};
pub use session::{AccumulatedResponse, DeliverySession, SessionState};
pub use update::{QueuedResponseUpdate, ResponseMeta, ResponseUpdate};
