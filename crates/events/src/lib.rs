//! Fire-and-forget notification channel for task lifecycle changes.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{Event, EventEnvelope};
