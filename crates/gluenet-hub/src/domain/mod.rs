//! Domain layer: plain types with no I/O.

pub mod config;
pub mod events;

pub use config::HubConfig;
pub use events::{HubEvent, SessionKey};
