pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::Config;
pub use error::FilingError;
pub use events::{EventStatus, LifecycleEvent};
pub use types::*;
