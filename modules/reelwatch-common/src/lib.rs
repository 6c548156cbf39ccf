pub mod config;
pub mod error;
pub mod lenient;
pub mod types;

pub use config::{Config, EngineConfig};
pub use error::ReelwatchError;
pub use types::*;
