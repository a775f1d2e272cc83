/// Model configuration
pub mod config;

/// Model definition
pub mod model;

pub use config::Config;
pub use model::{Model, ModelRecord};
