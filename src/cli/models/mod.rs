/// CLI Indexes: Model lookup
pub mod index;

/// CLI Indexes: BERT models
pub mod bert;

pub use index::{Model, ModelError};
