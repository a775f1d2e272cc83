//! Fine-tune a pretrained encoder with a linear classifier on raw article text

/// Common model config and traits for text classification
pub mod model;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// Training
pub mod training;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use inference::infer;
pub use item::Item;
pub use model::{Config, Model, ModelConfig};
pub use training::train;
