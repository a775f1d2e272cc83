/// The forward pass contract shared by every trainable classifier
pub mod classifier;

/// Accuracy and loss over a data loader
pub mod evaluation;

/// The epoch loop
pub mod fit;

/// Learning rate reduction on plateaus
pub mod scheduler;

/// Dynamic loss scaling for reduced precision training
pub mod scaler;

/// Saving and loading trained models
pub mod artifacts;

pub use artifacts::Artifacts;
pub use classifier::{criterion, Classifier};
pub use evaluation::{evaluate, Evaluation};
pub use fit::{fit, Config as FitConfig, EpochSummary};
