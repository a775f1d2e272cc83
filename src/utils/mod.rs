/// File utilities
pub mod files;

/// Hugging Face utilities
pub mod hugging_face;

/// Tensor Utilities
pub mod tensors;

/// Utilities for classification tasks
pub mod classes;

/// Feature normalization
pub mod scaling;

/// Train / test splitting
pub mod split;

/// Device selection
pub mod device;
