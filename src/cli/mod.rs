use burn::backend::{Autodiff, LibTorch};

/// CLI Indexes: Models
pub mod models;

/// CLI Indexes: Pipelines
pub mod pipelines;

/// Layered configuration files
pub mod config;

/// The element type of the LibTorch backend
#[cfg(not(feature = "f16"))]
pub type ElemType = f32;

/// The element type of the LibTorch backend
#[cfg(feature = "f16")]
pub type ElemType = burn::tensor::f16;

/// The inference backend
pub type InferenceBackend = LibTorch<ElemType>;

/// The training backend
pub type TrainingBackend = Autodiff<InferenceBackend>;

/// Initialize logging, defaulting to the `info` level when `RUST_LOG` is unset
pub fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}
