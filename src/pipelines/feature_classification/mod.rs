//! Classify articles with a head trained on pooled encoder features

use std::collections::BTreeMap;

use crate::{
    models::heads::HeadConfig, pipelines::feature_extraction::Provenance,
    utils::scaling::FeatureScaler,
};

/// Batcher
pub mod batcher;

/// Training
pub mod training;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use inference::infer;
pub use training::train;

/// Everything needed to rebuild a trained head and feed it
#[derive(burn::config::Config, Debug)]
pub struct ModelConfig {
    /// The head architecture
    pub head: HeadConfig,

    /// The normalization fitted on the training table
    pub scaler: FeatureScaler,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// How the training features were extracted, repeated for prediction
    pub extraction: Provenance,
}
