//! Classifier heads over pooled encoder features

use burn::tensor::{activation::softmax, backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

/// Weight-normalized linear layers
pub mod weight_norm;

/// Feed-forward heads
pub mod dense;

/// Attention-augmented heads
pub mod attention;

/// Training behaviour of the heads
pub mod train;

pub use attention::{AttentionClassifier, AttentionClassifierConfig};
pub use dense::{DenseClassifier, DenseClassifierConfig, DenseStack};
pub use weight_norm::{WeightNormLinear, WeightNormLinearConfig};

/// A model mapping feature vectors to class logits
pub trait FeatureHead<B: Backend> {
    /// Compute logits
    ///
    /// # Shapes
    ///
    /// - features: `[batch_size, n_inputs]`
    /// - output: `[batch_size, n_outputs]`
    fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Compute class probabilities
    fn infer(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(features), 1)
    }
}

/// Which head to build, with its settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HeadConfig {
    /// A feed-forward head
    Dense(DenseClassifierConfig),

    /// A head with a self-attention block in front
    Attention(AttentionClassifierConfig),
}

impl HeadConfig {
    /// The expected feature width
    pub fn n_inputs(&self) -> usize {
        match self {
            HeadConfig::Dense(config) => config.n_inputs,
            HeadConfig::Attention(config) => config.n_inputs,
        }
    }

    /// The number of classes
    pub fn n_outputs(&self) -> usize {
        match self {
            HeadConfig::Dense(config) => config.n_outputs,
            HeadConfig::Attention(config) => config.n_outputs,
        }
    }
}

/// Head construction errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeadError {
    /// The attention heads do not tile the feature vector
    #[error(
        "attention heads ({n_heads}) times embed size ({embed_size}) must equal the input width ({n_inputs})"
    )]
    AttentionShape {
        /// The feature width
        n_inputs: usize,
        /// The number of attention heads
        n_heads: usize,
        /// The width of each head
        embed_size: usize,
    },
}
