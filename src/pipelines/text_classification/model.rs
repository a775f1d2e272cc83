use std::{collections::BTreeMap, path::Path};

use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use crate::training::Classifier;

use super::batcher::{Infer, Train};

/// The common model configuration properties needed for the pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// The padding token ID
    pub pad_token_id: usize,

    /// Maximum sequence length for tokenized text
    pub max_seq_length: usize,

    /// The size of the hidden state
    pub hidden_size: usize,

    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,
}

/// A trait for models that can be used for Text Classification
pub trait Model<B: Backend>: Module<B> + Classifier<B, Train<B>> + Sized {
    /// The model configuration
    type Config: ModelConfig;

    /// Defines forward pass for inference, returning class probabilities
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// Initialize a model with fresh weights
    fn init(device: &B::Device, config: &Self::Config) -> Self;

    /// Initialize a model with pretrained encoder weights and a fresh classifier
    fn load_from_safetensors(
        device: &B::Device,
        model_file: &Path,
        config: &Self::Config,
    ) -> anyhow::Result<Self>;
}

/// A trait for configs that can be used for Text Classification models
pub trait ModelConfig: burn::config::Config + Clone {
    /// Load a pretrained encoder configuration and attach a classifier for the given labels
    fn load_pretrained(
        config_file: &Path,
        labels: &[String],
        max_seq_length: usize,
        classifier_dropout: f64,
    ) -> anyhow::Result<Self>;

    /// Return the Config needed for the text classification pipeline
    fn get_config(&self) -> Config;
}
