use std::collections::BTreeMap;

use bert_burn::{
    data::BertInferenceBatch,
    model::{BertModel, BertModelOutput},
};
use burn::{module::Module, tensor::backend::Backend};

use crate::{
    models::bert::{load_pretrained_config, load_pretrained_record},
    pipelines::text_classification::{self, Batcher},
    utils::{
        hugging_face::{download_hf_model, load_tokenizer},
        tensors::{mean_pool, tensor_to_rows},
    },
};

/// A pretrained encoder producing one mean-pooled vector per text
pub struct FeatureExtractor<B: Backend> {
    model: BertModel<B>,
    batcher: Batcher<B>,
    hidden_size: usize,
}

impl<B: Backend> FeatureExtractor<B> {
    /// Wrap an encoder and a batcher
    pub fn new(model: BertModel<B>, batcher: Batcher<B>, hidden_size: usize) -> Self {
        Self {
            model,
            batcher,
            hidden_size,
        }
    }

    /// Download a pretrained encoder and its tokenizer from the Hugging Face Hub
    pub async fn from_pretrained(
        model_name: &str,
        max_seq_length: usize,
        device: &B::Device,
    ) -> anyhow::Result<Self> {
        let files = download_hf_model(model_name).await?;

        let mut config = load_pretrained_config(&files.config, max_seq_length, false)?;
        config.hidden_dropout_prob = 0.0;

        let record = load_pretrained_record(&files.weights, device, &config)?;
        let model = config.init::<B>(device).load_record(record);

        let tokenizer = load_tokenizer(&files.tokenizer)?;
        let batcher = Batcher::new(
            tokenizer,
            text_classification::Config {
                pad_token_id: config.pad_token_id,
                max_seq_length: config.max_seq_len.unwrap_or(config.max_position_embeddings),
                hidden_size: config.hidden_size,
                id2label: BTreeMap::new(),
            },
            device.clone(),
        )?;

        log::info!(
            "Loaded {} ({} hidden units, {} layers)",
            model_name,
            config.hidden_size,
            config.num_hidden_layers
        );

        Ok(Self::new(model, batcher, config.hidden_size))
    }

    /// The width of every extracted vector
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Encode a batch of texts and mean-pool the final hidden states over the real tokens
    pub fn extract(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input = self.batcher.pad(self.batcher.tokenize(texts)?);

        let BertModelOutput { hidden_states, .. } = self.model.forward(BertInferenceBatch {
            tokens: input.tokens,
            mask_pad: input.mask_pad,
        });

        Ok(tensor_to_rows(mean_pool(hidden_states, &input.lengths)))
    }
}
