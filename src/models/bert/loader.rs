use std::{collections::HashMap, path::Path};

use bert_burn::{
    loader::{
        load_embeddings_from_safetensors, load_encoder_from_safetensors,
        load_pooler_from_safetensors,
    },
    model::{BertModelConfig, BertModelRecord},
};
use burn::{config::Config as _, tensor::backend::Backend};
use candle_core::{safetensors, Device};

/// Load a Hugging Face `config.json`, limiting the sequence length and choosing whether the
/// pooling layer is kept
pub fn load_pretrained_config(
    config_file: &Path,
    max_seq_length: usize,
    with_pooling_layer: bool,
) -> anyhow::Result<BertModelConfig> {
    let mut config = BertModelConfig::load(config_file)
        .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?;

    config.max_seq_len = Some(max_seq_length.min(config.max_position_embeddings));
    config.with_pooling_layer = Some(with_pooling_layer);

    Ok(config)
}

/// Read BERT weights from a `model.safetensors` file into a record
pub fn load_pretrained_record<B: Backend>(
    file_path: &Path,
    device: &B::Device,
    config: &BertModelConfig,
) -> anyhow::Result<BertModelRecord<B>> {
    let weights = safetensors::load(file_path, &Device::Cpu)
        .map_err(|e| anyhow!("Error loading weights from {}: {}", file_path.display(), e))?;

    // Keys are prefixed with "encoder.layer.", "embeddings." or "pooler.", possibly after
    // the model type (e.g. "bert.encoder.layer.0...")
    let prefix = format!("{}.", config.model_type);

    let mut encoder_layers: HashMap<String, candle_core::Tensor> = HashMap::new();
    let mut embeddings_layers: HashMap<String, candle_core::Tensor> = HashMap::new();
    let mut pooler_layers: HashMap<String, candle_core::Tensor> = HashMap::new();

    for (key, value) in weights {
        let key = key.strip_prefix(&prefix).map(str::to_string).unwrap_or(key);

        if key.starts_with("encoder.layer.") {
            encoder_layers.insert(key, value);
        } else if key.starts_with("embeddings.") {
            embeddings_layers.insert(key, value);
        } else if key.starts_with("pooler.") {
            pooler_layers.insert(key, value);
        }
    }

    if encoder_layers.is_empty() || embeddings_layers.is_empty() {
        return Err(anyhow!(
            "{} does not contain BERT encoder weights",
            file_path.display()
        ));
    }

    let pooler = if config.with_pooling_layer.unwrap_or(false) {
        if pooler_layers.is_empty() {
            return Err(anyhow!(
                "{} does not contain pooler weights",
                file_path.display()
            ));
        }

        Some(load_pooler_from_safetensors(pooler_layers, device))
    } else {
        None
    };

    Ok(BertModelRecord {
        embeddings: load_embeddings_from_safetensors(embeddings_layers, device),
        encoder: load_encoder_from_safetensors(encoder_layers, device),
        pooler,
    })
}
