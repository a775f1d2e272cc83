use std::path::{Path, PathBuf};

use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;

/// The weights file of a model repository
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// The configuration file of a model repository
pub const CONFIG_FILE: &str = "config.json";

/// The tokenizer file of a model repository
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local paths to the files of a pretrained model on the Hugging Face Hub
#[derive(Debug, Clone)]
pub struct PretrainedFiles {
    /// The model's `config.json`
    pub config: PathBuf,

    /// The model's `model.safetensors`
    pub weights: PathBuf,

    /// The model's `tokenizer.json`
    pub tokenizer: PathBuf,
}

/// Download a single file of a model repository from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
pub async fn download_hf_file(model_name: &str, file_name: &str) -> anyhow::Result<PathBuf> {
    let api = Api::new().map_err(|e| anyhow!("Unable to reach the Hugging Face Hub: {}", e))?;

    api.model(model_name.to_string())
        .get(file_name)
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to download: {} file with name: {} from HuggingFace Hub: {}",
                model_name,
                file_name,
                e
            )
        })
}

/// Download model config, weights and tokenizer from Hugging Face Hub
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<PretrainedFiles> {
    log::info!("Fetching {} from the Hugging Face Hub", model_name);

    Ok(PretrainedFiles {
        weights: download_hf_file(model_name, WEIGHTS_FILE).await?,
        config: download_hf_file(model_name, CONFIG_FILE).await?,
        tokenizer: download_hf_file(model_name, TOKENIZER_FILE).await?,
    })
}

/// Load a tokenizer from a `tokenizer.json` file
pub fn load_tokenizer(path: &Path) -> anyhow::Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Unable to load tokenizer from {}: {}", path.display(), e))
}
