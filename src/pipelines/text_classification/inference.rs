use std::path::Path;

use burn::{module::Module, tensor::backend::Backend};

use crate::{
    pipelines::{top_predictions, Prediction},
    training::{
        artifacts::{CONFIG_FILE, TRAINING_FILE},
        Artifacts,
    },
    utils::{
        classes::LabelEncoder,
        hugging_face::{download_hf_file, load_tokenizer, TOKENIZER_FILE},
    },
};

use super::{training, Batcher, Model, ModelConfig};

/// Predict the genre of each text with a fine-tuned model
pub async fn infer<B: Backend, M: Model<B>>(
    device: B::Device,    // Device on which to perform computation (e.g., CPU or CUDA device)
    artifact_dir: &Path,  // Directory containing model and config files
    samples: Vec<String>, // Text samples for inference
) -> anyhow::Result<Vec<Prediction>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let artifacts = Artifacts::new(artifact_dir);

    // Load experiment configuration
    let config: M::Config = artifacts.load_config(CONFIG_FILE)?;
    let training: training::Config = artifacts.load_config(TRAINING_FILE)?;

    // Initialize tokenizer
    let tokenizer_file = download_hf_file(&training.model_name, TOKENIZER_FILE).await?;
    let tokenizer = load_tokenizer(&tokenizer_file)?;

    let model_config = config.get_config();
    let batcher = Batcher::<B>::new(tokenizer, model_config.clone(), device.clone())?;

    // Load trained model weights
    log::info!("Loading weights from {}", artifact_dir.display());

    let record = artifacts.load_model::<B, M::Record>(&device)?;
    let model = M::init(&device, &config).load_record(record);

    // Run inference on the given text samples
    let input = batcher.pad(batcher.tokenize(&samples)?);

    let labels = LabelEncoder::from_id2label(model_config.id2label);

    top_predictions(model.infer(input), &labels)
}
