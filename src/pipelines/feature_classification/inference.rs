use std::path::Path;

use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    models::heads::{FeatureHead, HeadConfig},
    pipelines::{feature_extraction::FeatureExtractor, top_predictions, Prediction},
    training::{artifacts::CONFIG_FILE, Artifacts},
    utils::{classes::LabelEncoder, tensors::rows_to_tensor},
};

use super::ModelConfig;

/// Class probabilities from a saved head for already extracted features
pub fn classify_features<B: Backend>(
    device: &B::Device,
    artifacts: &Artifacts,
    config: &ModelConfig,
    features: &[Vec<f32>],
) -> anyhow::Result<Tensor<B, 2>> {
    let expected = config.head.n_inputs();
    if let Some(row) = features.iter().find(|row| row.len() != expected) {
        return Err(anyhow!(
            "The head expects {} features but was given {}",
            expected,
            row.len()
        ));
    }

    let input = rows_to_tensor::<B>(&config.scaler.transform(features), device);

    let probabilities = match &config.head {
        HeadConfig::Dense(head) => {
            let record = artifacts.load_model::<B, _>(device)?;
            head.init::<B>(device).load_record(record).infer(input)
        }
        HeadConfig::Attention(head) => {
            let record = artifacts.load_model::<B, _>(device)?;
            head.init::<B>(device)?.load_record(record).infer(input)
        }
    };

    Ok(probabilities)
}

/// Predict the genre of each text with a saved head
pub async fn infer<B: Backend>(
    device: B::Device,
    artifact_dir: &Path,
    samples: Vec<String>,
) -> anyhow::Result<Vec<Prediction>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let artifacts = Artifacts::new(artifact_dir);
    let config: ModelConfig = artifacts.load_config(CONFIG_FILE)?;

    let extraction = &config.extraction;
    let extractor = FeatureExtractor::<B>::from_pretrained(
        &extraction.model_name,
        extraction.max_seq_length,
        &device,
    )
    .await?;

    if extractor.hidden_size() != config.head.n_inputs() {
        return Err(anyhow!(
            "{} produces {} features but the head expects {}",
            extraction.model_name,
            extractor.hidden_size(),
            config.head.n_inputs()
        ));
    }

    let preprocessor = extraction.preprocessor();
    let texts: Vec<String> = samples
        .iter()
        .map(|sample| preprocessor.preprocess(sample))
        .collect();

    let features = extractor.extract(&texts)?;
    let probabilities = classify_features::<B>(&device, &artifacts, &config, &features)?;

    top_predictions(probabilities, &LabelEncoder::from_id2label(config.id2label))
}
