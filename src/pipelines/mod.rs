use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::utils::{classes::LabelEncoder, tensors::tensor_to_rows};

/// Sentence embeddings from a pretrained encoder
pub mod feature_extraction;

/// Heads trained on extracted features
pub mod feature_classification;

/// End-to-end fine-tuning
pub mod text_classification;

/// The most likely class of one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The class name
    pub label: String,

    /// The class probability
    pub probability: f32,
}

/// Pick the most likely class of every row of a probability matrix
pub fn top_predictions<B: Backend>(
    probabilities: Tensor<B, 2>,
    labels: &LabelEncoder,
) -> anyhow::Result<Vec<Prediction>> {
    tensor_to_rows(probabilities)
        .into_iter()
        .map(|row| {
            let (id, probability) = row
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (id, p)| {
                    if p > best.1 {
                        (id, p)
                    } else {
                        best
                    }
                });

            let label = labels
                .decode(id)
                .ok_or_else(|| anyhow!("No label for class id {}", id))?;

            Ok(Prediction {
                label: label.to_string(),
                probability,
            })
        })
        .collect()
}
