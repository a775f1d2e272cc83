use std::{collections::BTreeMap, path::Path};

use bert_burn::model::BertModelConfig;
use burn::{
    nn::{DropoutConfig, LinearConfig},
    tensor::backend::Backend,
};

use crate::{models::bert::loader::load_pretrained_config, pipelines::text_classification};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The base BERT config
    pub model: BertModelConfig,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// Dropout between the pooled output and the classifier
    #[config(default = 0.2)]
    pub classifier_dropout: f64,
}

impl Config {
    /// Attach a classifier for the given labels to a BERT configuration
    pub fn new_with_labels(model: BertModelConfig, labels: &[String]) -> anyhow::Result<Self> {
        let id2label: BTreeMap<usize, String> = labels
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.trim().to_string()))
            .collect();

        if id2label.is_empty() {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        Ok(Config::new(model, id2label))
    }

    /// Initializes a BERT classifier with default weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let n_classes = self.id2label.len();

        Model {
            model: self.model.init(device),
            dropout: DropoutConfig::new(self.classifier_dropout).init(),
            output: LinearConfig::new(self.model.hidden_size, n_classes).init(device),
            n_classes,
        }
    }
}

impl text_classification::ModelConfig for Config {
    /// Load a pretrained model configuration
    fn load_pretrained(
        config_file: &Path,
        labels: &[String],
        max_seq_length: usize,
        classifier_dropout: f64,
    ) -> anyhow::Result<Self> {
        let model = load_pretrained_config(config_file, max_seq_length, true)?;

        Ok(Config::new_with_labels(model, labels)?.with_classifier_dropout(classifier_dropout))
    }

    fn get_config(&self) -> text_classification::Config {
        text_classification::Config {
            pad_token_id: self.model.pad_token_id,
            max_seq_length: self
                .model
                .max_seq_len
                .unwrap_or(self.model.max_position_embeddings),
            hidden_size: self.model.hidden_size,
            id2label: self.id2label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::text_classification::ModelConfig as _;

    fn bert() -> BertModelConfig {
        BertModelConfig::new(2, 1, 1e-12, 8, 16, 10, 16, 2, 0.1, "bert".into(), 0)
            .with_max_seq_len(Some(12))
    }

    #[test]
    fn labels_become_contiguous_ids() {
        let config =
            Config::new_with_labels(bert(), &["business ".to_string(), "sport".to_string()])
                .unwrap();

        assert_eq!(config.id2label.get(&0).map(String::as_str), Some("business"));
        assert_eq!(config.id2label.get(&1).map(String::as_str), Some("sport"));
    }

    #[test]
    fn requires_at_least_one_label() {
        assert!(Config::new_with_labels(bert(), &[]).is_err());
    }

    #[test]
    fn exposes_the_pipeline_settings() {
        let config = Config::new_with_labels(bert(), &["a".to_string()]).unwrap();
        let pipeline = config.get_config();

        assert_eq!(pipeline.max_seq_length, 12);
        assert_eq!(pipeline.hidden_size, 8);
        assert_eq!(pipeline.pad_token_id, 0);
    }
}
