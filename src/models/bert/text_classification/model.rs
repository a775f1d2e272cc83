use std::path::Path;

use bert_burn::{
    data::BertInferenceBatch,
    model::{BertModel, BertModelOutput},
};
use burn::{
    module::Module,
    nn::{loss::CrossEntropyLoss, Dropout, Linear},
    tensor::{activation::softmax, backend::Backend, Tensor},
    train::ClassificationOutput,
};

use crate::{
    models::bert::loader::load_pretrained_record,
    pipelines::text_classification::{
        self,
        batcher::{Infer, Train},
    },
    training::Classifier,
};

use super::Config;

/// BERT for text Classification
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// The base BERT model
    pub model: BertModel<B>,

    /// Dropout on the pooled output
    pub dropout: Dropout,

    /// Linear layer for text classification
    pub output: Linear<B>,

    /// Total number of classes
    pub n_classes: usize,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Compute class logits: [batch_size, n_classes]
    pub fn forward(&self, input: BertInferenceBatch<B>) -> Tensor<B, 2> {
        let BertModelOutput {
            pooled_output,
            hidden_states,
        } = self.model.forward(input);

        // Without a pooler, classify from the first ([CLS]) token
        let pooled = pooled_output.unwrap_or_else(|| {
            let [batch_size, _seq_length, hidden_size] = hidden_states.dims();

            hidden_states
                .slice([0..batch_size, 0..1])
                .reshape([batch_size, hidden_size])
        });

        self.output.forward(self.dropout.forward(pooled))
    }
}

impl<B: Backend> Classifier<B, Train<B>> for Model<B> {
    fn forward_classification(
        &self,
        item: Train<B>,
        criterion: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(BertInferenceBatch {
            tokens: item.input.tokens,
            mask_pad: item.input.mask_pad,
        });

        let targets = item.targets.to_device(&output.device());
        let loss = criterion.forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}

impl<B: Backend> text_classification::Model<B> for Model<B> {
    /// The model configuration
    type Config = Config;

    /// Defines forward pass for inference
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        let output = self.forward(BertInferenceBatch {
            tokens: input.tokens,
            mask_pad: input.mask_pad,
        });

        softmax(output, 1)
    }

    fn init(device: &B::Device, config: &Self::Config) -> Self {
        config.init(device)
    }

    /// Load the pretrained encoder and attach a fresh classifier
    fn load_from_safetensors(
        device: &B::Device,
        model_file: &Path,
        config: &Self::Config,
    ) -> anyhow::Result<Self> {
        let record = load_pretrained_record(model_file, device, &config.model)?;
        let model = config.init(device);

        Ok(Model {
            model: model.model.load_record(record),
            ..model
        })
    }
}

#[cfg(test)]
mod tests {
    use bert_burn::model::BertModelConfig;
    use burn::{
        backend::NdArray,
        tensor::{Bool, Int},
    };

    use super::*;
    use crate::{pipelines::text_classification::Model as _, training::criterion};

    type TestBackend = NdArray;

    fn config(with_pooling_layer: bool) -> Config {
        let bert = BertModelConfig::new(2, 1, 1e-12, 8, 16, 10, 16, 2, 0.0, "bert".into(), 0)
            .with_max_seq_len(Some(16))
            .with_with_pooling_layer(Some(with_pooling_layer));

        Config::new_with_labels(bert, &["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap()
    }

    fn input(device: &<TestBackend as Backend>::Device) -> Infer<TestBackend> {
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[2, 3, 4], [5, 6, 0]], device);
        let mask_pad: Tensor<TestBackend, 2, Bool> = tokens.clone().equal_elem(0);

        Infer {
            tokens,
            mask_pad,
            lengths: vec![3, 2],
        }
    }

    #[test]
    fn probabilities_cover_every_class() {
        let device = Default::default();

        for pooling in [true, false] {
            let model = config(pooling).init::<TestBackend>(&device);
            let probabilities = model.infer(input(&device));

            assert_eq!(probabilities.dims(), [2, 3]);

            for sum in probabilities.sum_dim(1).into_data().convert::<f32>().value {
                assert!((sum - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn scores_training_batches() {
        let device = Default::default();
        let model = config(true).init::<TestBackend>(&device);
        let batch = Train {
            input: input(&device),
            targets: Tensor::<TestBackend, 1, Int>::from_ints([0, 2], &device),
        };

        let output = model.forward_classification(batch, &criterion(None, &device));
        let loss: f32 = output.loss.into_scalar();

        assert_eq!(output.output.dims(), [2, 3]);
        assert!(loss.is_finite() && loss >= 0.0);
    }
}
