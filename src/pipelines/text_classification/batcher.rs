use std::collections::BTreeMap;

use burn::{
    data::dataloader,
    nn::attention::generate_padding_mask,
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;
use tokenizers::{Tokenizer, TruncationParams};

use crate::utils::{classes::invert_map, tensors::class_ids_to_tensor};

use super::Config;

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Tokenized text as 2D tensor: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask for the tokenized text containing booleans for padding locations
    pub mask_pad: Tensor<B, 2, Bool>,

    /// The unpadded length of each sequence
    pub lengths: Vec<usize>,
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Bert Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Tokenizes, truncates and pads text
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for converting text to token IDs
    tokenizer: Tokenizer,

    /// Maximum sequence length for tokenized text
    max_seq_length: usize,

    /// ID of the padding token
    pad_token_id: usize,

    /// A mapping from class name labels to class ids
    label2id: BTreeMap<String, usize>,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher, configuring the tokenizer to truncate at the max sequence length
    pub fn new(mut tokenizer: Tokenizer, config: Config, device: B::Device) -> anyhow::Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Unable to configure truncation: {}", e))?;

        Ok(Self {
            tokenizer,
            max_seq_length: config.max_seq_length,
            pad_token_id: config.pad_token_id,
            label2id: invert_map(config.id2label),
            device,
        })
    }

    /// Encode each text into token ids, including the special tokens
    pub fn tokenize(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<usize>>> {
        texts
            .iter()
            .map(|text| {
                let encoding = self
                    .tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Unable to encode text: {}", e))?;

                Ok(encoding.get_ids().iter().map(|id| *id as usize).collect())
            })
            .collect()
    }

    /// Pad token id lists to the longest one and build the padding mask
    pub fn pad(&self, token_ids: Vec<Vec<usize>>) -> Infer<B> {
        let lengths = token_ids
            .iter()
            .map(|ids| ids.len().min(self.max_seq_length))
            .collect();

        let padding = generate_padding_mask(
            self.pad_token_id,
            token_ids,
            Some(self.max_seq_length),
            &self.device,
        );

        Infer {
            tokens: padding.tensor,
            mask_pad: padding.mask,
            lengths,
        }
    }

    /// The class id of a genre name
    pub fn class_id(&self, label: &str) -> Option<usize> {
        self.label2id.get(label.trim()).copied()
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Collects a vector of texts into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        let token_ids = self.tokenize(&items).expect("unable to encode");

        self.pad(token_ids)
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, I: super::Item> dataloader::batcher::Batcher<I, Train<B>> for Batcher<B> {
    /// Collects a vector of text classification items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        let inputs = items.iter().map(|item| item.input().to_string()).collect();
        let input: Infer<B> = self.batch(inputs);

        let class_ids: Vec<usize> = items
            .iter()
            .map(|item| {
                self.class_id(item.class_label())
                    .unwrap_or_else(|| panic!("unknown class label: {}", item.class_label()))
            })
            .collect();

        Train {
            input,
            targets: class_ids_to_tensor(&class_ids, &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::datasets::Article;

    const TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[PAD]": 0, "[UNK]": 1, "goal": 2, "late": 3, "shares": 4 },
            "unk_token": "[UNK]"
        }
    }"#;

    fn batcher(max_seq_length: usize) -> Batcher<NdArray> {
        let config = Config {
            pad_token_id: 0,
            max_seq_length,
            hidden_size: 8,
            id2label: BTreeMap::from([(0, "business".to_string()), (1, "sport".to_string())]),
        };

        Batcher::new(
            Tokenizer::from_str(TOKENIZER).unwrap(),
            config,
            Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn truncates_to_the_max_sequence_length() {
        let token_ids = batcher(3)
            .tokenize(&["late goal late goal".to_string(), "shares".to_string()])
            .unwrap();

        assert_eq!(token_ids, vec![vec![3, 2, 3], vec![4]]);
    }

    #[test]
    fn pads_to_the_longest_item_and_tracks_lengths() {
        let batch: Infer<NdArray> =
            batcher(8).batch(vec!["late goal".to_string(), "shares".to_string()]);

        assert_eq!(batch.tokens.dims(), [2, 2]);
        assert_eq!(batch.lengths, vec![2, 1]);
        assert_eq!(
            batch.tokens.into_data().convert::<i64>().value,
            vec![3, 2, 4, 0]
        );
        assert_eq!(
            batch.mask_pad.into_data().value,
            vec![false, false, false, true]
        );
    }

    #[test]
    fn unknown_words_map_to_unk() {
        let token_ids = batcher(8).tokenize(&["late whistle".to_string()]).unwrap();

        assert_eq!(token_ids, vec![vec![3, 1]]);
    }

    #[test]
    fn training_batches_carry_class_ids() {
        let items = vec![
            Article::new("sport".into(), "a".into(), "late goal".into()),
            Article::new("business".into(), "b".into(), "shares".into()),
        ];

        let batch: Train<NdArray> = batcher(8).batch(items);

        assert_eq!(
            batch.targets.into_data().convert::<i64>().value,
            vec![1, 0]
        );
        assert_eq!(batch.input.lengths, vec![2, 1]);
    }
}
