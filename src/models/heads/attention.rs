use burn::{
    config::Config,
    module::Module,
    nn::attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
    tensor::{backend::Backend, Tensor},
};

use super::{DenseStack, FeatureHead, HeadError};

/// Configuration of an [AttentionClassifier]
#[derive(Config, Debug)]
pub struct AttentionClassifierConfig {
    /// Feature width, equal to `n_heads * embed_size`
    pub n_inputs: usize,

    /// Number of classes
    pub n_outputs: usize,

    /// Width of each attention head
    pub embed_size: usize,

    /// Widths of the hidden layers after the attention block
    pub hidden_sizes: Vec<usize>,

    /// Number of attention heads
    #[config(default = 3)]
    pub n_heads: usize,

    /// Dropout probability, for the attention weights and the hidden layers
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl AttentionClassifierConfig {
    /// Initialize a new head, checking that the heads tile the feature vector
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<AttentionClassifier<B>, HeadError> {
        if self.n_heads == 0 || self.n_heads * self.embed_size != self.n_inputs {
            return Err(HeadError::AttentionShape {
                n_inputs: self.n_inputs,
                n_heads: self.n_heads,
                embed_size: self.embed_size,
            });
        }

        let attention = MultiHeadAttentionConfig::new(self.n_inputs, self.n_heads)
            .with_dropout(self.dropout)
            .init(device);

        let stack = DenseStack::init(
            self.n_inputs,
            self.n_outputs,
            &self.hidden_sizes,
            self.dropout,
            device,
        );

        Ok(AttentionClassifier { attention, stack })
    }
}

/// Self-attention over the feature vector, followed by a dense stack.
///
/// The feature vector is treated as a sequence of length one.
#[derive(Module, Debug)]
pub struct AttentionClassifier<B: Backend> {
    /// The attention block
    pub attention: MultiHeadAttention<B>,

    /// The layers after attention
    pub stack: DenseStack<B>,
}

impl<B: Backend> FeatureHead<B> for AttentionClassifier<B> {
    fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, n_inputs] = features.dims();

        let sequence = features.reshape([batch_size, 1, n_inputs]);
        let context = self.attention.forward(MhaInput::self_attn(sequence)).context;

        let output = self.stack.forward(context);
        let [_, _, n_outputs] = output.dims();

        output.reshape([batch_size, n_outputs])
    }
}
