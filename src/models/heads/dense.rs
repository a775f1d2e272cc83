use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig},
    tensor::{activation::mish, backend::Backend, Tensor},
};

use super::{FeatureHead, WeightNormLinear, WeightNormLinearConfig};

/// Hidden layers with Mish and dropout, followed by a projection to the class logits
#[derive(Module, Debug)]
pub struct DenseStack<B: Backend> {
    /// Hidden layers, in order
    pub layers: Vec<WeightNormLinear<B>>,

    /// Projection to the class logits
    pub output: WeightNormLinear<B>,

    /// Dropout applied after every hidden activation
    pub dropout: Dropout,
}

impl<B: Backend> DenseStack<B> {
    /// Build a stack reading `n_inputs` features through the given hidden widths
    pub fn init(
        n_inputs: usize,
        n_outputs: usize,
        hidden_sizes: &[usize],
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let mut d_input = n_inputs;
        let mut layers = Vec::with_capacity(hidden_sizes.len());

        for &d_output in hidden_sizes {
            layers.push(WeightNormLinearConfig::new(d_input, d_output).init(device));
            d_input = d_output;
        }

        Self {
            layers,
            output: WeightNormLinearConfig::new(d_input, n_outputs).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// Applies the stack to the last dimension of the input
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;

        for layer in &self.layers {
            x = self.dropout.forward(mish(layer.forward(x)));
        }

        self.output.forward(x)
    }
}

/// Configuration of a [DenseClassifier]
#[derive(Config, Debug)]
pub struct DenseClassifierConfig {
    /// Feature width
    pub n_inputs: usize,

    /// Number of classes
    pub n_outputs: usize,

    /// Widths of the hidden layers
    pub hidden_sizes: Vec<usize>,

    /// Dropout probability
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl DenseClassifierConfig {
    /// Initialize a new head
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseClassifier<B> {
        DenseClassifier {
            stack: DenseStack::init(
                self.n_inputs,
                self.n_outputs,
                &self.hidden_sizes,
                self.dropout,
                device,
            ),
        }
    }
}

/// A feed-forward classifier over pooled features
#[derive(Module, Debug)]
pub struct DenseClassifier<B: Backend> {
    /// The layers
    pub stack: DenseStack<B>,
}

impl<B: Backend> FeatureHead<B> for DenseClassifier<B> {
    fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.stack.forward(features)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn produces_one_logit_per_class() {
        let device = Default::default();
        let head = DenseClassifierConfig::new(16, 5, vec![8, 32]).init::<TestBackend>(&device);

        assert_eq!(head.stack.layers.len(), 2);
        assert_eq!(
            head.forward(Tensor::zeros([3, 16], &device)).dims(),
            [3, 5]
        );
    }

    #[test]
    fn without_hidden_layers_the_output_reads_the_input() {
        let device = Default::default();
        let head = DenseClassifierConfig::new(16, 5, vec![]).init::<TestBackend>(&device);

        assert!(head.stack.layers.is_empty());
        assert_eq!(head.stack.output.direction.val().dims(), [16, 5]);
        assert_eq!(
            head.forward(Tensor::zeros([2, 16], &device)).dims(),
            [2, 5]
        );
    }

    #[test]
    fn probabilities_sum_to_one() {
        let device = Default::default();
        let head = DenseClassifierConfig::new(4, 3, vec![6]).init::<TestBackend>(&device);

        let probabilities = head.infer(Tensor::ones([2, 4], &device));
        let sums = probabilities.sum_dim(1).into_data().convert::<f32>().value;

        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }
}
