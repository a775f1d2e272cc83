use burn::{
    config::Config,
    module::{Module, Param},
    nn::LinearConfig,
    tensor::{backend::Backend, Tensor},
};

/// Configuration of a [WeightNormLinear] layer
#[derive(Config, Debug)]
pub struct WeightNormLinearConfig {
    /// Input width
    pub d_input: usize,

    /// Output width
    pub d_output: usize,

    /// Whether to learn an additive bias
    #[config(default = true)]
    pub bias: bool,
}

/// A linear layer whose weight is a learned direction scaled by a learned magnitude.
///
/// The effective weight is `w = g * v / ||v||`, with the norm taken over the inputs of each
/// output unit.
#[derive(Module, Debug)]
pub struct WeightNormLinear<B: Backend> {
    /// Direction `v`: [d_input, d_output]
    pub direction: Param<Tensor<B, 2>>,

    /// Magnitude `g`: [1, d_output]
    pub magnitude: Param<Tensor<B, 2>>,

    /// Bias: [d_output]
    pub bias: Option<Param<Tensor<B, 1>>>,
}

impl WeightNormLinearConfig {
    /// Initialize the layer so it starts out equal to a plain linear layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> WeightNormLinear<B> {
        let linear = LinearConfig::new(self.d_input, self.d_output)
            .with_bias(self.bias)
            .init(device);

        let magnitude = column_norm(linear.weight.val().detach());

        WeightNormLinear {
            direction: linear.weight,
            magnitude: Param::from(magnitude),
            bias: linear.bias,
        }
    }
}

impl<B: Backend> WeightNormLinear<B> {
    /// The effective weight matrix
    pub fn weight(&self) -> Tensor<B, 2> {
        let direction = self.direction.val();
        let scale = self.magnitude.val().div(column_norm(direction.clone()));

        direction.mul(scale)
    }

    /// Applies the layer to the last dimension of the input
    ///
    /// # Shapes
    ///
    /// - input: `[..., d_input]`
    /// - output: `[..., d_output]`
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let output = input.matmul(self.weight().unsqueeze());

        match &self.bias {
            Some(bias) => output + bias.val().unsqueeze(),
            None => output,
        }
    }
}

/// L2 norm of every column: [rows, cols] -> [1, cols]
fn column_norm<B: Backend>(weight: Tensor<B, 2>) -> Tensor<B, 2> {
    weight.clone().mul(weight).sum_dim(0).sqrt()
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::Distribution};

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn starts_equal_to_a_plain_linear_layer() {
        let device = Default::default();
        let layer = WeightNormLinearConfig::new(6, 4).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 2>::random([3, 6], Distribution::Default, &device);

        let expected = input.clone().matmul(layer.direction.val())
            + layer.bias.as_ref().unwrap().val().unsqueeze();

        layer
            .forward(input)
            .into_data()
            .assert_approx_eq(&expected.into_data(), 4);
    }

    #[test]
    fn magnitude_sets_the_column_norm() {
        let device = Default::default();
        let mut layer = WeightNormLinearConfig::new(5, 3)
            .with_bias(false)
            .init::<TestBackend>(&device);
        layer.magnitude = Param::from(Tensor::from_floats([[1.0, 2.0, 3.0]], &device));

        let expected = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0]], &device);

        column_norm(layer.weight())
            .into_data()
            .assert_approx_eq(&expected.into_data(), 4);
    }

    #[test]
    fn applies_to_the_last_dimension() {
        let device = Default::default();
        let layer = WeightNormLinearConfig::new(8, 2).init::<TestBackend>(&device);

        let output = layer.forward(Tensor::<TestBackend, 3>::zeros([4, 1, 8], &device));

        assert_eq!(output.dims(), [4, 1, 2]);
    }
}
