use std::marker::PhantomData;

use burn::{
    config::Config,
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Element, ElementConversion, Tensor,
    },
};

/// Configuration of the [GradScaler]
#[derive(Config, Debug)]
pub struct GradScalerConfig {
    /// The scale applied to the first loss
    #[config(default = 65536.0)]
    pub init_scale: f64,

    /// Multiplier applied after `growth_interval` finite steps
    #[config(default = 2.0)]
    pub growth_factor: f64,

    /// Multiplier applied when gradients overflow
    #[config(default = 0.5)]
    pub backoff_factor: f64,

    /// Consecutive finite steps before the scale grows
    #[config(default = 2000)]
    pub growth_interval: usize,
}

impl GradScalerConfig {
    /// Halve the initial scale until the element type `E` can represent it.
    ///
    /// Half precision saturates at 65504, so the default starts at 32768 there.
    pub fn fit_to<E: Element>(self) -> Self {
        let mut init_scale = self.init_scale;

        while init_scale > 1.0 && !init_scale.elem::<E>().elem::<f64>().is_finite() {
            init_scale /= 2.0;
        }

        self.with_init_scale(init_scale)
    }

    /// Build the scaler
    pub fn init(&self) -> GradScaler {
        GradScaler {
            scale: self.init_scale,
            growth_factor: self.growth_factor,
            backoff_factor: self.backoff_factor,
            growth_interval: self.growth_interval,
            finite_steps: 0,
        }
    }
}

/// Dynamic loss scaling.
///
/// The loss is multiplied by the current scale before backpropagation so small gradients
/// survive reduced precision. Gradients are divided by the same scale before the optimizer
/// sees them; a step whose gradients contain infinities or NaNs is skipped and the scale
/// shrinks.
#[derive(Debug, Clone)]
pub struct GradScaler {
    scale: f64,
    growth_factor: f64,
    backoff_factor: f64,
    growth_interval: usize,
    finite_steps: usize,
}

impl GradScaler {
    /// The current scale
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// Multiply the loss by the current scale
    pub fn scale<B: Backend>(&self, loss: Tensor<B, 1>) -> Tensor<B, 1> {
        loss.mul_scalar(self.scale)
    }

    /// Divide every gradient of `module` by the current scale, in place.
    ///
    /// Returns whether all gradients are finite.
    pub fn unscale<B, M>(&self, module: &M, grads: &mut GradientsParams) -> bool
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        let mut visitor = Unscale::<B> {
            grads,
            inv_scale: 1.0 / self.scale,
            finite: true,
            backend: PhantomData,
        };

        module.visit(&mut visitor);

        visitor.finite
    }

    /// Adjust the scale after a step
    pub fn update(&mut self, finite: bool) {
        if finite {
            self.finite_steps += 1;

            if self.finite_steps >= self.growth_interval {
                self.scale *= self.growth_factor;
                self.finite_steps = 0;
            }
        } else {
            self.scale *= self.backoff_factor;
            self.finite_steps = 0;

            log::debug!("Non-finite gradients, loss scale reduced to {}", self.scale);
        }
    }
}

struct Unscale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    inv_scale: f64,
    finite: bool,
    backend: PhantomData<B>,
}

impl<'a, B: AutodiffBackend> ModuleVisitor<B> for Unscale<'a, B> {
    fn visit_float<const D: usize>(&mut self, id: &ParamId, _tensor: &Tensor<B, D>) {
        let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) else {
            return;
        };

        let grad = grad.mul_scalar(self.inv_scale);

        // Any NaN or infinity poisons the sum
        let total: f64 = grad.clone().sum().into_scalar().elem();
        if !total.is_finite() {
            self.finite = false;
        }

        self.grads.register::<B::InnerBackend, D>(id.clone(), grad);
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::Distribution,
    };

    use super::*;
    use crate::models::heads::{WeightNormLinear, WeightNormLinearConfig};

    type TestBackend = Autodiff<NdArray>;

    struct GradSums<'a> {
        grads: &'a GradientsParams,
        sums: Vec<f32>,
    }

    impl<'a> ModuleVisitor<TestBackend> for GradSums<'a> {
        fn visit_float<const D: usize>(&mut self, id: &ParamId, _tensor: &Tensor<TestBackend, D>) {
            if let Some(grad) = self.grads.get::<NdArray, D>(id) {
                self.sums.push(grad.sum().into_scalar().elem());
            }
        }
    }

    fn grad_sums(model: &WeightNormLinear<TestBackend>, grads: &GradientsParams) -> Vec<f32> {
        let mut visitor = GradSums {
            grads,
            sums: Vec::new(),
        };
        model.visit(&mut visitor);

        visitor.sums
    }

    #[test]
    fn initial_scale_fits_the_element_type() {
        assert_eq!(GradScalerConfig::new().fit_to::<f32>().init_scale, 65536.0);
        assert_eq!(
            GradScalerConfig::new().fit_to::<burn::tensor::f16>().init_scale,
            32768.0
        );
        assert_eq!(
            GradScalerConfig::new()
                .with_init_scale(1e6)
                .fit_to::<burn::tensor::f16>()
                .init_scale,
            62500.0
        );
    }

    #[test]
    fn grows_after_the_interval_and_backs_off_on_overflow() {
        let mut scaler = GradScalerConfig::new().with_growth_interval(3).init();
        assert_eq!(scaler.scale_factor(), 65536.0);

        scaler.update(true);
        scaler.update(true);
        assert_eq!(scaler.scale_factor(), 65536.0);
        scaler.update(true);
        assert_eq!(scaler.scale_factor(), 131072.0);

        scaler.update(true);
        scaler.update(false);
        assert_eq!(scaler.scale_factor(), 65536.0);

        // An overflow restarts the growth count
        scaler.update(true);
        scaler.update(true);
        assert_eq!(scaler.scale_factor(), 65536.0);
    }

    #[test]
    fn unscaled_gradients_match_unscaled_loss() {
        let device = Default::default();
        let model = WeightNormLinearConfig::new(4, 3).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 2>::random([5, 4], Distribution::Default, &device);

        let loss = model.forward(input.clone()).sum();
        let plain = GradientsParams::from_grads(loss.backward(), &model);

        let scaler = GradScalerConfig::new().with_init_scale(1024.0).init();
        let loss = scaler.scale(model.forward(input).sum());
        let mut scaled = GradientsParams::from_grads(loss.backward(), &model);

        assert!(scaler.unscale(&model, &mut scaled));

        let expected = grad_sums(&model, &plain);
        let actual = grad_sums(&model, &scaled);

        assert_eq!(expected.len(), 3);
        for (actual, expected) in actual.iter().zip(&expected) {
            assert!(
                (actual - expected).abs() < 1e-3 * expected.abs().max(1.0),
                "{actual} != {expected}"
            );
        }
    }

    #[test]
    fn overflowing_gradients_are_reported() {
        let device = Default::default();
        let model = WeightNormLinearConfig::new(4, 3).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let scaler = GradScalerConfig::new().with_init_scale(f64::INFINITY).init();
        let loss = scaler.scale(model.forward(input).sum());
        let mut grads = GradientsParams::from_grads(loss.backward(), &model);

        assert!(!scaler.unscale(&model, &mut grads));
    }
}
