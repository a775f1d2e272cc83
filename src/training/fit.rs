use std::sync::Arc;

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
    LearningRate,
};
use serde::{Deserialize, Serialize};

use super::{
    criterion, evaluate,
    scaler::GradScalerConfig,
    scheduler::PlateauSchedulerConfig,
    Classifier, Evaluation,
};

/// Epoch loop settings
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Number of epochs
    #[config(default = 10)]
    pub num_epochs: usize,

    /// Initial learning rate
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// Multiplier applied to the learning rate when the validation loss plateaus
    #[config(default = 0.1)]
    pub plateau_factor: f64,

    /// Epochs without improvement before the learning rate is reduced
    #[config(default = 10)]
    pub plateau_patience: usize,

    /// Scale the loss before backpropagation. Unset means decided by the device.
    pub loss_scaling: Option<bool>,
}

/// One line of training history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// The 1-based epoch number
    pub epoch: usize,

    /// Mean per-item training loss
    pub train_loss: f64,

    /// Held-out metrics after the epoch
    pub valid: Evaluation,

    /// The learning rate used during the epoch
    pub learning_rate: LearningRate,

    /// Optimizer steps skipped because of non-finite gradients
    pub skipped_steps: usize,
}

/// Train `model` for `config.num_epochs` epochs, validating after each one.
///
/// The learning rate is reduced when the validation loss stops improving. Returns the trained
/// model together with the per-epoch history.
pub fn fit<B, M, O, TI, VI>(
    mut model: M,
    mut optimizer: O,
    dataloader_train: Arc<dyn DataLoader<TI>>,
    dataloader_valid: Arc<dyn DataLoader<VI>>,
    class_weights: Option<Vec<f32>>,
    config: &Config,
    device: &B::Device,
) -> anyhow::Result<(M, Vec<EpochSummary>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B, TI>,
    M::InnerModule: Classifier<B::InnerBackend, VI>,
    O: Optimizer<M, B>,
{
    let criterion_train = criterion::<B>(class_weights.clone(), device);
    let criterion_valid = criterion::<B::InnerBackend>(class_weights, device);

    let mut scheduler = PlateauSchedulerConfig::new(config.learning_rate)
        .with_factor(config.plateau_factor)
        .with_patience(config.plateau_patience)
        .init();

    let mut scaler = config
        .loss_scaling
        .unwrap_or(false)
        .then(|| GradScalerConfig::new().fit_to::<B::FloatElem>().init());

    let mut history = Vec::with_capacity(config.num_epochs);

    for epoch in 1..=config.num_epochs {
        let learning_rate = scheduler.learning_rate();

        let mut loss_sum = 0.0;
        let mut items = 0;
        let mut skipped_steps = 0;

        for batch in dataloader_train.iter() {
            let output = model.forward_classification(batch, &criterion_train);
            let [batch_size, _n_classes] = output.output.dims();
            let loss: f64 = output.loss.clone().into_scalar().elem();

            let grads = match &scaler {
                Some(scaler) => scaler.scale(output.loss).backward(),
                None => output.loss.backward(),
            };
            let mut grads = GradientsParams::from_grads(grads, &model);

            if let Some(scaler) = scaler.as_mut() {
                let finite = scaler.unscale(&model, &mut grads);
                scaler.update(finite);

                if !finite {
                    skipped_steps += 1;
                    continue;
                }
            }

            model = optimizer.step(learning_rate, model, grads);

            loss_sum += loss * batch_size as f64;
            items += batch_size;
        }

        let train_loss = if items > 0 {
            loss_sum / items as f64
        } else {
            f64::NAN
        };

        let valid = evaluate(&model.valid(), &dataloader_valid, &criterion_valid, false)?;
        scheduler.step(valid.loss);

        log::info!(
            "Epoch {}/{}, train loss: {:.4e}, val loss: {:.4e}, val accuracy: {:.2}%, LR: {:.4e}",
            epoch,
            config.num_epochs,
            train_loss,
            valid.loss,
            valid.accuracy,
            learning_rate
        );

        log::debug!("Best validation loss: {:.4e}", scheduler.best());

        if let Some(scaler) = scaler.as_ref().filter(|_| skipped_steps > 0) {
            log::warn!(
                "Epoch {}: skipped {} steps with non-finite gradients, loss scale now {}",
                epoch,
                skipped_steps,
                scaler.scale_factor()
            );
        }

        history.push(EpochSummary {
            epoch,
            train_loss,
            valid,
            learning_rate,
            skipped_steps,
        });
    }

    Ok((model, history))
}
