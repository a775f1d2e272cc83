use std::sync::Arc;

use burn::{
    data::dataloader::DataLoader,
    nn::loss::CrossEntropyLoss,
    tensor::{backend::Backend, ElementConversion, Int, Tensor},
};
use serde::{Deserialize, Serialize};

use super::Classifier;

/// Accuracy and loss over a held-out set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Percentage of correct predictions, in `[0, 100]`
    pub accuracy: f64,

    /// Mean per-item loss
    pub loss: f64,

    /// Number of correct predictions
    pub correct: usize,

    /// Number of evaluated items
    pub total: usize,
}

/// Running totals across batches
#[derive(Debug, Default, Clone)]
pub struct Tally {
    correct: usize,
    total: usize,
    loss_sum: f64,
}

impl Tally {
    /// Record one batch, given its mean loss
    pub fn record(&mut self, correct: usize, batch_size: usize, batch_loss: f64) {
        self.correct += correct;
        self.total += batch_size;
        self.loss_sum += batch_loss * batch_size as f64;
    }

    /// Summarize, or `None` when nothing was recorded
    pub fn finish(&self) -> Option<Evaluation> {
        if self.total == 0 {
            return None;
        }

        Some(Evaluation {
            accuracy: 100.0 * self.correct as f64 / self.total as f64,
            loss: self.loss_sum / self.total as f64,
            correct: self.correct,
            total: self.total,
        })
    }
}

/// Evaluate a model over every batch of a data loader
pub fn evaluate<B, M, I>(
    model: &M,
    dataloader: &Arc<dyn DataLoader<I>>,
    criterion: &CrossEntropyLoss<B>,
    verbose: bool,
) -> anyhow::Result<Evaluation>
where
    B: Backend,
    M: Classifier<B, I>,
{
    let mut tally = Tally::default();

    for (index, item) in dataloader.iter().enumerate() {
        let output = model.forward_classification(item, criterion);
        let [batch_size, _n_classes] = output.output.dims();

        let predictions = output.output.argmax(1).reshape([batch_size]);

        let correct: i64 = predictions
            .clone()
            .equal(output.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem();

        let loss: f64 = output.loss.into_scalar().elem();

        if verbose {
            log::info!(
                "Batch {}: predicted {:?}, expected {:?}",
                index,
                class_ids(predictions),
                class_ids(output.targets)
            );
        }

        tally.record(correct as usize, batch_size, loss);
    }

    let evaluation = tally
        .finish()
        .ok_or_else(|| anyhow!("The evaluation data loader produced no items"))?;

    if verbose {
        log::info!("Accuracy: {:.2}%", evaluation.accuracy);
        log::info!("Loss: {:.4}", evaluation.loss);
    }

    Ok(evaluation)
}

fn class_ids<B: Backend>(ids: Tensor<B, 1, Int>) -> Vec<i64> {
    ids.into_data().convert::<i64>().value
}
