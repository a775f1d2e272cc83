use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors::{class_ids_to_tensor, rows_to_tensor};

/// A normalized feature vector with its class id
#[derive(Clone, Debug, PartialEq, new)]
pub struct Item {
    /// Normalized features
    pub features: Vec<f32>,

    /// Class id
    pub label: usize,
}

/// A training batch for feature classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Features: [batch_size, n_inputs]
    pub features: Tensor<B, 2>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Stacks feature items into tensors on a device
#[derive(Clone, new)]
pub struct Batcher<B: Backend> {
    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> dataloader::batcher::Batcher<Item, Train<B>> for Batcher<B> {
    fn batch(&self, items: Vec<Item>) -> Train<B> {
        let rows: Vec<Vec<f32>> = items.iter().map(|item| item.features.clone()).collect();
        let labels: Vec<usize> = items.iter().map(|item| item.label).collect();

        Train {
            features: rows_to_tensor(&rows, &self.device),
            targets: class_ids_to_tensor(&labels, &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn stacks_items_in_order() {
        let batcher = Batcher::<NdArray>::new(Default::default());

        let batch = batcher.batch(vec![
            Item::new(vec![1.0, 2.0], 1),
            Item::new(vec![3.0, 4.0], 0),
        ]);

        assert_eq!(batch.features.dims(), [2, 2]);
        assert_eq!(
            batch.targets.into_data().convert::<i64>().value,
            vec![1, 0]
        );
    }
}
