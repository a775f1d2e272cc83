use burn::{
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    tensor::backend::Backend,
    train::ClassificationOutput,
};

/// A model that maps a batch to class logits and scores them
pub trait Classifier<B: Backend, I> {
    /// Run a forward pass and compute the loss with the given criterion
    fn forward_classification(
        &self,
        item: I,
        criterion: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B>;
}

/// Cross-entropy, optionally weighted per class
pub fn criterion<B: Backend>(
    class_weights: Option<Vec<f32>>,
    device: &B::Device,
) -> CrossEntropyLoss<B> {
    CrossEntropyLossConfig::new()
        .with_weights(class_weights)
        .init(device)
}
