use burn::{nn::loss::CrossEntropyLoss, tensor::backend::Backend, train::ClassificationOutput};

use crate::{pipelines::feature_classification::batcher::Train, training::Classifier};

use super::{AttentionClassifier, DenseClassifier, FeatureHead};

fn classify<B: Backend, H: FeatureHead<B>>(
    head: &H,
    item: Train<B>,
    criterion: &CrossEntropyLoss<B>,
) -> ClassificationOutput<B> {
    let output = head.forward(item.features);
    let targets = item.targets.to_device(&output.device());
    let loss = criterion.forward(output.clone(), targets.clone());

    ClassificationOutput {
        loss,
        output,
        targets,
    }
}

impl<B: Backend> Classifier<B, Train<B>> for DenseClassifier<B> {
    fn forward_classification(
        &self,
        item: Train<B>,
        criterion: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B> {
        classify(self, item, criterion)
    }
}

impl<B: Backend> Classifier<B, Train<B>> for AttentionClassifier<B> {
    fn forward_classification(
        &self,
        item: Train<B>,
        criterion: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B> {
        classify(self, item, criterion)
    }
}
