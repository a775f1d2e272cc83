use std::path::Path;

use async_trait::async_trait;

/// Category-labelled article files
pub mod articles;

/// The extracted feature table
pub mod features;

pub use articles::{Article, ArticleDataset};
pub use features::{FeatureRecord, FeatureTable, FeatureTableError};

/// A dataset which can be loaded
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the dataset
    async fn load(path: &Path) -> anyhow::Result<Self>
    where
        Self: std::marker::Sized;
}
