use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{pipelines::text_classification, utils::files::sorted_entries};

use super::LoadableDataset;

/// A raw article, labelled by the directory it was found in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Article {
    /// The category (genre) name
    pub category: String,

    /// The file name without its extension
    pub title: String,

    /// The full text of the article
    pub text: String,
}

impl text_classification::Item for Article {
    fn input(&self) -> &str {
        &self.text
    }

    fn class_label(&self) -> &str {
        &self.category
    }
}

/// Articles read from a `<root>/<category>/<file>` directory tree
pub struct ArticleDataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Article>,
}

impl dataset::Dataset<Article> for ArticleDataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Article> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl ArticleDataset {
    /// Wrap a list of articles
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            dataset: InMemDataset::new(articles),
        }
    }

    /// The sorted set of categories present in the dataset
    pub fn categories(&self) -> Vec<String> {
        self.iter()
            .map(|article| article.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Split into two datasets by item index
    pub fn partition(&self, first: &[usize], second: &[usize]) -> (Self, Self) {
        let pick = |indices: &[usize]| {
            Self::new(
                indices
                    .iter()
                    .filter_map(|&index| self.get(index))
                    .collect(),
            )
        };

        (pick(first), pick(second))
    }
}

#[async_trait]
impl LoadableDataset<Article> for ArticleDataset {
    /// Reads every file of every category directory, in name order
    async fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let entries = sorted_entries(data_dir)
            .await
            .map_err(|e| anyhow!("Unable to list {}: {}", data_dir.display(), e))?;

        let mut articles = Vec::new();

        for category_dir in entries {
            if !fs::metadata(&category_dir).await?.is_dir() {
                log::warn!("Skipping {}: not a category directory", category_dir.display());
                continue;
            }

            let category = file_name(&category_dir);

            let files = sorted_entries(&category_dir)
                .await
                .map_err(|e| anyhow!("Unable to list {}: {}", category_dir.display(), e))?;

            let loaded = try_join_all(
                files
                    .into_iter()
                    .map(|path| read_article(category.clone(), path)),
            )
            .await?;

            log::debug!("Loaded {} articles for {}", loaded.len(), category);

            articles.extend(loaded.into_iter().flatten());
        }

        if articles.is_empty() {
            return Err(anyhow!("No articles found under {}", data_dir.display()));
        }

        log::info!(
            "Loaded {} articles from {}",
            articles.len(),
            data_dir.display()
        );

        Ok(Self::new(articles))
    }
}

async fn read_article(category: String, path: PathBuf) -> anyhow::Result<Option<Article>> {
    if !fs::metadata(&path).await?.is_file() {
        return Ok(None);
    }

    let text = fs::read_to_string(&path)
        .await
        .map_err(|e| anyhow!("Unable to read article {}: {}", path.display(), e))?;

    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Some(Article::new(category, title, text)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn write(root: &Path, category: &str, file: &str, text: &str) {
        let dir = root.join(category);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(file), text).await.unwrap();
    }

    #[tokio::test]
    async fn loads_categories_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        write(root.path(), "sport", "match.txt", "A late goal.").await;
        write(root.path(), "business", "shares.txt", "Shares fell.").await;
        write(root.path(), "business", "bank.txt", "Rates rose.").await;
        fs::write(root.path().join("README"), "not a category").await.unwrap();

        let dataset = ArticleDataset::load(root.path()).await.unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.categories(), vec!["business", "sport"]);
        assert_eq!(
            dataset.get(0),
            Some(Article::new(
                "business".to_string(),
                "bank".to_string(),
                "Rates rose.".to_string()
            ))
        );
        assert_eq!(dataset.get(2).unwrap().title, "match");
    }

    #[tokio::test]
    async fn empty_tree_is_an_error() {
        let root = tempfile::tempdir().unwrap();

        assert!(ArticleDataset::load(root.path()).await.is_err());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();

        assert!(ArticleDataset::load(&root.path().join("absent")).await.is_err());
    }

    #[test]
    fn partitions_by_index() {
        let dataset = ArticleDataset::new(
            ["a", "b", "c"]
                .iter()
                .map(|t| Article::new("x".into(), t.to_string(), String::new()))
                .collect(),
        );

        let (first, second) = dataset.partition(&[2], &[0, 1]);

        assert_eq!(first.len(), 1);
        assert_eq!(first.get(0).unwrap().title, "c");
        assert_eq!(second.len(), 2);
    }
}
