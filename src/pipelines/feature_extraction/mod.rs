//! Turn the article tree into a table of pooled encoder features

use std::path::{Path, PathBuf};

use burn::{config::Config as _, data::dataset::Dataset, tensor::backend::Backend};

use crate::{
    datasets::{Article, ArticleDataset, FeatureRecord, FeatureTable, LoadableDataset},
    preprocessing::Preprocessor,
};

/// The pretrained encoder wrapper
pub mod extractor;

pub use extractor::FeatureExtractor;

/// Settings for feature extraction
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// The `<category>/<file>` article tree
    #[config(default = "\"articles\".to_string()")]
    pub data_dir: String,

    /// Where the feature table is written
    #[config(default = "\"features.csv\".to_string()")]
    pub output: String,

    /// Model name (e.g., "bert-base-uncased")
    #[config(default = "\"bert-base-uncased\".to_string()")]
    pub model_name: String,

    /// Articles encoded per forward pass
    #[config(default = 1)]
    pub batch_size: usize,

    /// Maximum sequence length
    #[config(default = 512)]
    pub max_seq_length: usize,

    /// A stopword file replacing the built-in English list
    pub stopwords: Option<String>,
}

/// How a feature table was produced, saved next to it
#[derive(burn::config::Config, Debug)]
pub struct Provenance {
    /// The encoder that produced the features
    pub model_name: String,

    /// Maximum sequence length used for encoding
    pub max_seq_length: usize,

    /// Custom stopwords, or `None` for the built-in English list
    pub stopwords: Option<Vec<String>>,
}

impl Provenance {
    /// The settings file of a feature table: `features.csv` is described by `features.json`
    pub fn path_for(table: &Path) -> PathBuf {
        table.with_extension("json")
    }

    /// The preprocessor the table's texts went through
    pub fn preprocessor(&self) -> Preprocessor {
        match &self.stopwords {
            Some(words) => Preprocessor::new(words),
            None => Preprocessor::default(),
        }
    }
}

/// Pair articles with their feature vectors
pub fn feature_records(articles: &[Article], features: Vec<Vec<f32>>) -> Vec<FeatureRecord> {
    articles
        .iter()
        .zip(features)
        .map(|(article, features)| FeatureRecord {
            category: article.category.clone(),
            title: article.title.clone(),
            features,
            text: article.text.clone(),
        })
        .collect()
}

/// Extract features for every article and write the feature table.
///
/// Returns the number of rows written.
pub async fn extract<B: Backend>(device: B::Device, config: &Config) -> anyhow::Result<usize> {
    let stopwords = match &config.stopwords {
        Some(path) => Some(Preprocessor::from_file(path).await?.stopwords()),
        None => None,
    };

    let provenance = Provenance::new(config.model_name.clone(), config.max_seq_length)
        .with_stopwords(stopwords);
    let preprocessor = provenance.preprocessor();

    let dataset = ArticleDataset::load(Path::new(&config.data_dir)).await?;
    let articles: Vec<Article> = dataset.iter().collect();

    let extractor =
        FeatureExtractor::<B>::from_pretrained(&config.model_name, config.max_seq_length, &device)
            .await?;

    let mut records = Vec::with_capacity(articles.len());

    for chunk in articles.chunks(config.batch_size.max(1)) {
        for article in chunk {
            log::info!("{} {}", article.category, article.title);
        }

        let texts: Vec<String> = chunk
            .iter()
            .map(|article| preprocessor.preprocess(&article.text))
            .collect();

        records.extend(feature_records(chunk, extractor.extract(&texts)?));
    }

    let output = Path::new(&config.output);
    let written = FeatureTable::write(output, &records)?;

    let provenance_path = Provenance::path_for(output);
    provenance.save(&provenance_path).map_err(|e| {
        anyhow!(
            "Unable to save extraction settings to {}: {}",
            provenance_path.display(),
            e
        )
    })?;

    log::info!(
        "Wrote {} rows of {} features to {}",
        written,
        extractor.hidden_size(),
        output.display()
    );

    Ok(written)
}

#[cfg(test)]
mod tests {
    use burn::config::Config as _;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn records_keep_the_raw_text() {
        let articles = vec![Article::new(
            "sport".into(),
            "match".into(),
            "A late goal!".into(),
        )];

        let records = feature_records(&articles, vec![vec![0.5, 1.5]]);

        assert_eq!(
            records,
            vec![FeatureRecord {
                category: "sport".into(),
                title: "match".into(),
                features: vec![0.5, 1.5],
                text: "A late goal!".into(),
            }]
        );
    }

    #[test]
    fn provenance_lives_next_to_the_table() {
        assert_eq!(
            Provenance::path_for(Path::new("data/features.csv")),
            PathBuf::from("data/features.json")
        );
    }

    #[test]
    fn saved_provenance_restores_the_stopwords() {
        let dir = tempfile::tempdir().unwrap();
        let path = Provenance::path_for(&dir.path().join("features.csv"));

        Provenance::new("bert-base-cased".into(), 256)
            .with_stopwords(Some(vec!["goal".into(), "late".into()]))
            .save(&path)
            .unwrap();

        let provenance = Provenance::load(&path).unwrap();

        assert_eq!(provenance.model_name, "bert-base-cased");
        assert_eq!(provenance.max_seq_length, 256);
        assert_eq!(
            provenance.preprocessor().preprocess("The late goal, again"),
            "the again"
        );
    }

    #[test]
    fn missing_stopwords_mean_the_english_list() {
        let provenance = Provenance::new("bert-base-uncased".into(), 512);

        assert_eq!(
            provenance.preprocessor().preprocess("The late goal"),
            "late goal"
        );
    }

    #[test]
    fn defaults_encode_one_article_at_a_time() {
        let config = Config::new();

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.output, "features.csv");
        assert_eq!(config.stopwords, None);
    }
}
