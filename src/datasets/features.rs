use std::path::Path;

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use serde::{Deserialize, Serialize};

use super::LoadableDataset;

/// An article together with its pooled encoder features
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureRecord {
    /// The category (genre) name
    pub category: String,

    /// The article title
    pub title: String,

    /// The pooled feature vector
    pub features: Vec<f32>,

    /// The raw article text
    pub text: String,
}

/// The on-disk CSV layout of a feature record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Row {
    category: Option<String>,
    title: Option<String>,
    features: Option<String>,
    text: Option<String>,
}

/// Feature table errors
#[derive(thiserror::Error, Debug)]
pub enum FeatureTableError {
    /// The file could not be read or written as CSV
    #[error("feature table I/O failed: {0}")]
    Csv(#[from] csv::Error),

    /// A feature string contained something other than numbers
    #[error("row {row}: malformed feature value {value:?}")]
    Parse {
        /// The 1-based data row
        row: usize,
        /// The offending token
        value: String,
    },

    /// A row's vector length differs from the first row's
    #[error("row {row}: expected {expected} features, found {found}")]
    Dimension {
        /// The 1-based data row
        row: usize,
        /// The width of the first row
        expected: usize,
        /// The width of this row
        found: usize,
    },

    /// No complete rows were found
    #[error("the feature table has no complete rows")]
    Empty,
}

/// Render a vector as a bracketed, space-separated list: `[0.1 -2 3.5]`
pub fn format_vector(values: &[f32]) -> String {
    let body = values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    format!("[{}]", body)
}

/// Parse a bracketed, whitespace-separated list of numbers.
///
/// Line breaks inside the brackets are accepted, as written by array printers that wrap long
/// vectors.
pub fn parse_vector(value: &str) -> Result<Vec<f32>, String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split_whitespace()
        .map(|token| token.parse::<f32>().map_err(|_| token.to_string()))
        .collect()
}

/// The table of extracted features
pub struct FeatureTable {
    dataset: InMemDataset<FeatureRecord>,
    dim: usize,
}

impl dataset::Dataset<FeatureRecord> for FeatureTable {
    fn get(&self, index: usize) -> Option<FeatureRecord> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl FeatureTable {
    /// Validate records and wrap them in a table
    pub fn new(records: Vec<FeatureRecord>) -> Result<Self, FeatureTableError> {
        let dim = records
            .first()
            .map(|record| record.features.len())
            .ok_or(FeatureTableError::Empty)?;

        for (index, record) in records.iter().enumerate() {
            if record.features.len() != dim {
                return Err(FeatureTableError::Dimension {
                    row: index + 1,
                    expected: dim,
                    found: record.features.len(),
                });
            }
        }

        Ok(Self {
            dataset: InMemDataset::new(records),
            dim,
        })
    }

    /// The width of every feature vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Read a table, skipping rows with missing fields
    pub fn read(path: &Path) -> Result<Self, FeatureTableError> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let mut records = Vec::new();
        let mut dim = None;

        for (index, row) in reader.deserialize::<Row>().enumerate() {
            let row_number = index + 1;

            let (category, title, features, text) = match row? {
                Row {
                    category: Some(category),
                    title: Some(title),
                    features: Some(features),
                    text: Some(text),
                } => (category, title, features, text),
                _ => {
                    log::warn!("Skipping incomplete feature row {}", row_number);
                    continue;
                }
            };

            let features = parse_vector(&features).map_err(|value| FeatureTableError::Parse {
                row: row_number,
                value,
            })?;

            match dim {
                None => dim = Some(features.len()),
                Some(expected) if expected != features.len() => {
                    return Err(FeatureTableError::Dimension {
                        row: row_number,
                        expected,
                        found: features.len(),
                    });
                }
                Some(_) => {}
            }

            records.push(FeatureRecord {
                category,
                title,
                features,
                text,
            });
        }

        log::info!("Read {} feature rows from {}", records.len(), path.display());

        Self::new(records)
    }

    /// Write records with the header `Category,Title,Features,Text`
    pub fn write<'a, I>(path: &Path, records: I) -> Result<usize, FeatureTableError>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        let mut writer = csv::Writer::from_path(path)?;
        let mut count = 0;

        for record in records {
            writer.serialize(Row {
                category: Some(record.category.clone()),
                title: Some(record.title.clone()),
                features: Some(format_vector(&record.features)),
                text: Some(record.text.clone()),
            })?;
            count += 1;
        }

        writer.flush().map_err(csv::Error::from)?;

        Ok(count)
    }

    /// The feature rows, in table order
    pub fn features(&self) -> Vec<Vec<f32>> {
        self.iter().map(|record| record.features).collect()
    }

    /// The category labels, in table order
    pub fn categories(&self) -> Vec<String> {
        self.iter().map(|record| record.category).collect()
    }
}

#[async_trait]
impl LoadableDataset<FeatureRecord> for FeatureTable {
    async fn load(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::read(path)?)
    }
}
