use std::fmt::Display;

/// The unique string token that identifies the feature head pipeline
pub static FEATURE_CLASSIFICATION: &str = "feature-classification";

/// The unique string token that identifies the fine-tuning pipeline
pub static TEXT_CLASSIFICATION: &str = "text-classification";

/// Available Pipelines
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// A head trained on extracted features
    FeatureClassification,

    /// End-to-end fine-tuning
    TextClassification,
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == FEATURE_CLASSIFICATION {
            Ok(Pipeline::FeatureClassification)
        } else if value == TEXT_CLASSIFICATION {
            Ok(Pipeline::TextClassification)
        } else {
            Err(PipelineError::Unknown(value.to_string()))
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pipeline::FeatureClassification => FEATURE_CLASSIFICATION,
            Pipeline::TextClassification => TEXT_CLASSIFICATION,
        };

        write!(f, "{}", name)
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),
}
