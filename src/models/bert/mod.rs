/// Reading pretrained BERT weights
pub mod loader;

/// BERT for Text Classification (such as genre classification)
pub mod text_classification;

pub use loader::{load_pretrained_config, load_pretrained_record};
