/// Model Variants
/// --------------

/// bert-base-uncased
pub static BASE_UNCASED: &str = "bert-base-uncased";

/// bert-base-cased
pub static BASE_CASED: &str = "bert-base-cased";

/// All available BERT models
pub static ALL_MODELS: &[&str; 2] = &[BASE_UNCASED, BASE_CASED];

/// The default encoder for every pipeline
pub static DEFAULT_MODEL: &str = BASE_UNCASED;
