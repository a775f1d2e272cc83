/// BERT variants
pub mod bert;

/// Lightweight classifier heads over pooled features
pub mod heads;
