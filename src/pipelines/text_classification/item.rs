use std::fmt::Debug;

/// Something with text and a genre, usable for fine-tuning
pub trait Item: Send + Sync + Clone + Debug {
    /// The text to classify
    fn input(&self) -> &str;

    /// The genre name
    fn class_label(&self) -> &str;
}
