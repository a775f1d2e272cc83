//! Text normalization applied before feature extraction

use std::{collections::HashSet, path::Path};

use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::files::read_file;

/// The NLTK English stopword list
pub static ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

lazy_static! {
    /// Anything that is neither a word character nor whitespace
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").expect("punctuation regex");

    static ref ENGLISH: HashSet<String> =
        ENGLISH_STOPWORDS.iter().map(|word| word.to_string()).collect();
}

/// Lowercases text, strips punctuation and drops stopwords
#[derive(Debug, Clone)]
pub struct Preprocessor {
    stopwords: HashSet<String>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            stopwords: ENGLISH.clone(),
        }
    }
}

impl Preprocessor {
    /// Create a preprocessor with a custom stopword set
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        Self { stopwords }
    }

    /// Load a stopword list with one word per line
    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let words = read_file(path)
            .await
            .map_err(|e| anyhow!("Unable to read stopwords from {}: {}", path.display(), e))?;

        Ok(Self::new(words))
    }

    /// The stopword set, sorted
    pub fn stopwords(&self) -> Vec<String> {
        let mut words: Vec<String> = self.stopwords.iter().cloned().collect();
        words.sort();

        words
    }

    /// Whether a token is dropped
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Normalize text into a space-separated token stream
    pub fn preprocess(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = PUNCTUATION.replace_all(&text, "");

        text.split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Preprocess text with the English stopword list
pub fn preprocess_text(text: &str) -> String {
    Preprocessor::default().preprocess(text)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(
            preprocess_text("Hello, World! Markets rallied -- sharply."),
            "hello world markets rallied sharply"
        );
    }

    #[test]
    fn drops_stopwords() {
        assert_eq!(
            preprocess_text("The striker was on the bench for the final"),
            "striker bench final"
        );
    }

    #[test]
    fn contractions_collapse_before_filtering() {
        // "don't" loses its apostrophe and no longer matches the stopword "don't"
        assert_eq!(preprocess_text("I don't know"), "dont know");
    }

    #[test]
    fn keeps_digits_underscores_and_accents() {
        assert_eq!(preprocess_text("Café_2024 scored 3-1"), "café_2024 scored 31");
    }

    #[test]
    fn empty_and_stopword_only_text_is_empty() {
        assert_eq!(preprocess_text(""), "");
        assert_eq!(preprocess_text("The, and; of!"), "");
    }

    #[test]
    fn custom_stopwords_replace_the_default() {
        let preprocessor = Preprocessor::new(["Striker", " bench "]);

        assert_eq!(
            preprocessor.preprocess("The striker was on the bench"),
            "the was on the"
        );
    }

    #[test]
    fn stopword_list_rebuilds_the_same_preprocessor() {
        let preprocessor = Preprocessor::new(["Striker", "bench"]);
        let rebuilt = Preprocessor::new(preprocessor.stopwords());

        assert_eq!(preprocessor.stopwords(), vec!["bench", "striker"]);
        assert_eq!(
            rebuilt.preprocess("The striker was on the bench"),
            preprocessor.preprocess("The striker was on the bench")
        );
    }

    #[test]
    fn english_list_matches_nltk_size() {
        assert_eq!(ENGLISH.len(), 179);
    }
}
