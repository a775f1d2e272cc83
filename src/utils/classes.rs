use std::{
    collections::{BTreeMap, BTreeSet},
    hash::Hash,
};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// A bijective mapping between category names and contiguous class ids.
///
/// Ids are assigned in lexicographic order of the category names, so fitting the same set of
/// categories always yields the same mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    id2label: BTreeMap<usize, String>,
    label2id: BTreeMap<String, usize>,
}

impl LabelEncoder {
    /// Fit the encoder to the observed labels
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .collect();

        Self::from_id2label(unique.into_iter().enumerate().collect())
    }

    /// Rebuild an encoder from a persisted id to label map
    pub fn from_id2label(id2label: BTreeMap<usize, String>) -> Self {
        let label2id = invert_map(id2label.clone());

        Self { id2label, label2id }
    }

    /// The class id of a label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.label2id.get(label.trim()).copied()
    }

    /// Encode every label, failing on the first unknown one
    pub fn encode_all<I, S>(&self, labels: I) -> anyhow::Result<Vec<usize>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| {
                let label = label.as_ref();
                self.encode(label)
                    .ok_or_else(|| anyhow!("Unknown class label: {}", label))
            })
            .collect()
    }

    /// The label of a class id
    pub fn decode(&self, id: usize) -> Option<&str> {
        self.id2label.get(&id).map(String::as_str)
    }

    /// The number of classes
    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    /// Whether no classes were observed
    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }

    /// A map from class ids to class name labels
    pub fn id2label(&self) -> &BTreeMap<usize, String> {
        &self.id2label
    }
}

/// Inverse-frequency class weights, normalized to sum to one.
///
/// Classes that never occur are counted once so their weight stays finite.
pub fn class_weights(labels: &[usize], n_classes: usize) -> Vec<f32> {
    let size = labels
        .iter()
        .map(|label| label + 1)
        .max()
        .unwrap_or(0)
        .max(n_classes);

    let mut counts = vec![0usize; size];
    for &label in labels {
        counts[label] += 1;
    }

    let inverse: Vec<f64> = counts
        .into_iter()
        .map(|count| 1.0 / count.max(1) as f64)
        .collect();

    let total: f64 = inverse.iter().sum();

    inverse
        .into_iter()
        .map(|weight| (weight / total) as f32)
        .collect()
}
