//! TF-IDF text featurization.
//!
//! A [`TextFeaturizer`] is fitted once on the training texts: it learns a
//! vocabulary of word n-grams and character n-grams together with their
//! inverse document frequencies. Afterwards [`Featurizer::transform`] maps any
//! text to an L2-normalized sparse [`FeatureVector`] whose dimension never
//! changes. Terms unseen during fitting are ignored, so text without any known
//! term maps to the zero vector.

use std::iter;

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};

use crate::analysis::{Analyzer, AnalyzerOptions, PipelineAnalyzer};
use crate::error::{PolarityError, Result};

const WORD_PREFIX: &str = "w:";
const CHAR_PREFIX: &str = "c:";
const CHAR_PADDING: char = ' ';

/// A sparse vector with a fixed dimension.
///
/// Indices are strictly increasing and every index is below `dimension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// The all-zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a vector from `(index, value)` pairs in any order.
    ///
    /// Repeated indices are summed and explicit zeros dropped.
    pub fn from_sparse(dimension: usize, mut entries: Vec<(u32, f64)>) -> Result<Self> {
        if let Some(&(index, _)) = entries.iter().find(|(i, _)| *i as usize >= dimension) {
            return Err(PolarityError::invalid_input(format!(
                "feature index {index} out of range for dimension {dimension}"
            )));
        }

        entries.sort_unstable_by_key(|(i, _)| *i);
        let mut indices: Vec<u32> = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        for (index, value) in entries {
            match indices.last() {
                Some(&last) if last == index => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    indices.push(index);
                    values.push(value);
                }
            }
        }

        let mut vector = Self {
            dimension,
            indices,
            values,
        };
        vector.drop_zeros();
        Ok(vector)
    }

    /// Build a vector from a dense slice, keeping the non-zero entries.
    pub fn from_dense(dense: &[f64]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i as u32, *v))
            .unzip();
        Self {
            dimension: dense.len(),
            indices,
            values,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over `(index, value)` pairs in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| (i as usize, v))
    }

    /// Value at `index`, zero when not stored.
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&(index as u32)) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product with a dense weight vector.
    ///
    /// # Panics
    ///
    /// Panics if `weights` is shorter than [`Self::dimension`].
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.iter().map(|(i, v)| weights[i] * v).sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// The fixed-length dense representation.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dimension];
        for (i, v) in self.iter() {
            dense[i] = v;
        }
        dense
    }

    fn drop_zeros(&mut self) {
        if self.values.iter().all(|v| *v != 0.0) {
            return;
        }
        let (indices, values) = self
            .indices
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| **v != 0.0)
            .map(|(&i, &v)| (i, v))
            .unzip();
        self.indices = indices;
        self.values = values;
    }

    fn normalize(&mut self) {
        let norm = self.squared_norm().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

/// Maps text to fixed-dimension feature vectors.
pub trait Featurizer: Send + Sync {
    /// Featurize one text. Deterministic for a fitted featurizer.
    fn transform(&self, text: &str) -> Result<FeatureVector>;

    /// Dimension of every vector produced by [`Featurizer::transform`].
    fn dimension(&self) -> usize;

    /// Featurize many texts in parallel, preserving order.
    fn transform_all(&self, texts: &[&str]) -> Result<Vec<FeatureVector>> {
        texts.par_iter().map(|text| self.transform(text)).collect()
    }
}

/// Options controlling vocabulary extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturizerOptions {
    /// How texts are split into words.
    pub analyzer: AnalyzerOptions,
    /// Longest word n-gram; every length from 1 up to this is extracted.
    pub word_ngrams: usize,
    /// Character n-gram length over each padded word, `None` to disable.
    pub char_ngrams: Option<usize>,
    /// Minimum number of training documents a term must occur in.
    pub min_df: usize,
    /// Keep only the most frequent terms when set.
    pub max_features: Option<usize>,
}

impl Default for FeaturizerOptions {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerOptions::default(),
            word_ngrams: 2,
            char_ngrams: Some(3),
            min_df: 1,
            max_features: None,
        }
    }
}

impl FeaturizerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.word_ngrams == 0 {
            return Err(PolarityError::config("featurizer.word_ngrams must be at least 1"));
        }
        if self.char_ngrams == Some(0) {
            return Err(PolarityError::config("featurizer.char_ngrams must be at least 1"));
        }
        if self.min_df == 0 {
            return Err(PolarityError::config("featurizer.min_df must be at least 1"));
        }
        if self.max_features == Some(0) {
            return Err(PolarityError::config("featurizer.max_features must be at least 1"));
        }
        Ok(())
    }

    /// Learn the vocabulary and IDF weights from `texts`.
    pub fn fit<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Result<TextFeaturizer> {
        self.validate()?;
        if texts.is_empty() {
            return Err(PolarityError::invalid_input(
                "cannot fit a featurizer on an empty corpus",
            ));
        }

        let analyzer = self.analyzer.build()?;
        let document_terms: Vec<AHashSet<String>> = texts
            .par_iter()
            .map(|text| {
                extract_terms(self, &analyzer, text.as_ref())
                    .map(|terms| terms.into_iter().collect::<AHashSet<String>>())
            })
            .collect::<Result<_>>()?;

        let mut document_frequency: AHashMap<String, usize> = AHashMap::new();
        for terms in document_terms {
            for term in terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= self.min_df)
            .collect();
        if let Some(limit) = self.max_features {
            if kept.len() > limit {
                kept.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                kept.truncate(limit);
            }
        }
        kept.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let document_count = texts.len();
        let n = document_count as f64;
        let mut vocabulary = AHashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, df)) in kept.into_iter().enumerate() {
            // IDF = ln((N + 1) / (df + 1)) + 1
            idf.push(((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
            vocabulary.insert(term, index as u32);
        }

        Ok(TextFeaturizer {
            options: self.clone(),
            analyzer,
            vocabulary,
            idf,
            document_count,
        })
    }
}

/// A fitted TF-IDF featurizer.
#[derive(Clone, Deserialize)]
#[serde(try_from = "FeaturizerState")]
pub struct TextFeaturizer {
    options: FeaturizerOptions,
    analyzer: PipelineAnalyzer,
    vocabulary: AHashMap<String, u32>,
    idf: Vec<f64>,
    document_count: usize,
}

impl std::fmt::Debug for TextFeaturizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFeaturizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("document_count", &self.document_count)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TextFeaturizer {
    pub fn options(&self) -> &FeaturizerOptions {
        &self.options
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of documents the featurizer was fitted on.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Vocabulary index of `term` (`w:` / `c:` prefixed), if known.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).map(|&i| i as usize)
    }

    /// Vocabulary in index order.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = vec![""; self.vocabulary.len()];
        for (term, &index) in &self.vocabulary {
            terms[index as usize] = term.as_str();
        }
        terms
    }
}

impl Featurizer for TextFeaturizer {
    fn transform(&self, text: &str) -> Result<FeatureVector> {
        let terms = extract_terms(&self.options, &self.analyzer, text)?;
        if terms.is_empty() {
            return Ok(FeatureVector::zeros(self.dimension()));
        }

        let mut counts: AHashMap<u32, usize> = AHashMap::new();
        for term in &terms {
            if let Some(&index) = self.vocabulary.get(term) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }

        let total = terms.len() as f64;
        let entries = counts
            .into_iter()
            .map(|(index, count)| (index, count as f64 / total * self.idf[index as usize]))
            .collect();
        let mut vector = FeatureVector::from_sparse(self.dimension(), entries)?;
        vector.normalize();
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.idf.len()
    }
}

/// Serialized form: terms in index order next to their IDF weights.
#[derive(Serialize)]
struct FeaturizerStateRef<'a> {
    options: &'a FeaturizerOptions,
    terms: Vec<&'a str>,
    idf: &'a [f64],
    document_count: usize,
}

#[derive(Deserialize)]
struct FeaturizerState {
    options: FeaturizerOptions,
    terms: Vec<String>,
    idf: Vec<f64>,
    document_count: usize,
}

impl Serialize for TextFeaturizer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        FeaturizerStateRef {
            options: &self.options,
            terms: self.terms(),
            idf: &self.idf,
            document_count: self.document_count,
        }
        .serialize(serializer)
    }
}

impl TryFrom<FeaturizerState> for TextFeaturizer {
    type Error = PolarityError;

    fn try_from(state: FeaturizerState) -> Result<Self> {
        if state.terms.len() != state.idf.len() {
            return Err(PolarityError::serialization(format!(
                "featurizer has {} terms but {} idf weights",
                state.terms.len(),
                state.idf.len()
            )));
        }
        state.options.validate()?;
        let analyzer = state.options.analyzer.build()?;

        let mut vocabulary = AHashMap::with_capacity(state.terms.len());
        for (index, term) in state.terms.into_iter().enumerate() {
            if vocabulary.insert(term, index as u32).is_some() {
                return Err(PolarityError::serialization("duplicate featurizer term"));
            }
        }

        Ok(Self {
            options: state.options,
            analyzer,
            vocabulary,
            idf: state.idf,
            document_count: state.document_count,
        })
    }
}

/// Word n-grams (`w:` prefix) followed by padded char n-grams (`c:` prefix).
fn extract_terms(
    options: &FeaturizerOptions,
    analyzer: &PipelineAnalyzer,
    text: &str,
) -> Result<Vec<String>> {
    let words = analyzer.terms(text)?;
    let mut terms = Vec::new();

    for n in 1..=options.word_ngrams {
        for window in words.windows(n) {
            terms.push(format!("{WORD_PREFIX}{}", window.join(" ")));
        }
    }

    if let Some(n) = options.char_ngrams {
        for word in &words {
            let padded: Vec<char> = iter::once(CHAR_PADDING)
                .chain(word.chars())
                .chain(iter::once(CHAR_PADDING))
                .collect();
            for window in padded.windows(n) {
                let gram: String = window.iter().collect();
                terms.push(format!("{CHAR_PREFIX}{gram}"));
            }
        }
    }

    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Wow... Loved this place.".to_string(),
            "Crust is not good.".to_string(),
            "The selection on the menu was great and so were the prices.".to_string(),
            "Not tasty and the texture was just nasty.".to_string(),
        ]
    }

    #[test]
    fn test_feature_vector_basics() {
        let v = FeatureVector::from_sparse(5, vec![(3, 2.0), (1, 1.0), (3, 1.0), (4, 0.0)]).unwrap();
        assert_eq!(v.dimension(), 5);
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.to_dense(), vec![0.0, 1.0, 0.0, 3.0, 0.0]);
        assert_eq!(v.get(3), 3.0);
        assert_eq!(v.get(2), 0.0);
        assert_eq!(v.dot(&[1.0, 2.0, 3.0, 4.0, 5.0]), 14.0);
        assert_eq!(v.squared_norm(), 10.0);
        assert_eq!(FeatureVector::from_dense(&v.to_dense()), v);

        assert!(FeatureVector::from_sparse(2, vec![(2, 1.0)]).is_err());
        assert!(FeatureVector::zeros(4).is_zero());
    }

    #[test]
    fn test_fit_and_transform() {
        let featurizer = FeaturizerOptions::default().fit(&corpus()).unwrap();
        assert!(featurizer.vocabulary_size() > 0);
        assert_eq!(featurizer.document_count(), 4);
        assert!(featurizer.term_index("w:loved").is_some());
        assert!(featurizer.term_index("w:not good").is_some());
        assert!(featurizer.term_index("c:ove").is_some());

        let v = featurizer.transform("not good at all").unwrap();
        assert_eq!(v.dimension(), featurizer.dimension());
        assert!((v.squared_norm() - 1.0).abs() < 1e-12);
        assert!(v.get(featurizer.term_index("w:not good").unwrap()) > 0.0);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let a = FeaturizerOptions::default().fit(&corpus()).unwrap();
        let b = FeaturizerOptions::default().fit(&corpus()).unwrap();
        assert_eq!(a.terms(), b.terms());
        let text = "the prices were not great";
        assert_eq!(a.transform(text).unwrap(), b.transform(text).unwrap());
    }

    #[test]
    fn test_empty_and_unknown_text_is_zero_vector() {
        let featurizer = FeaturizerOptions::default().fit(&corpus()).unwrap();
        for text in ["", "   ", "...!!", "zzzz qqqq"] {
            let v = featurizer.transform(text).unwrap();
            assert!(v.is_zero(), "{text:?}");
            assert_eq!(v.dimension(), featurizer.dimension());
        }
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let texts: Vec<String> = Vec::new();
        assert!(matches!(
            FeaturizerOptions::default().fit(&texts),
            Err(PolarityError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_pruning() {
        let options = FeaturizerOptions {
            char_ngrams: None,
            word_ngrams: 1,
            min_df: 2,
            ..FeaturizerOptions::default()
        };
        let featurizer = options.fit(&corpus()).unwrap();
        // Only words that occur in at least two documents survive.
        assert!(featurizer.term_index("w:the").is_some());
        assert!(featurizer.term_index("w:not").is_some());
        assert!(featurizer.term_index("w:crust").is_none());

        let options = FeaturizerOptions {
            max_features: Some(3),
            ..FeaturizerOptions::default()
        };
        assert_eq!(options.fit(&corpus()).unwrap().dimension(), 3);
    }

    #[test]
    fn test_invalid_options() {
        let options = FeaturizerOptions {
            word_ngrams: 0,
            ..FeaturizerOptions::default()
        };
        assert!(matches!(options.validate(), Err(PolarityError::Config(_))));
        let options = FeaturizerOptions {
            char_ngrams: Some(0),
            ..FeaturizerOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_serde_rebuilds_analyzer() {
        let featurizer = FeaturizerOptions::default().fit(&corpus()).unwrap();
        let bytes = bincode::serialize(&featurizer).unwrap();
        let restored: TextFeaturizer = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.terms(), featurizer.terms());
        let text = "Loved the crust";
        assert_eq!(
            restored.transform(text).unwrap(),
            featurizer.transform(text).unwrap()
        );
    }
}
