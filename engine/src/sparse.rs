use crate::vocabulary::{TermId, Vocabulary};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// BM25 tuning constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Passage-length normalization strength.
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// A `term_id → weight` mapping; absent ids implicitly weigh zero.
///
/// Produced once per passage at ingestion and once per query at query time,
/// then never mutated. The key set doubles as the passage's distinct-term
/// set, which upsert-replacement uses for document-frequency bookkeeping.
/// Backed by a `BTreeMap` so iteration (and thus dot-product summation)
/// order is deterministic across instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector(BTreeMap<TermId, f32>);

impl SparseVector {
    pub fn weight(&self, term_id: TermId) -> f32 {
        self.0.get(&term_id).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn term_ids(&self) -> impl Iterator<Item = TermId> + '_ {
        self.0.keys().copied()
    }

    /// Dot product; iterates the smaller side.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (small, large) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        small
            .iter()
            .filter_map(|(id, w)| large.get(id).map(|v| w * v))
            .sum()
    }
}

impl FromIterator<(TermId, f32)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (TermId, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Smoothed BM25 idf; strictly positive, monotonically decreasing in df.
pub fn idf(df: u32, total_passages: u32) -> f32 {
    let n = total_passages as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Converts token sequences into BM25-weighted sparse vectors.
///
/// Pure: given identical tokens, lengths, and vocabulary state, the output
/// is bit-identical. Query-side vectors use the corpus idf, which is what
/// makes them comparable with passage vectors via dot product.
#[derive(Debug, Clone, Default)]
pub struct SparseVectorizer {
    config: Bm25Config,
}

impl SparseVectorizer {
    pub fn new(config: Bm25Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Bm25Config {
        &self.config
    }

    /// Raw term frequencies of `tokens` resolved against the vocabulary.
    /// Out-of-vocabulary tokens are skipped (they would weigh zero anyway).
    pub fn term_frequencies(tokens: &[String], vocabulary: &Vocabulary) -> HashMap<TermId, u32> {
        let mut tf = HashMap::new();
        for token in tokens {
            if let Some(id) = vocabulary.term_id(token) {
                *tf.entry(id).or_insert(0) += 1;
            }
        }
        tf
    }

    /// BM25-weight the given term frequencies.
    ///
    /// `passage_len` is the token count of the text being vectorized (the
    /// query's own length on the query path); `avg_passage_len` is the
    /// corpus-wide running statistic. An empty corpus yields an all-zero
    /// vector, which is documented behavior rather than an error.
    pub fn vectorize(
        &self,
        term_frequencies: &HashMap<TermId, u32>,
        passage_len: usize,
        avg_passage_len: f32,
        vocabulary: &Vocabulary,
    ) -> SparseVector {
        let n = vocabulary.total_passages();
        if n == 0 {
            return SparseVector::default();
        }
        let k1 = self.config.k1;
        let b = self.config.b;
        let len_ratio = if avg_passage_len > 0.0 {
            passage_len as f32 / avg_passage_len
        } else {
            1.0
        };
        term_frequencies
            .iter()
            .map(|(&id, &f)| {
                let f = f as f32;
                let tf_weight = f * (k1 + 1.0) / (f + k1 * (1.0 - b + b * len_ratio));
                let weight = idf(vocabulary.document_frequency(id), n) * tf_weight;
                (id, weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus_vocabulary() -> Vocabulary {
        let mut v = Vocabulary::new();
        let rare = v.intern("monadismus");
        let common = v.intern("denken");
        v.record_passage([common]);
        v.record_passage([common]);
        v.record_passage([rare, common]);
        v
    }

    #[test]
    fn idf_is_monotonic_in_df() {
        let n = 100;
        let mut prev = f32::INFINITY;
        for df in [1, 5, 20, 60, 100] {
            let cur = idf(df, n);
            assert!(cur <= prev, "idf must not increase with df");
            assert!(cur > 0.0);
            prev = cur;
        }
    }

    #[test]
    fn rare_terms_outweigh_common_terms() {
        let v = corpus_vocabulary();
        let rare = v.term_id("monadismus").unwrap();
        let common = v.term_id("denken").unwrap();
        let vectorizer = SparseVectorizer::default();
        let tf = HashMap::from([(rare, 1), (common, 1)]);
        let sv = vectorizer.vectorize(&tf, 2, 2.0, &v);
        assert!(sv.weight(rare) > sv.weight(common));
    }

    #[test]
    fn vectorize_is_deterministic() {
        let v = corpus_vocabulary();
        let rare = v.term_id("monadismus").unwrap();
        let common = v.term_id("denken").unwrap();
        let vectorizer = SparseVectorizer::default();
        let tf = HashMap::from([(rare, 2), (common, 3)]);
        let a = vectorizer.vectorize(&tf, 5, 4.2, &v);
        let b = vectorizer.vectorize(&tf, 5, 4.2, &v);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_corpus_yields_zero_vector() {
        let v = Vocabulary::new();
        let vectorizer = SparseVectorizer::default();
        let sv = vectorizer.vectorize(&HashMap::new(), 0, 0.0, &v);
        assert!(sv.is_empty());
    }

    #[test]
    fn oov_terms_are_skipped() {
        let v = corpus_vocabulary();
        let tokens = vec!["denken".to_string(), "unbekanntes".to_string()];
        let tf = SparseVectorizer::term_frequencies(&tokens, &v);
        assert_eq!(tf.len(), 1);
    }

    #[test]
    fn dot_product_over_shared_terms() {
        let a: SparseVector = [(0, 1.0), (1, 2.0)].into_iter().collect();
        let b: SparseVector = [(1, 3.0), (2, 5.0)].into_iter().collect();
        assert!((a.dot(&b) - 6.0).abs() < f32::EPSILON);
        assert_eq!(a.dot(&SparseVector::default()), 0.0);
    }
}
