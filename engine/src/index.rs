use crate::classify::{AlphaProfile, QueryCategory, QueryClassifier};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fusion;
use crate::normalizer::Normalizer;
use crate::sparse::{SparseVector, SparseVectorizer};
use crate::vocabulary::{TermId, Vocabulary};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One stored passage: sparse and dense representations plus pass-through
/// metadata. The normalized token multiset itself is not kept; its length
/// suffices for BM25 length normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageRecord {
    pub sparse: SparseVector,
    pub dense: Vec<f32>,
    pub token_len: u32,
    pub metadata: HashMap<String, String>,
}

/// Exact-match predicate over stored passage metadata; every pair must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter(HashMap<String, String>);

impl MetadataFilter {
    pub fn new<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self(pairs.into_iter().collect())
    }

    /// Parse `key=value` expressions, e.g. from CLI flags.
    pub fn parse<I, S>(exprs: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs = HashMap::new();
        for expr in exprs {
            let expr = expr.as_ref();
            let (key, value) = expr
                .split_once('=')
                .ok_or_else(|| EngineError::MetadataFilter(expr.to_string()))?;
            if key.is_empty() {
                return Err(EngineError::MetadataFilter(expr.to_string()));
            }
            pairs.insert(key.to_string(), value.to_string());
        }
        Ok(Self(pairs))
    }

    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(k, v)| metadata.get(k).is_some_and(|m| m == v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One ranked query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Serializable view of the whole index for snapshot persistence.
/// Reconstructing an index from this is a pure load.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub dimension: usize,
    pub vocabulary: Vocabulary,
    pub passages: HashMap<String, PassageRecord>,
    pub profile: AlphaProfile,
}

#[derive(Debug, Default)]
struct IndexState {
    vocabulary: Vocabulary,
    passages: HashMap<String, PassageRecord>,
    // Sum of token lengths over live passages; with `passages.len()` this
    // gives the running average recomputed on every add/remove.
    live_token_len: u64,
}

impl IndexState {
    fn avg_passage_len(&self) -> f32 {
        if self.passages.is_empty() {
            0.0
        } else {
            self.live_token_len as f32 / self.passages.len() as f32
        }
    }
}

/// In-memory hybrid index over sparse (BM25) and dense (cosine) signals.
///
/// Single-writer-multiple-reader: one `RwLock` owns vocabulary mutation and
/// the average-length statistic; queries take the read side only and scan
/// candidates in parallel. Dense dimension is fixed at creation and checked
/// on every upsert.
pub struct HybridIndex {
    dimension: usize,
    normalizer: Normalizer,
    vectorizer: SparseVectorizer,
    classifier: QueryClassifier,
    state: RwLock<IndexState>,
    profile: RwLock<AlphaProfile>,
}

impl HybridIndex {
    pub fn new(dimension: usize, config: EngineConfig) -> Self {
        Self {
            dimension,
            normalizer: Normalizer::new(config.normalizer),
            vectorizer: SparseVectorizer::new(config.bm25),
            classifier: QueryClassifier::new(&config.concepts),
            state: RwLock::new(IndexState::default()),
            profile: RwLock::new(config.profile),
        }
    }

    /// Rebuild an index from a snapshot. The snapshot's dimension and tuned
    /// profile win over whatever the config carries.
    pub fn from_snapshot(snapshot: IndexSnapshot, config: EngineConfig) -> Self {
        let live_token_len = snapshot
            .passages
            .values()
            .map(|p| u64::from(p.token_len))
            .sum();
        Self {
            dimension: snapshot.dimension,
            normalizer: Normalizer::new(config.normalizer),
            vectorizer: SparseVectorizer::new(config.bm25),
            classifier: QueryClassifier::new(&config.concepts),
            state: RwLock::new(IndexState {
                vocabulary: snapshot.vocabulary,
                passages: snapshot.passages,
                live_token_len,
            }),
            profile: RwLock::new(snapshot.profile),
        }
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            dimension: self.dimension,
            vocabulary: state.vocabulary.clone(),
            passages: state.passages.clone(),
            profile: self.profile.read().clone(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.state.read().passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().passages.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.state.read().vocabulary.size()
    }

    pub fn avg_passage_len(&self) -> f32 {
        self.state.read().avg_passage_len()
    }

    /// Store or replace a passage. Replacement is atomic from the caller's
    /// perspective and leaves corpus statistics exactly as if the new text
    /// had been ingested into the old passage's slot, so a repeated upsert
    /// of identical input is a true no-op for ranking.
    pub fn upsert(
        &self,
        id: impl Into<String>,
        text: &str,
        dense: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> Result<(), EngineError> {
        if dense.len() != self.dimension {
            return Err(EngineError::DimensionMismatch {
                expected: self.dimension,
                got: dense.len(),
            });
        }
        let id = id.into();
        let tokens = self.normalizer.normalize(text);

        let mut state = self.state.write();
        let replaced = match state.passages.remove(&id) {
            Some(old) => {
                // Undo the old record's df contribution; its distinct-term
                // set is exactly the sparse vector's key set. The passage
                // counter keeps counting the slot.
                let old_terms: Vec<TermId> = old.sparse.term_ids().collect();
                state.vocabulary.unrecord_terms(old_terms);
                state.live_token_len -= u64::from(old.token_len);
                true
            }
            None => false,
        };

        let mut tf: HashMap<TermId, u32> = HashMap::new();
        for token in &tokens {
            let term_id = state.vocabulary.intern(token);
            *tf.entry(term_id).or_insert(0) += 1;
        }
        let distinct: Vec<TermId> = tf.keys().copied().collect();
        if replaced {
            state.vocabulary.record_terms(distinct);
        } else {
            state.vocabulary.record_passage(distinct);
        }
        state.live_token_len += tokens.len() as u64;

        let avg = state.live_token_len as f32 / (state.passages.len() + 1) as f32;
        let sparse = self
            .vectorizer
            .vectorize(&tf, tokens.len(), avg, &state.vocabulary);
        state.passages.insert(
            id.clone(),
            PassageRecord {
                sparse,
                dense,
                token_len: tokens.len() as u32,
                metadata,
            },
        );
        debug!(%id, tokens = tokens.len(), replaced, "passage upserted");
        Ok(())
    }

    /// Remove a passage. Idempotent: deleting an unknown id is a no-op
    /// success. Vocabulary document frequencies are not decremented.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.state.write();
        match state.passages.remove(id) {
            Some(old) => {
                state.live_token_len -= u64::from(old.token_len);
                debug!(%id, "passage deleted");
                true
            }
            None => false,
        }
    }

    /// Which alpha bucket a raw query falls into.
    pub fn classify(&self, raw_query: &str) -> QueryCategory {
        self.classifier.classify(raw_query)
    }

    pub fn alpha_profile(&self) -> AlphaProfile {
        self.profile.read().clone()
    }

    /// Fold tuned per-category alphas into the serving profile.
    pub fn apply_tuned_alphas(&self, tuned: &BTreeMap<QueryCategory, f32>) {
        self.profile.write().apply(tuned);
    }

    /// Rank passages against a hybrid query.
    ///
    /// With `alpha: None` the classifier picks the per-category default.
    /// Results are descending by combined score, ties broken by ascending
    /// id, at most `top_k` long. Read-only; an empty index yields an empty
    /// list for any valid alpha.
    pub fn query(
        &self,
        text: &str,
        dense: &[f32],
        alpha: Option<f32>,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, EngineError> {
        let alpha = match alpha {
            Some(a) => {
                fusion::validate_alpha(a)?;
                a
            }
            None => {
                let category = self.classifier.classify(text);
                let a = self.profile.read().alpha_for(category);
                debug!(%category, alpha = a, "alpha selected from profile");
                a
            }
        };

        let state = self.state.read();
        if state.passages.is_empty() {
            return Ok(Vec::new());
        }
        if dense.len() != self.dimension {
            return Err(EngineError::DimensionMismatch {
                expected: self.dimension,
                got: dense.len(),
            });
        }

        let tokens = self.normalizer.normalize(text);
        let tf = SparseVectorizer::term_frequencies(&tokens, &state.vocabulary);
        let query_sparse = self.vectorizer.vectorize(
            &tf,
            tokens.len(),
            state.avg_passage_len(),
            &state.vocabulary,
        );

        // Parallel candidate scan; raw sparse dot products are normalized
        // query-locally afterwards so both signals share the [0, 1] scale.
        let candidates: Vec<(&String, &PassageRecord, f32, f32)> = state
            .passages
            .par_iter()
            .filter(|(_, record)| filter.map_or(true, |f| f.matches(&record.metadata)))
            .map(|(id, record)| {
                let dense_sim =
                    fusion::rescale_cosine(fusion::cosine_similarity(dense, &record.dense));
                let sparse_dot = query_sparse.dot(&record.sparse);
                (id, record, dense_sim, sparse_dot)
            })
            .collect();

        let mut sparse_scores: Vec<f32> = candidates.iter().map(|c| c.3).collect();
        fusion::normalize_sparse_scores(&mut sparse_scores);

        let mut hits: Vec<QueryHit> = candidates
            .into_iter()
            .zip(sparse_scores)
            .map(|((id, record, dense_sim, _), sparse_norm)| QueryHit {
                id: id.clone(),
                score: fusion::combine(dense_sim, sparse_norm, alpha),
                metadata: record.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}
