use crate::classify::{AlphaProfile, QueryClassifier};
use crate::normalizer::NormalizerConfig;
use crate::sparse::Bm25Config;
use serde::{Deserialize, Serialize};

/// Everything tunable about the engine, with the documented defaults.
///
/// One config produces one engine; the normalizer settings in particular
/// must not differ between ingestion and query, which the index enforces by
/// owning a single `Normalizer` built from this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub normalizer: NormalizerConfig,
    pub bm25: Bm25Config,
    /// Concept dictionary for the query classifier.
    pub concepts: Vec<String>,
    /// Starting per-category fusion weights; overwritten by tuning.
    pub profile: AlphaProfile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            bm25: Bm25Config::default(),
            concepts: QueryClassifier::default_concepts(),
            profile: AlphaProfile::default(),
        }
    }
}
