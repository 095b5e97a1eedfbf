pub mod classify;
pub mod config;
pub mod error;
pub mod fusion;
pub mod index;
pub mod normalizer;
pub mod optimize;
pub mod persist;
pub mod sparse;
pub mod vocabulary;

pub use classify::{AlphaProfile, QueryCategory, QueryClassifier};
pub use config::EngineConfig;
pub use error::EngineError;
pub use index::{HybridIndex, MetadataFilter, QueryHit};
pub use normalizer::{Normalizer, NormalizerConfig};
pub use optimize::{AlphaGrid, AlphaOptimizer, LabeledQuery};
pub use sparse::{Bm25Config, SparseVector, SparseVectorizer};
pub use vocabulary::{TermId, Vocabulary};
