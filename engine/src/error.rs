/// Structural contract violations surfaced to callers.
///
/// Degraded-quality situations (out-of-vocabulary query terms, an empty
/// corpus) are documented behavior and never produce an error; deleting an
/// unknown id is a no-op success.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A dense vector did not match the dimension fixed at index creation.
    #[error("dense vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Alpha supplied outside the valid [0, 1] fusion range.
    #[error("alpha {0} outside [0, 1]")]
    InvalidAlpha(f32),
    /// A metadata filter expression could not be parsed.
    #[error("malformed metadata filter: {0}")]
    MetadataFilter(String),
}
