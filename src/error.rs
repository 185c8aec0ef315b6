use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for the cache manager.
///
/// Query-time anomalies (CNAME loops, oversize DNAME substitution, hop
/// exhaustion) are deliberately not represented here: the spec treats
/// them as soft failures that truncate assembly rather than propagate.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CacheError::InvalidInput(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        CacheError::CorruptSnapshot(msg.into())
    }
}
