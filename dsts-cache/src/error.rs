use thiserror::Error;

/// Cache failures are never surfaced to a request as a failure — callers
/// catch this, count it, and fall back to the authoritative store (spec
/// §4.4). It exists as its own type so that boundary is explicit at every
/// call site instead of being silently swallowed inside the trait impls.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
