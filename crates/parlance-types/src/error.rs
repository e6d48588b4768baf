use thiserror::Error;

/// Errors from the durable conversation store (used by trait definitions in
/// parlance-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation not found")]
    NotFound,

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),
}

/// Errors from the cache backend.
///
/// These never escape the cache-aside layer: reads degrade to the durable
/// store and invalidations are best-effort.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache encoding error: {0}")]
    Encoding(String),
}

/// Errors from the remote text-generation service.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation timed out")]
    Timeout,

    #[error("generation transport error: {0}")]
    Transport(String),

    #[error("generation service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Errors from the chat orchestrator.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation not found")]
    NotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerateError),
}
