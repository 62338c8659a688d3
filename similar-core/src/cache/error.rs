use crate::embedding::EmbeddingError;

/// Errors that can occur while resolving an embedding through the cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The image is missing, its metadata is unavailable, or it could not be decoded.
    #[error("Unreadable image at path: {path}")]
    UnreadableImage { path: String, #[source] source: anyhow::Error },
    #[error("Error embedding image at path: {path}")]
    Embedding { path: String, #[source] source: EmbeddingError },
    /// The backing cache file could not be read, parsed or written.
    #[error("Error during operation: {operation} on cache file: {path}")]
    CacheIO { path: String, operation: &'static str, #[source] source: anyhow::Error },
}
