use async_trait::async_trait;

use crate::error::SearchResult;

/// Trait for text embedding backends
///
/// The indexing and search paths only need a vector per text; how it is
/// produced (a local sentence-transformer service, a hosted API) is up to the
/// implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>>;
}
