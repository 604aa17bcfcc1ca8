mod http;
mod provider;

pub use http::{DEFAULT_DIMENSION, EmbeddingConfig, HttpEmbeddingProvider};
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub use provider::MockEmbeddingProvider;
