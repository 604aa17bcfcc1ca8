mod milvus;
mod pinecone;
mod repository;

pub use milvus::{FieldKind, MetricType, MilvusCollection, MilvusConfig, MilvusStore};
pub use pinecone::{PineconeConfig, PineconeStore};
pub use repository::VectorStore;

#[cfg(test)]
pub use repository::MockVectorStore;
