use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SearchResult;
use crate::models::{Item, SearchMatch, SearchQuery, StoreBackend};

/// Storage trait for remote vector databases
///
/// `collection` names a Pinecone index or a Milvus collection. Writes are
/// upserts keyed by [`Item::id`]: writing the same id twice overwrites.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Nearest-neighbour search, results in the store's ranking order
    async fn search(&self, collection: &str, query: SearchQuery)
    -> SearchResult<Vec<SearchMatch>>;

    /// Upsert a non-empty batch, returning the number of items written
    async fn upsert(&self, collection: &str, items: Vec<Item>) -> SearchResult<u64>;

    /// Cheap reachability probe used by readiness checks
    async fn health_check(&self) -> SearchResult<()>;
}

/// Shared stores (e.g. one client behind both handlers and readiness checks)
#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for Arc<T> {
    fn backend(&self) -> StoreBackend {
        (**self).backend()
    }

    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> SearchResult<Vec<SearchMatch>> {
        (**self).search(collection, query).await
    }

    async fn upsert(&self, collection: &str, items: Vec<Item>) -> SearchResult<u64> {
        (**self).upsert(collection, items).await
    }

    async fn health_check(&self) -> SearchResult<()> {
        (**self).health_check().await
    }
}
