use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::embedding::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};
use crate::models::{Item, Metadata, SearchMatch, SearchQuery};
use crate::store::VectorStore;

/// Text search and single-document upload on top of one vector store
///
/// Queries and documents are embedded with the configured provider before
/// they reach the store.
pub struct SearchService<S: VectorStore> {
    store: S,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl<S: VectorStore> SearchService<S> {
    pub fn new(store: S, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed `text` and return the `top_k` nearest items in `collection`.
    #[instrument(skip(self, text, output_fields), fields(backend = %self.store.backend()))]
    pub async fn search_text(
        &self,
        collection: &str,
        text: &str,
        top_k: u32,
        filter: Option<String>,
        output_fields: Vec<String>,
    ) -> SearchResult<Vec<SearchMatch>> {
        if text.trim().is_empty() {
            return Err(SearchError::Validation(
                "Search query is required".to_string(),
            ));
        }

        let vector = self.embedder.embed(text).await?;
        let query = SearchQuery::new(vector, top_k)
            .with_filter(filter)
            .with_output_fields(output_fields);

        self.store.search(collection, query).await
    }

    /// Embed and store one document; `metadata.id` becomes the item id.
    #[instrument(skip(self, text, metadata), fields(backend = %self.store.backend()))]
    pub async fn upload(
        &self,
        collection: &str,
        text: &str,
        metadata: Metadata,
    ) -> SearchResult<u64> {
        let id = match metadata.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(SearchError::Validation(
                    "metadata.id must be a non-empty string".to_string(),
                ));
            }
        };

        let item = self.embed_item(id, text, metadata).await?;
        self.store.upsert(collection, vec![item]).await
    }

    pub async fn embed_item(
        &self,
        id: impl Into<String>,
        text: &str,
        metadata: Metadata,
    ) -> SearchResult<Item> {
        let values = self.embedder.embed(text).await?;
        Ok(Item::new(id, values).with_metadata(metadata))
    }
}
