//! Application state management.
//!
//! The store and embedding clients are built once and shared: the search
//! handlers and the readiness probe hold clones of the same `Arc`s.

use std::sync::Arc;

use domain_search::{
    EmbeddingProvider, HttpEmbeddingProvider, MilvusCollection, MilvusStore, PineconeStore,
    SearchService, SearchState,
};
use eyre::WrapErr;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pinecone: Arc<PineconeStore>,
    pub milvus: Arc<MilvusStore>,
    pub embedder: Arc<HttpEmbeddingProvider>,
}

impl AppState {
    pub fn new(config: Config) -> eyre::Result<Self> {
        let embedder = HttpEmbeddingProvider::new(config.embedding.clone())
            .wrap_err("Failed to create embedding client")?;
        let pinecone =
            PineconeStore::new(config.pinecone.clone()).wrap_err("Failed to create Pinecone client")?;

        // Layouts follow the configured collection names.
        let milvus = MilvusStore::new(config.milvus.clone())
            .wrap_err("Failed to create Milvus client")?
            .with_collection(MilvusCollection {
                name: config.collections.papers.clone(),
                ..MilvusCollection::papers()
            })
            .with_collection(MilvusCollection {
                name: config.collections.patents.clone(),
                ..MilvusCollection::patents()
            });

        Ok(Self {
            config,
            pinecone: Arc::new(pinecone),
            milvus: Arc::new(milvus),
            embedder: Arc::new(embedder),
        })
    }

    /// Handler state for the search routes
    pub fn search_state(&self) -> SearchState<Arc<PineconeStore>, Arc<MilvusStore>> {
        let embedder: Arc<dyn EmbeddingProvider> = self.embedder.clone();

        SearchState::new(
            SearchService::new(self.pinecone.clone(), embedder.clone()),
            SearchService::new(self.milvus.clone(), embedder),
        )
        .with_collections(self.config.collections.clone())
    }
}
