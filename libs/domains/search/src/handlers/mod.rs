mod search;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use utoipa::OpenApi;

use crate::models::{Item, PaperFilter, SearchMatch, StoreBackend};
use crate::service::SearchService;
use crate::store::VectorStore;

pub use search::{
    PaperSearchParams, SearchParams, UploadRequest, UploadResponse, DEFAULT_LIMIT,
};

/// OpenAPI documentation for the search API
#[derive(OpenApi)]
#[openapi(
    paths(
        search::search_documents,
        search::search_papers,
        search::search_patents,
        search::upload_document,
    ),
    components(
        schemas(
            SearchMatch, Item, PaperFilter, StoreBackend,
            UploadRequest, UploadResponse
        )
    ),
    tags(
        (name = "search", description = "Semantic search over documents, papers and patents")
    )
)]
pub struct SearchApiDoc;

/// Index and collection names each route reads from or writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub documents: String,
    pub papers: String,
    pub patents: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            documents: "semantic-search".to_string(),
            papers: "papers_collection".to_string(),
            patents: "patent_abstracts".to_string(),
        }
    }
}

/// Shared handler state: a Pinecone-backed service for documents and a
/// Milvus-backed service for papers and patents.
pub struct SearchState<D: VectorStore, M: VectorStore> {
    pub documents: SearchService<D>,
    pub corpus: SearchService<M>,
    pub collections: Collections,
}

impl<D: VectorStore, M: VectorStore> SearchState<D, M> {
    pub fn new(documents: SearchService<D>, corpus: SearchService<M>) -> Self {
        Self {
            documents,
            corpus,
            collections: Collections::default(),
        }
    }

    pub fn with_collections(mut self, collections: Collections) -> Self {
        self.collections = collections;
        self
    }
}

/// Create the search router (mounted under `/api` by the app)
pub fn router<D, M>(state: SearchState<D, M>) -> Router
where
    D: VectorStore + 'static,
    M: VectorStore + 'static,
{
    let shared_state = Arc::new(state);

    Router::new()
        .route("/search", get(search::search_documents::<D, M>))
        .route("/search_papers", get(search::search_papers::<D, M>))
        .route("/search_patents", get(search::search_patents::<D, M>))
        .route("/upload", post(search::upload_document::<D, M>))
        .with_state(shared_state)
}
