//! REST handlers for text search and document upload

use std::sync::Arc;

use axum::{Json, extract::State};
use axum_helpers::{ApiJson, ApiQuery};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::SearchState;
use crate::error::SearchResult;
use crate::models::{Metadata, PaperFilter, SearchMatch};
use crate::store::VectorStore;

pub const DEFAULT_LIMIT: u32 = 10;

/// Text query with an optional result count
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search text
    pub q: Option<String>,
    /// Number of results (default 10)
    pub limit: Option<u32>,
}

/// Paper search with citation and year bounds
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaperSearchParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
    /// Minimum citation count
    pub cited: Option<i64>,
    pub min_year: Option<i64>,
    pub max_year: Option<i64>,
}

impl PaperSearchParams {
    pub fn filter(&self) -> PaperFilter {
        PaperFilter {
            min_citations: self.cited,
            min_year: self.min_year,
            max_year: self.max_year,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadRequest {
    pub text: String,
    /// Must contain a string `id`; stored with the vector
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
}

/// Search uploaded documents
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matches ordered by similarity", body = Vec<SearchMatch>),
        (status = 400, description = "Search query is required"),
        (status = 500, description = "Embedding or vector store failure")
    )
)]
pub async fn search_documents<D: VectorStore, M: VectorStore>(
    State(state): State<Arc<SearchState<D, M>>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> SearchResult<Json<Vec<SearchMatch>>> {
    let matches = state
        .documents
        .search_text(
            &state.collections.documents,
            params.q.as_deref().unwrap_or_default(),
            params.limit.unwrap_or(DEFAULT_LIMIT),
            None,
            Vec::new(),
        )
        .await?;

    Ok(Json(matches))
}

/// Search research papers, optionally bounded by citations and year
#[utoipa::path(
    get,
    path = "/search_papers",
    tag = "search",
    params(PaperSearchParams),
    responses(
        (status = 200, description = "Matching papers", body = Vec<SearchMatch>),
        (status = 400, description = "Search query is required"),
        (status = 500, description = "Embedding or vector store failure")
    )
)]
pub async fn search_papers<D: VectorStore, M: VectorStore>(
    State(state): State<Arc<SearchState<D, M>>>,
    ApiQuery(params): ApiQuery<PaperSearchParams>,
) -> SearchResult<Json<Vec<SearchMatch>>> {
    let results = state
        .corpus
        .search_text(
            &state.collections.papers,
            params.q.as_deref().unwrap_or_default(),
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.filter().expression(),
            Vec::new(),
        )
        .await?;

    Ok(Json(results))
}

/// Search patent abstracts
#[utoipa::path(
    get,
    path = "/search_patents",
    tag = "search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching patents", body = Vec<SearchMatch>),
        (status = 400, description = "Search query is required"),
        (status = 500, description = "Embedding or vector store failure")
    )
)]
pub async fn search_patents<D: VectorStore, M: VectorStore>(
    State(state): State<Arc<SearchState<D, M>>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> SearchResult<Json<Vec<SearchMatch>>> {
    let results = state
        .corpus
        .search_text(
            &state.collections.patents,
            params.q.as_deref().unwrap_or_default(),
            params.limit.unwrap_or(DEFAULT_LIMIT),
            None,
            Vec::new(),
        )
        .await?;

    Ok(Json(results))
}

/// Embed and store a document
#[utoipa::path(
    post,
    path = "/upload",
    tag = "search",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "metadata.id missing"),
        (status = 500, description = "Embedding or vector store failure")
    )
)]
pub async fn upload_document<D: VectorStore, M: VectorStore>(
    State(state): State<Arc<SearchState<D, M>>>,
    ApiJson(request): ApiJson<UploadRequest>,
) -> SearchResult<Json<UploadResponse>> {
    state
        .documents
        .upload(&state.collections.documents, &request.text, request.metadata)
        .await?;

    Ok(Json(UploadResponse { success: true }))
}
