use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Search API",
        version = "0.1.0",
        description = "Semantic search over uploaded documents (Pinecone), research papers and patent abstracts (Milvus)"
    ),
    servers(
        (url = "/api", description = "API base path")
    )
)]
struct BaseDoc;

/// Search routes sit at the root of `/api`, so their docs are merged rather
/// than nested under a prefix.
pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        BaseDoc::openapi().merge_from(domain_search::SearchApiDoc::openapi())
    }
}
