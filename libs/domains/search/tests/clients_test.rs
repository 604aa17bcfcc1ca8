//! Outbound HTTP clients against in-process fake upstreams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use domain_search::{
    BatchIndexer, EmbeddingConfig, EmbeddingProvider, HttpEmbeddingProvider, Item, MilvusConfig,
    MilvusStore, OpenAlexClient, OpenAlexConfig, PineconeConfig, PineconeStore, SearchError,
    SearchQuery, SourceRecord, VectorStore,
};
use futures::TryStreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;

type Recorded = Arc<Mutex<Vec<Value>>>;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn recorded(requests: &Recorded) -> Vec<Value> {
    requests.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Embedding service
// ---------------------------------------------------------------------------

async fn fake_embedder(requests: Recorded) -> String {
    let router = Router::new()
        .route(
            "/embed",
            post(
                |State(requests): State<Recorded>, Json(body): Json<Value>| async move {
                    let text = body["text"].as_str().unwrap_or_default().to_string();
                    requests.lock().unwrap().push(body);
                    if text == "explode" {
                        return Err((StatusCode::INTERNAL_SERVER_ERROR, "model crashed"));
                    }
                    let len = text.len() as f32;
                    Ok(Json(vec![len, 1.0, 0.5]))
                },
            ),
        )
        .with_state(requests);
    serve(router).await
}

fn embedder(base: &str, dimension: Option<usize>) -> HttpEmbeddingProvider {
    HttpEmbeddingProvider::new(
        EmbeddingConfig::new(format!("{}/embed", base)).with_dimension(dimension),
    )
    .unwrap()
}

#[tokio::test]
async fn test_embedding_posts_text_and_parses_vector() {
    let requests = Recorded::default();
    let base = fake_embedder(requests.clone()).await;

    let vector = embedder(&base, Some(3)).embed("hello").await.unwrap();

    assert_eq!(vector, vec![5.0, 1.0, 0.5]);
    assert_eq!(recorded(&requests), vec![json!({ "text": "hello" })]);
}

#[tokio::test]
async fn test_embedding_dimension_mismatch_is_an_error() {
    let base = fake_embedder(Recorded::default()).await;

    let err = embedder(&base, Some(384)).embed("hello").await.unwrap_err();

    assert!(matches!(err, SearchError::Embedding(_)));
    assert!(err.to_string().contains("Expected 384 dimensions, got 3"));
}

#[tokio::test]
async fn test_embedding_upstream_failure_keeps_body() {
    let base = fake_embedder(Recorded::default()).await;

    let err = embedder(&base, None).embed("explode").await.unwrap_err();

    assert!(matches!(err, SearchError::Embedding(_)));
    assert!(err.to_string().contains("model crashed"));
}

// ---------------------------------------------------------------------------
// Pinecone (control plane and data plane on one server)
// ---------------------------------------------------------------------------

async fn fake_pinecone(requests: Recorded) -> String {
    let router = Router::new()
        .route("/indexes", get(|| async { Json(json!({ "indexes": [] })) }))
        .route(
            "/indexes/{name}",
            get(
                |Path(name): Path<String>, headers: HeaderMap| async move {
                    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some("pk-test") {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    if name != "semantic-search" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    // Point the data plane back at this server.
                    let host = headers
                        .get("host")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    Ok(Json(json!({ "host": format!("http://{}", host) })))
                },
            ),
        )
        .route(
            "/query",
            post(
                |State(requests): State<Recorded>, Json(body): Json<Value>| async move {
                    requests.lock().unwrap().push(body);
                    Json(json!({
                        "matches": [
                            { "id": "doc-1", "score": 0.92, "metadata": { "text": "first" } },
                            { "id": "doc-2", "score": 0.71 }
                        ]
                    }))
                },
            ),
        )
        .route(
            "/vectors/upsert",
            post(
                |State(requests): State<Recorded>, Json(body): Json<Value>| async move {
                    let count = body["vectors"].as_array().map(Vec::len).unwrap_or_default();
                    requests.lock().unwrap().push(body);
                    Json(json!({ "upsertedCount": count }))
                },
            ),
        )
        .with_state(requests);
    serve(router).await
}

fn pinecone(base: &str) -> PineconeStore {
    PineconeStore::new(PineconeConfig::new("pk-test").with_controller_url(base)).unwrap()
}

#[tokio::test]
async fn test_pinecone_resolves_host_and_queries() {
    let requests = Recorded::default();
    let base = fake_pinecone(requests.clone()).await;
    let store = pinecone(&base);

    let matches = store
        .search("semantic-search", SearchQuery::new(vec![0.1, 0.2], 2))
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "doc-1");
    assert_eq!(matches[0].metadata, Some(json!({ "text": "first" })));
    assert_eq!(matches[1].metadata, None);

    let sent = recorded(&requests);
    assert_eq!(sent[0]["topK"], 2);
    assert_eq!(sent[0]["includeMetadata"], true);
    assert!(sent[0].get("filter").is_none());
}

#[tokio::test]
async fn test_pinecone_upsert_reports_written_count() {
    let requests = Recorded::default();
    let base = fake_pinecone(requests.clone()).await;
    let store = pinecone(&base);

    let mut metadata = domain_search::Metadata::new();
    metadata.insert("text".into(), json!("hello"));
    let items = vec![
        Item::new("a", vec![1.0, 0.0]).with_metadata(metadata),
        Item::new("b", vec![0.0, 1.0]),
    ];

    let written = store.upsert("semantic-search", items).await.unwrap();

    assert_eq!(written, 2);
    let sent = recorded(&requests);
    assert_eq!(sent[0]["vectors"][0]["metadata"]["text"], "hello");
    assert!(sent[0]["vectors"][1].get("metadata").is_none());
}

#[tokio::test]
async fn test_pinecone_unknown_index_is_store_error() {
    let base = fake_pinecone(Recorded::default()).await;
    let store = pinecone(&base);

    let err = store
        .search("missing", SearchQuery::new(vec![0.1], 1))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Store(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_pinecone_health_check() {
    let base = fake_pinecone(Recorded::default()).await;
    assert!(pinecone(&base).health_check().await.is_ok());
}

// ---------------------------------------------------------------------------
// Milvus REST v2
// ---------------------------------------------------------------------------

async fn fake_milvus(requests: Recorded) -> String {
    let router = Router::new()
        .route(
            "/v2/vectordb/entities/search",
            post(
                |State(requests): State<Recorded>, Json(body): Json<Value>| async move {
                    let collection = body["collectionName"].as_str().unwrap_or_default().to_string();
                    requests.lock().unwrap().push(body);
                    if collection == "locked" {
                        return Json(json!({ "code": 1100, "message": "collection not loaded" }));
                    }
                    Json(json!({
                        "code": 0,
                        "data": [
                            { "patentID": 4000001, "distance": 0.88 },
                            { "patentID": 4000002, "distance": 0.61 }
                        ]
                    }))
                },
            ),
        )
        .route(
            "/v2/vectordb/entities/upsert",
            post(
                |State(requests): State<Recorded>, Json(body): Json<Value>| async move {
                    let count = body["data"].as_array().map(Vec::len).unwrap_or_default();
                    requests.lock().unwrap().push(body);
                    Json(json!({ "code": 0, "data": { "upsertCount": count } }))
                },
            ),
        )
        .route(
            "/v2/vectordb/collections/list",
            post(|| async { Json(json!({ "code": 0, "data": ["patent_abstracts"] })) }),
        )
        .with_state(requests);
    serve(router).await
}

fn milvus(base: &str) -> MilvusStore {
    MilvusStore::new(MilvusConfig::new(base).with_token("root:Milvus")).unwrap()
}

#[tokio::test]
async fn test_milvus_search_maps_primary_key_and_distance() {
    let requests = Recorded::default();
    let base = fake_milvus(requests.clone()).await;

    let matches = milvus(&base)
        .search("patent_abstracts", SearchQuery::new(vec![0.3; 3], 5))
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "4000001");
    assert!((matches[0].score - 0.88).abs() < 1e-6);
    assert_eq!(matches[0].metadata, None);

    let sent = recorded(&requests);
    assert_eq!(sent[0]["annsField"], "vector");
    assert_eq!(sent[0]["limit"], 5);
}

#[tokio::test]
async fn test_milvus_papers_search_sends_filter_and_fields() {
    let requests = Recorded::default();
    let base = fake_milvus(requests.clone()).await;

    let query = SearchQuery::new(vec![0.3; 3], 3)
        .with_filter(Some("cited_by_count >= 1000".to_string()));
    milvus(&base)
        .search("papers_collection", query)
        .await
        .unwrap_err(); // fake answers with patent rows lacking an `id`

    let sent = recorded(&requests);
    assert_eq!(sent[0]["annsField"], "abstract_vector");
    assert_eq!(sent[0]["filter"], "cited_by_count >= 1000");
    assert!(
        sent[0]["outputFields"]
            .as_array()
            .unwrap()
            .contains(&json!("cited_by_count"))
    );
}

#[tokio::test]
async fn test_milvus_nonzero_code_is_store_error() {
    let base = fake_milvus(Recorded::default()).await;

    let err = milvus(&base)
        .search("locked", SearchQuery::new(vec![0.3], 1))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::Store(_)));
    assert!(err.to_string().contains("collection not loaded"));
}

#[tokio::test]
async fn test_milvus_upsert_writes_schema_rows() {
    let requests = Recorded::default();
    let base = fake_milvus(requests.clone()).await;

    let mut metadata = domain_search::Metadata::new();
    metadata.insert("abstract".into(), json!("A widget."));
    let written = milvus(&base)
        .upsert(
            "patent_abstracts",
            vec![Item::new("4000001", vec![0.1, 0.2]).with_metadata(metadata)],
        )
        .await
        .unwrap();

    assert_eq!(written, 1);
    let row = &recorded(&requests)[0]["data"][0];
    assert_eq!(row["patentID"], 4000001);
    assert_eq!(row["vector"], json!([0.1, 0.2]));
    assert!(row.get("abstract").is_none());
}

#[tokio::test]
async fn test_milvus_health_check() {
    let base = fake_milvus(Recorded::default()).await;
    assert!(milvus(&base).health_check().await.is_ok());
}

// ---------------------------------------------------------------------------
// OpenAlex
// ---------------------------------------------------------------------------

fn work(id: &str, abstract_words: &[&str]) -> Value {
    let index: HashMap<&str, Vec<usize>> = abstract_words
        .iter()
        .enumerate()
        .map(|(pos, word)| (*word, vec![pos]))
        .collect();
    json!({
        "id": id,
        "title": format!("Paper {}", id),
        "publication_year": 2021,
        "cited_by_count": 1500,
        "abstract_inverted_index": index,
        "primary_location": {
            "landing_page_url": format!("https://doi.org/{}", id),
            "source": { "host_organization_name": "Elsevier" }
        }
    })
}

async fn fake_openalex(requests: Recorded) -> String {
    let router = Router::new()
        .route(
            "/works",
            get(
                |State(requests): State<Recorded>,
                 Query(params): Query<HashMap<String, String>>| async move {
                    let cursor = params.get("cursor").cloned().unwrap_or_default();
                    requests.lock().unwrap().push(json!(params));
                    let page = match cursor.as_str() {
                        "*" => json!({
                            "meta": { "next_cursor": "c2" },
                            "results": [work("W1", &["graph", "neural"]), work("W2", &["deep", "nets"])]
                        }),
                        "c2" => json!({
                            "meta": { "next_cursor": "c3" },
                            "results": [work("W3", &["attention"])]
                        }),
                        _ => json!({ "meta": { "next_cursor": null }, "results": [] }),
                    };
                    Json(page)
                },
            ),
        )
        .with_state(requests);
    serve(router).await
}

fn openalex(base: &str, per_page: u32) -> OpenAlexClient {
    OpenAlexClient::new(
        OpenAlexConfig::default()
            .with_base_url(format!("{}/works", base))
            .with_per_page(per_page),
    )
    .unwrap()
}

#[tokio::test]
async fn test_openalex_follows_cursors_until_empty_page() {
    let requests = Recorded::default();
    let base = fake_openalex(requests.clone()).await;
    let client = openalex(&base, 2);

    let papers: Vec<_> = client.papers(100).try_collect().await.unwrap();

    let ids: Vec<_> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["W1", "W2", "W3"]);
    assert_eq!(papers[0].abstract_text(), "graph neural");

    let sent = recorded(&requests);
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["per-page"], "2");
    assert_eq!(sent[0]["sort"], "publication_year:desc");
    assert_eq!(sent[1]["cursor"], "c2");
}

#[tokio::test]
async fn test_openalex_stops_at_max_records() {
    let requests = Recorded::default();
    let base = fake_openalex(requests.clone()).await;
    let client = openalex(&base, 2);

    let papers: Vec<_> = client.papers(2).try_collect().await.unwrap();

    assert_eq!(papers.len(), 2);
    assert_eq!(recorded(&requests).len(), 1);
}

// ---------------------------------------------------------------------------
// End to end: OpenAlex -> embedder -> Milvus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_indexer_moves_papers_into_milvus_in_batches() {
    let milvus_requests = Recorded::default();
    let embed_requests = Recorded::default();
    let milvus_base = fake_milvus(milvus_requests.clone()).await;
    let embed_base = fake_embedder(embed_requests.clone()).await;
    let openalex_base = fake_openalex(Recorded::default()).await;

    let client = openalex(&openalex_base, 2);
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(embedder(&embed_base, Some(3)));
    let indexer = BatchIndexer::new(milvus(&milvus_base), provider, "papers_collection", 2).unwrap();

    let report = indexer
        .run(client.papers(100).map_ok(SourceRecord::from))
        .await
        .unwrap();

    assert_eq!(report.records_read, 3);
    assert_eq!(report.batches_flushed, 2);
    assert_eq!(report.items_upserted, 3);

    let texts: Vec<_> = recorded(&embed_requests)
        .into_iter()
        .map(|body| body["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["graph neural", "deep nets", "attention"]);

    let upserts = recorded(&milvus_requests);
    assert_eq!(upserts.len(), 2);
    let first_row = &upserts[0]["data"][0];
    assert_eq!(first_row["id"], "W1");
    assert_eq!(first_row["title"], "Paper W1");
    assert_eq!(first_row["host_organization_name"], "Elsevier");
    assert_eq!(first_row["abstract_vector"].as_array().unwrap().len(), 3);
    assert_eq!(upserts[1]["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_indexer_surfaces_embedding_failure() {
    let embed_base = fake_embedder(Recorded::default()).await;
    let milvus_requests = Recorded::default();
    let milvus_base = fake_milvus(milvus_requests.clone()).await;

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(embedder(&embed_base, None));
    let indexer = BatchIndexer::new(milvus(&milvus_base), provider, "semantic-search", 10).unwrap();

    let records = futures::stream::iter(["fine", "explode"].map(|text| {
        Ok::<_, SearchError>(SourceRecord {
            id: text.to_string(),
            text: text.to_string(),
            metadata: Default::default(),
        })
    }));

    let err = indexer.run(records).await.unwrap_err();

    assert!(matches!(err, SearchError::Embedding(_)));
    assert!(recorded(&milvus_requests).is_empty());
}
