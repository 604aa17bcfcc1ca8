//! Pinecone REST client.
//!
//! Data-plane calls go to the per-index host, which is looked up once through
//! the control plane (`GET /indexes/{name}`) and cached. A host can also be
//! configured up front to skip the lookup.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{SearchError, SearchResult};
use crate::models::{Item, Metadata, SearchMatch, SearchQuery, StoreBackend};
use crate::store::VectorStore;

const API_VERSION: &str = "2024-07";

/// Pinecone connection configuration
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub controller_url: String,
    /// Index used by the document search/upload endpoints
    pub index: String,
    /// Known data-plane hosts keyed by index name
    pub index_hosts: HashMap<String, String>,
    pub namespace: Option<String>,
    pub timeout_secs: u64,
}

impl PineconeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            controller_url: "https://api.pinecone.io".to_string(),
            index: "semantic-search".to_string(),
            index_hosts: HashMap::new(),
            namespace: None,
            timeout_secs: 30,
        }
    }

    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = url.into();
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_index_host(mut self, index: impl Into<String>, host: impl Into<String>) -> Self {
        self.index_hosts.insert(index.into(), host.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl FromEnv for PineconeConfig {
    /// Reads:
    /// - PINECONE_API_KEY: required
    /// - PINECONE_CONTROLLER_URL: defaults to https://api.pinecone.io
    /// - PINECONE_INDEX: defaults to "semantic-search"
    /// - PINECONE_INDEX_HOST: optional data-plane host for PINECONE_INDEX
    /// - PINECONE_NAMESPACE: optional
    /// - PINECONE_TIMEOUT_SECS: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("PINECONE_API_KEY")?;
        let index = env_or_default("PINECONE_INDEX", "semantic-search");

        let mut config = PineconeConfig::new(api_key)
            .with_controller_url(env_or_default(
                "PINECONE_CONTROLLER_URL",
                "https://api.pinecone.io",
            ))
            .with_index(index.clone());

        if let Ok(host) = std::env::var("PINECONE_INDEX_HOST") {
            config = config.with_index_host(index, host);
        }
        if let Ok(namespace) = std::env::var("PINECONE_NAMESPACE") {
            config = config.with_namespace(namespace);
        }
        config.timeout_secs = env_parse("PINECONE_TIMEOUT_SECS", 30)?;

        Ok(config)
    }
}

/// Prefix scheme-less hosts (as returned by the control plane) with https.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

pub struct PineconeStore {
    client: Client,
    config: PineconeConfig,
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: u32,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "no_metadata")]
    metadata: &'a Metadata,
}

fn no_metadata(metadata: &&Metadata) -> bool {
    metadata.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

impl PineconeStore {
    pub fn new(config: PineconeConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let hosts = config
            .index_hosts
            .iter()
            .map(|(index, host)| (index.clone(), normalize_host(host)))
            .collect();

        Ok(Self {
            client,
            config,
            hosts: RwLock::new(hosts),
        })
    }

    pub fn from_env() -> SearchResult<Self> {
        Self::new(PineconeConfig::from_env()?)
    }

    pub fn config(&self) -> &PineconeConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn check(response: Response) -> SearchResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(SearchError::Store(format!(
            "Pinecone API error ({}): {}",
            status, error_text
        )))
    }

    /// Resolve the data-plane host for an index, consulting the control plane
    /// on first use.
    async fn index_host(&self, index: &str) -> SearchResult<String> {
        let cached = {
            let hosts = self
                .hosts
                .read()
                .map_err(|_| SearchError::Internal("Pinecone host cache poisoned".to_string()))?;
            hosts.get(index).cloned()
        };
        if let Some(host) = cached {
            return Ok(host);
        }

        let url = format!(
            "{}/indexes/{}",
            self.config.controller_url.trim_end_matches('/'),
            index
        );
        let response = self.authorized(self.client.get(&url)).send().await?;
        let described: DescribeIndexResponse = Self::check(response).await?.json().await?;
        let host = normalize_host(&described.host);

        info!(index, host = %host, "Resolved Pinecone index host");
        {
            let mut hosts = self
                .hosts
                .write()
                .map_err(|_| SearchError::Internal("Pinecone host cache poisoned".to_string()))?;
            hosts.insert(index.to_string(), host.clone());
        }

        Ok(host)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Pinecone
    }

    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> SearchResult<Vec<SearchMatch>> {
        let host = self.index_host(collection).await?;

        // Pinecone filters are JSON documents; accept them pre-serialized.
        let filter = query
            .filter
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| SearchError::Validation(format!("Invalid Pinecone filter: {}", e)))?;

        let request = QueryRequest {
            vector: &query.vector,
            top_k: query.top_k,
            include_metadata: query.include_metadata,
            include_values: false,
            namespace: self.config.namespace.as_deref(),
            filter,
        };

        let response = self
            .authorized(self.client.post(format!("{}/query", host)))
            .json(&request)
            .send()
            .await?;
        let body: QueryResponse = Self::check(response).await?.json().await?;

        debug!(matches = body.matches.len(), "Pinecone query complete");
        Ok(body
            .matches
            .into_iter()
            .map(|m| SearchMatch {
                id: m.id,
                score: m.score,
                values: (!m.values.is_empty()).then_some(m.values),
                metadata: m.metadata,
            })
            .collect())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn upsert(&self, collection: &str, items: Vec<Item>) -> SearchResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }
        let host = self.index_host(collection).await?;

        let request = UpsertRequest {
            vectors: items
                .iter()
                .map(|item| PineconeVector {
                    id: &item.id,
                    values: &item.values,
                    metadata: &item.metadata,
                })
                .collect(),
            namespace: self.config.namespace.as_deref(),
        };

        let response = self
            .authorized(self.client.post(format!("{}/vectors/upsert", host)))
            .json(&request)
            .send()
            .await?;
        let body: UpsertResponse = Self::check(response).await?.json().await?;

        Ok(body.upserted_count)
    }

    async fn health_check(&self) -> SearchResult<()> {
        let url = format!(
            "{}/indexes",
            self.config.controller_url.trim_end_matches('/')
        );
        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::check(response).await.map(|_| ())
    }
}
