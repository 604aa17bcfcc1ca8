//! Milvus vector store using the v2 REST API.
//!
//! Milvus collections carry a fixed schema, so each collection the service
//! talks to is described by a [`MilvusCollection`] layout: which field is the
//! primary key, which holds the vector, and which scalar fields come back in
//! search results.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::error::{SearchError, SearchResult};
use crate::models::{Item, SearchMatch, SearchQuery, StoreBackend};
use crate::store::VectorStore;

/// Milvus connection configuration
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl MilvusConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout_secs: 30,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl FromEnv for MilvusConfig {
    /// Reads:
    /// - MILVUS_URL: defaults to http://localhost:19530
    /// - MILVUS_TOKEN: defaults to "root:Milvus"; empty disables auth
    /// - MILVUS_TIMEOUT_SECS: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("MILVUS_URL", "http://localhost:19530");
        let token = env_or_default("MILVUS_TOKEN", "root:Milvus");
        let timeout_secs = env_parse("MILVUS_TIMEOUT_SECS", 30)?;

        Ok(Self {
            url,
            token: (!token.is_empty()).then_some(token),
            timeout_secs,
        })
    }
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self::new("http://localhost:19530").with_token("root:Milvus")
    }
}

/// Scalar data types used by the collection layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int64,
    VarChar(u32),
}

impl FieldKind {
    fn data_type(&self) -> &'static str {
        match self {
            FieldKind::Int64 => "Int64",
            FieldKind::VarChar(_) => "VarChar",
        }
    }

    fn type_params(&self) -> Option<Value> {
        match self {
            FieldKind::Int64 => None,
            FieldKind::VarChar(max_length) => Some(json!({ "max_length": max_length.to_string() })),
        }
    }
}

/// Metric type for vector similarity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    L2,
    IP,
    #[default]
    Cosine,
}

/// Schema layout of one Milvus collection
#[derive(Debug, Clone, PartialEq)]
pub struct MilvusCollection {
    pub name: String,
    pub primary_field: String,
    pub id_kind: FieldKind,
    pub vector_field: String,
    pub scalar_fields: Vec<(String, FieldKind)>,
    /// Accept metadata keys outside `scalar_fields`
    pub dynamic_fields: bool,
}

impl MilvusCollection {
    /// Layout for collections without a registered schema
    pub fn generic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_field: "id".to_string(),
            id_kind: FieldKind::VarChar(512),
            vector_field: "vector".to_string(),
            scalar_fields: Vec::new(),
            dynamic_fields: true,
        }
    }

    /// Patent abstracts keyed by numeric patent id
    pub fn patents() -> Self {
        Self {
            name: "patent_abstracts".to_string(),
            primary_field: "patentID".to_string(),
            id_kind: FieldKind::Int64,
            vector_field: "vector".to_string(),
            scalar_fields: Vec::new(),
            dynamic_fields: false,
        }
    }

    /// OpenAlex works with their bibliographic fields
    pub fn papers() -> Self {
        Self {
            name: "papers_collection".to_string(),
            primary_field: "id".to_string(),
            id_kind: FieldKind::VarChar(64),
            vector_field: "abstract_vector".to_string(),
            scalar_fields: vec![
                ("title".to_string(), FieldKind::VarChar(1024)),
                ("publication_year".to_string(), FieldKind::Int64),
                ("landing_page_url".to_string(), FieldKind::VarChar(1024)),
                ("host_organization_name".to_string(), FieldKind::VarChar(1024)),
                ("cited_by_count".to_string(), FieldKind::Int64),
                ("abstract".to_string(), FieldKind::VarChar(4096)),
            ],
            dynamic_fields: false,
        }
    }

    pub fn output_fields(&self) -> Vec<String> {
        self.scalar_fields
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Turn an item into an entity row for insert/upsert.
    fn row(&self, item: &Item) -> SearchResult<Value> {
        let mut row = serde_json::Map::new();

        for (key, value) in &item.metadata {
            let known = self.scalar_fields.iter().any(|(name, _)| name == key);
            if known || self.dynamic_fields {
                row.insert(key.clone(), value.clone());
            }
        }

        let id = match self.id_kind {
            FieldKind::Int64 => item.id.parse::<i64>().map(Value::from).map_err(|_| {
                SearchError::Validation(format!(
                    "Id '{}' is not a valid Int64 key for collection {}",
                    item.id, self.name
                ))
            })?,
            FieldKind::VarChar(_) => Value::from(item.id.as_str()),
        };
        row.insert(self.primary_field.clone(), id);
        row.insert(self.vector_field.clone(), json!(item.values));

        Ok(Value::Object(row))
    }

    /// Split a search hit into id, score and remaining fields.
    fn hit(&self, row: Value) -> SearchResult<SearchMatch> {
        let Value::Object(mut fields) = row else {
            return Err(SearchError::Store(
                "Milvus returned a non-object search hit".to_string(),
            ));
        };

        let id = match fields
            .remove(&self.primary_field)
            .or_else(|| fields.remove("id"))
        {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(SearchError::Store(format!(
                    "Milvus search hit is missing primary key '{}'",
                    self.primary_field
                )));
            }
        };

        let score = fields
            .remove("distance")
            .and_then(|d| d.as_f64())
            .unwrap_or_default() as f32;

        Ok(SearchMatch {
            id,
            score,
            values: None,
            metadata: (!fields.is_empty()).then_some(Value::Object(fields)),
        })
    }
}

/// Milvus REST API response wrapper
#[derive(Debug, Deserialize)]
struct MilvusResponse<T> {
    code: i32,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertData {
    #[serde(default)]
    upsert_count: u64,
}

pub struct MilvusStore {
    client: Client,
    config: MilvusConfig,
    collections: HashMap<String, MilvusCollection>,
}

impl MilvusStore {
    pub fn new(config: MilvusConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let store = Self {
            client,
            config,
            collections: HashMap::new(),
        };

        Ok(store
            .with_collection(MilvusCollection::patents())
            .with_collection(MilvusCollection::papers()))
    }

    pub fn from_env() -> SearchResult<Self> {
        Self::new(MilvusConfig::from_env()?)
    }

    /// Register (or replace) the layout for a collection
    pub fn with_collection(mut self, layout: MilvusCollection) -> Self {
        self.collections.insert(layout.name.clone(), layout);
        self
    }

    pub fn layout(&self, collection: &str) -> MilvusCollection {
        self.collections
            .get(collection)
            .cloned()
            .unwrap_or_else(|| MilvusCollection::generic(collection))
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: &Value) -> SearchResult<Option<T>> {
        let url = format!("{}{}", self.config.url.trim_end_matches('/'), path);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Store(format!(
                "Milvus API error ({}): {}",
                status, error_text
            )));
        }

        let body: MilvusResponse<T> = response.json().await?;
        if body.code != 0 {
            return Err(SearchError::Store(format!(
                "Milvus error {}: {}",
                body.code,
                body.message.unwrap_or_else(|| "Unknown error".to_string())
            )));
        }

        Ok(body.data)
    }

    /// Create the collection described by `layout` with a vector field of
    /// `dimension` floats.
    #[instrument(skip(self, layout), fields(collection = %layout.name))]
    pub async fn create_collection(
        &self,
        layout: &MilvusCollection,
        dimension: usize,
    ) -> SearchResult<()> {
        let mut fields = vec![field_schema(&layout.primary_field, layout.id_kind, true)];
        fields.extend(
            layout
                .scalar_fields
                .iter()
                .map(|(name, kind)| field_schema(name, *kind, false)),
        );
        fields.push(json!({
            "fieldName": layout.vector_field,
            "dataType": "FloatVector",
            "elementTypeParams": { "dim": dimension.to_string() },
        }));

        let body = json!({
            "collectionName": layout.name,
            "schema": {
                "autoId": false,
                "enableDynamicField": layout.dynamic_fields,
                "fields": fields,
            },
        });

        self.call::<Value>("/v2/vectordb/collections/create", &body)
            .await?;
        info!("Created collection: {}", layout.name);
        Ok(())
    }

    /// Build an IVF_FLAT index on the collection's vector field and load the
    /// collection for search.
    #[instrument(skip(self))]
    pub async fn create_index(
        &self,
        collection: &str,
        metric: MetricType,
        nlist: u32,
    ) -> SearchResult<()> {
        let layout = self.layout(collection);
        let body = json!({
            "collectionName": collection,
            "indexParams": [{
                "fieldName": layout.vector_field,
                "indexName": format!("{}_idx", layout.vector_field),
                "metricType": metric,
                "indexType": "IVF_FLAT",
                "params": { "nlist": nlist },
            }],
        });
        self.call::<Value>("/v2/vectordb/indexes/create", &body)
            .await?;

        self.call::<Value>(
            "/v2/vectordb/collections/load",
            &json!({ "collectionName": collection }),
        )
        .await?;

        info!(
            "Indexed {} on {} (IVF_FLAT, nlist {})",
            collection, layout.vector_field, nlist
        );
        Ok(())
    }
}

fn field_schema(name: &str, kind: FieldKind, primary: bool) -> Value {
    let mut field = json!({
        "fieldName": name,
        "dataType": kind.data_type(),
        "isPrimary": primary,
    });
    if let Some(params) = kind.type_params() {
        field["elementTypeParams"] = params;
    }
    field
}

#[async_trait]
impl VectorStore for MilvusStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Milvus
    }

    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> SearchResult<Vec<SearchMatch>> {
        let layout = self.layout(collection);

        let output_fields = if !query.output_fields.is_empty() {
            query.output_fields
        } else if query.include_metadata {
            layout.output_fields()
        } else {
            Vec::new()
        };

        let mut body = json!({
            "collectionName": collection,
            "data": [query.vector],
            "annsField": layout.vector_field,
            "limit": query.top_k,
        });
        if !output_fields.is_empty() {
            body["outputFields"] = json!(output_fields);
        }
        if let Some(filter) = query.filter {
            body["filter"] = Value::String(filter);
        }

        let rows: Vec<Value> = self
            .call("/v2/vectordb/entities/search", &body)
            .await?
            .unwrap_or_default();

        debug!(matches = rows.len(), "Milvus search complete");
        rows.into_iter().map(|row| layout.hit(row)).collect()
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn upsert(&self, collection: &str, items: Vec<Item>) -> SearchResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }
        let layout = self.layout(collection);

        let data = items
            .iter()
            .map(|item| layout.row(item))
            .collect::<SearchResult<Vec<_>>>()?;

        let body = json!({
            "collectionName": collection,
            "data": data,
        });

        let written = self
            .call::<UpsertData>("/v2/vectordb/entities/upsert", &body)
            .await?
            .map(|d| d.upsert_count)
            .unwrap_or(items.len() as u64);

        Ok(written)
    }

    async fn health_check(&self) -> SearchResult<()> {
        self.call::<Vec<String>>("/v2/vectordb/collections/list", &json!({}))
            .await
            .map(|_| ())
    }
}
