use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SearchError;

/// String-keyed scalar metadata stored alongside a vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A unit of indexing work: identifier, embedding, and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl Item {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Vector similarity query sent to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub top_k: u32,
    pub filter: Option<String>,
    pub include_metadata: bool,
    pub output_fields: Vec<String>,
}

impl SearchQuery {
    pub fn new(vector: Vec<f32>, top_k: u32) -> Self {
        Self {
            vector,
            top_k,
            filter: None,
            include_metadata: true,
            output_fields: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_output_fields(mut self, fields: Vec<String>) -> Self {
        self.output_fields = fields;
        self
    }
}

/// A single search hit as reported by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Citation and year bounds for paper search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaperFilter {
    pub min_citations: Option<i64>,
    pub min_year: Option<i64>,
    pub max_year: Option<i64>,
}

impl PaperFilter {
    /// Render as a Milvus boolean expression, or `None` when unbounded.
    pub fn expression(&self) -> Option<String> {
        let clauses: Vec<String> = [
            self.min_citations
                .map(|v| format!("cited_by_count >= {}", v)),
            self.min_year.map(|v| format!("publication_year >= {}", v)),
            self.max_year.map(|v| format!("publication_year <= {}", v)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Pinecone,
    Milvus,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Pinecone => "pinecone",
            StoreBackend::Milvus => "milvus",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pinecone" => Ok(StoreBackend::Pinecone),
            "milvus" => Ok(StoreBackend::Milvus),
            other => Err(SearchError::Validation(format!(
                "Unknown vector store '{}', expected pinecone or milvus",
                other
            ))),
        }
    }
}
