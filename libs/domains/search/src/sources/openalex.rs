//! Highly cited papers from the OpenAlex works API.

use std::collections::HashMap;
use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::SourceRecord;
use crate::error::{SearchError, SearchResult};
use crate::models::Metadata;

pub const DEFAULT_FILTER: &str = "cited_by_count:>1000,language:en,has_abstract:true,type:article";

/// Milvus `abstract` column holds at most 4096 bytes
const MAX_ABSTRACT_BYTES: usize = 4000;

#[derive(Debug, Clone)]
pub struct OpenAlexConfig {
    pub base_url: String,
    pub filter: String,
    pub per_page: u32,
    /// Contact address for the OpenAlex polite pool
    pub mailto: Option<String>,
    pub timeout_secs: u64,
}

impl OpenAlexConfig {
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org/works".to_string(),
            filter: DEFAULT_FILTER.to_string(),
            per_page: 200,
            mailto: None,
            timeout_secs: 60,
        }
    }
}

impl FromEnv for OpenAlexConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mailto = env_or_default("OPENALEX_MAILTO", "");

        Ok(Self {
            base_url: env_or_default("OPENALEX_URL", &defaults.base_url),
            filter: env_or_default("OPENALEX_FILTER", &defaults.filter),
            per_page: env_parse("OPENALEX_PER_PAGE", defaults.per_page)?,
            mailto: (!mailto.is_empty()).then_some(mailto),
            timeout_secs: env_parse("OPENALEX_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WorksPage {
    #[serde(default)]
    meta: PageMeta,
    #[serde(default)]
    results: Vec<Paper>,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: Option<String>,
    pub publication_year: Option<i64>,
    #[serde(default)]
    pub cited_by_count: i64,
    pub abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    pub primary_location: Option<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    pub landing_page_url: Option<String>,
    pub source: Option<LocationSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationSource {
    pub host_organization_name: Option<String>,
}

impl Paper {
    pub fn abstract_text(&self) -> String {
        self.abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default()
    }

    fn landing_page_url(&self) -> &str {
        self.primary_location
            .as_ref()
            .and_then(|l| l.landing_page_url.as_deref())
            .unwrap_or("")
    }

    fn host_organization_name(&self) -> &str {
        self.primary_location
            .as_ref()
            .and_then(|l| l.source.as_ref())
            .and_then(|s| s.host_organization_name.as_deref())
            .unwrap_or("")
    }

    /// Scalar fields stored next to the abstract vector.
    pub fn into_metadata(self) -> Metadata {
        let abstract_text = self.abstract_text();
        let mut metadata = Metadata::new();

        metadata.insert(
            "title".into(),
            Value::String(self.title.clone().unwrap_or_default()),
        );
        metadata.insert(
            "publication_year".into(),
            Value::from(self.publication_year.unwrap_or_default()),
        );
        metadata.insert(
            "landing_page_url".into(),
            Value::String(self.landing_page_url().to_string()),
        );
        metadata.insert(
            "host_organization_name".into(),
            Value::String(self.host_organization_name().to_string()),
        );
        metadata.insert("cited_by_count".into(), Value::from(self.cited_by_count));
        metadata.insert(
            "abstract".into(),
            Value::String(truncate_utf8(&abstract_text, MAX_ABSTRACT_BYTES).to_string()),
        );

        metadata
    }
}

impl From<Paper> for SourceRecord {
    fn from(paper: Paper) -> Self {
        let id = paper.id.clone();
        let text = paper.abstract_text();
        SourceRecord {
            id,
            text,
            metadata: paper.into_metadata(),
        }
    }
}

/// Rebuild abstract text from an OpenAlex inverted index (word -> positions).
/// Positions with no word are skipped.
pub fn reconstruct_abstract(inverted_index: &HashMap<String, Vec<usize>>) -> String {
    let Some(max_pos) = inverted_index.values().flatten().copied().max() else {
        return String::new();
    };

    let mut words: Vec<Option<&str>> = vec![None; max_pos + 1];
    for (word, positions) in inverted_index {
        for &pos in positions {
            words[pos] = Some(word.as_str());
        }
    }

    words
        .into_iter()
        .flatten()
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub struct OpenAlexClient {
    client: Client,
    config: OpenAlexConfig,
}

impl OpenAlexClient {
    pub fn new(config: OpenAlexConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAlexConfig {
        &self.config
    }

    /// Fetch one page; returns the papers and the cursor for the next page.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, cursor: &str) -> SearchResult<(Vec<Paper>, Option<String>)> {
        let per_page = self.config.per_page.to_string();
        let mut params = vec![
            ("sort", "publication_year:desc"),
            ("filter", self.config.filter.as_str()),
            ("per-page", per_page.as_str()),
            ("cursor", cursor),
        ];
        if let Some(mailto) = &self.config.mailto {
            params.push(("mailto", mailto.as_str()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Source(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Source(format!(
                "OpenAlex API error ({}): {}",
                status, error_text
            )));
        }

        let page: WorksPage = response
            .json()
            .await
            .map_err(|e| SearchError::Source(format!("Malformed OpenAlex page: {}", e)))?;

        debug!(
            results = page.results.len(),
            next_cursor = ?page.meta.next_cursor,
            "Fetched OpenAlex page"
        );
        Ok((page.results, page.meta.next_cursor))
    }

    /// Page through the works feed, yielding at most `max_records` papers.
    /// Stops when the feed runs out of cursors or returns an empty page.
    pub fn papers(&self, max_records: usize) -> impl Stream<Item = SearchResult<Paper>> + '_ {
        stream::try_unfold(Some("*".to_string()), move |cursor| async move {
            let Some(cursor) = cursor else {
                return Ok(None);
            };
            let (papers, next_cursor) = self.fetch_page(&cursor).await?;
            if papers.is_empty() {
                return Ok(None);
            }
            Ok::<_, SearchError>(Some((papers, next_cursor)))
        })
        .map_ok(|papers| stream::iter(papers.into_iter().map(Ok)))
        .try_flatten()
        .take(max_records)
    }
}
