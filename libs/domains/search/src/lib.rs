//! Search Domain Library
//!
//! Semantic search over three corpora (uploaded documents, research papers
//! and patent abstracts) backed by remote vector stores, plus the bulk
//! indexing pipeline that fills them.
//!
//! # Architecture
//!
//! ```text
//!  HTTP handlers            search_indexer CLI
//!        │                          │
//! ┌──────▼────────┐        ┌────────▼────────┐     ┌───────────────────┐
//! │ SearchService │        │  BatchIndexer   │◄────│ PatentReader /    │
//! └──────┬────────┘        │ (BatchAccumulator)    │ OpenAlexClient    │
//!        │                 └────────┬────────┘     └───────────────────┘
//!        │     ┌───────────────┐    │
//!        ├────►│EmbeddingProvider◄──┤
//!        │     └───────────────┘    │
//! ┌──────▼──────────────────────────▼──┐
//! │        VectorStore (trait)         │
//! │   PineconeStore     MilvusStore    │
//! └────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_search::{
//!     BatchIndexer, HttpEmbeddingProvider, MilvusStore, PatentReader, SourceRecord,
//! };
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = Arc::new(HttpEmbeddingProvider::from_env()?);
//! let store = MilvusStore::from_env()?;
//!
//! let indexer = BatchIndexer::new(store, embedder, "patent_abstracts", 100)?;
//! let records = futures::stream::iter(PatentReader::from_path("../patents.tsv")?)
//!     .map(|row| row.map(SourceRecord::from));
//!
//! let report = indexer.run(records).await?;
//! println!("indexed {} patents", report.items_upserted);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod embedding;
pub mod error;
pub mod handlers;
pub mod indexing;
pub mod models;
pub mod service;
pub mod sources;
pub mod store;

pub use batch::{Batch, BatchAccumulator, BatchError, FlushResult};
pub use embedding::{DEFAULT_DIMENSION, EmbeddingConfig, EmbeddingProvider, HttpEmbeddingProvider};
pub use error::{SearchError, SearchResult};
pub use handlers::{Collections, SearchApiDoc, SearchState};
pub use indexing::{BatchIndexer, IndexReport};
pub use models::{Item, Metadata, PaperFilter, SearchMatch, SearchQuery, StoreBackend};
pub use service::SearchService;
pub use sources::{
    OpenAlexClient, OpenAlexConfig, Paper, PatentReader, PatentRecord, SourceRecord,
};
pub use store::{
    FieldKind, MetricType, MilvusCollection, MilvusConfig, MilvusStore, PineconeConfig,
    PineconeStore, VectorStore,
};
