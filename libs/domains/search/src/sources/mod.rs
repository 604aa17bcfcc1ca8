//! Record sources feeding the batch indexer.

mod openalex;
mod patents;

pub use openalex::{OpenAlexClient, OpenAlexConfig, Paper, reconstruct_abstract};
pub use patents::{PatentReader, PatentRecord};

use crate::models::Metadata;

/// Text to embed plus the id and metadata to store with its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}
