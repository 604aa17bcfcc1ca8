//! Tab-separated patent abstracts (`patent_id`, `patent_abstract`, ...).
//!
//! [`PatentReader`] is a plain blocking iterator over a buffered `csv`
//! reader. The indexer drives it from one task and awaits an embedding call
//! per row, so each read is a short buffer refill between network waits.
//! Callers that share a runtime with request handlers should move the
//! reader into `tokio::task::spawn_blocking` instead.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::SourceRecord;
use crate::error::{SearchError, SearchResult};
use crate::models::Metadata;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatentRecord {
    pub patent_id: String,
    pub patent_abstract: String,
}

impl From<PatentRecord> for SourceRecord {
    fn from(record: PatentRecord) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("patent_id".into(), Value::String(record.patent_id.clone()));
        metadata.insert(
            "abstract".into(),
            Value::String(record.patent_abstract.clone()),
        );

        SourceRecord {
            id: record.patent_id,
            text: record.patent_abstract,
            metadata,
        }
    }
}

/// Streams patent rows one at a time; the header row names the columns and
/// any extra columns are ignored.
pub struct PatentReader<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, PatentRecord>,
}

impl PatentReader<File> {
    pub fn from_path(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SearchError::Source(format!("Cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> PatentReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let rows = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader)
            .into_deserialize();

        Self { rows }
    }
}

impl<R: Read> Iterator for PatentReader<R> {
    type Item = SearchResult<PatentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.map_err(SearchError::from))
    }
}
