//! Streaming bulk indexer: embed each record, group the resulting items with
//! a [`BatchAccumulator`] and upsert every flushed batch.
//!
//! The pipeline is strictly sequential. Each upsert is awaited before the
//! next record is read, so at most one batch is in flight. Any failure ends
//! the run immediately and the partially filled batch is dropped.

use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::batch::{Batch, BatchAccumulator, BatchError, FlushResult};
use crate::embedding::EmbeddingProvider;
use crate::error::SearchResult;
use crate::models::Item;
use crate::sources::SourceRecord;
use crate::store::VectorStore;

/// Summary of a completed indexing run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub collection: String,
    pub records_read: u64,
    pub batches_flushed: u64,
    pub items_upserted: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

pub struct BatchIndexer<S: VectorStore> {
    store: S,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    max_batch_size: usize,
}

impl<S: VectorStore> BatchIndexer<S> {
    pub fn new(
        store: S,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
        max_batch_size: usize,
    ) -> Result<Self, BatchError> {
        // Validate up front so a bad size fails before any record is read.
        BatchAccumulator::<Item>::new(max_batch_size)?;

        Ok(Self {
            store,
            embedder,
            collection: collection.into(),
            max_batch_size,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn run<R>(&self, records: R) -> SearchResult<IndexReport>
    where
        R: Stream<Item = SearchResult<SourceRecord>>,
    {
        self.run_with_limit(records, None).await
    }

    /// Index at most `limit` records (all of them when `None`).
    #[instrument(skip(self, records), fields(collection = %self.collection, batch_size = self.max_batch_size))]
    pub async fn run_with_limit<R>(
        &self,
        records: R,
        limit: Option<usize>,
    ) -> SearchResult<IndexReport>
    where
        R: Stream<Item = SearchResult<SourceRecord>>,
    {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut accumulator = BatchAccumulator::new(self.max_batch_size)?;
        let mut report = IndexReport {
            collection: self.collection.clone(),
            records_read: 0,
            batches_flushed: 0,
            items_upserted: 0,
            started_at,
            duration_ms: 0,
        };

        let mut records = pin!(records);
        loop {
            if limit.is_some_and(|max| report.records_read >= max as u64) {
                debug!("Record limit reached");
                break;
            }
            let Some(record) = records.next().await else {
                break;
            };
            let record = record?;
            report.records_read += 1;

            let values = self.embedder.embed(&record.text).await?;
            let item = Item::new(record.id, values).with_metadata(record.metadata);

            if let FlushResult::Flushed(batch) = accumulator.add(item) {
                let count = self.flush(batch, &mut report).await?;
                info!("Indexed {} items", count);
            }
        }

        if let FlushResult::Flushed(batch) = accumulator.finalize() {
            let count = self.flush(batch, &mut report).await?;
            info!("Indexed final {} items", count);
        }

        report.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            records = report.records_read,
            batches = report.batches_flushed,
            upserted = report.items_upserted,
            "Indexing complete"
        );
        Ok(report)
    }

    async fn flush(&self, batch: Batch<Item>, report: &mut IndexReport) -> SearchResult<usize> {
        let count = batch.len();
        let written = self
            .store
            .upsert(&self.collection, batch.into_items())
            .await?;

        report.batches_flushed += 1;
        report.items_upserted += written;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::error::SearchError;
    use crate::models::Metadata;
    use crate::store::MockVectorStore;
    use futures::stream;
    use mockall::Sequence;

    fn records(n: usize) -> Vec<SearchResult<SourceRecord>> {
        (0..n)
            .map(|i| {
                Ok(SourceRecord {
                    id: i.to_string(),
                    text: format!("abstract {}", i),
                    metadata: Metadata::new(),
                })
            })
            .collect()
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.1, 0.2]));
        Arc::new(embedder)
    }

    fn store_expecting(sizes: &[usize]) -> MockVectorStore {
        let mut store = MockVectorStore::new();
        let mut seq = Sequence::new();
        for &size in sizes {
            store
                .expect_upsert()
                .times(1)
                .in_sequence(&mut seq)
                .withf(move |collection, items| collection == "patents" && items.len() == size)
                .returning(|_, items| Ok(items.len() as u64));
        }
        store
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = BatchIndexer::new(MockVectorStore::new(), embedder(), "patents", 0);
        assert!(matches!(
            result.err(),
            Some(BatchError::InvalidConfiguration { max_batch_size: 0 })
        ));
    }

    #[tokio::test]
    async fn test_flushes_full_batches_then_remainder() {
        let indexer =
            BatchIndexer::new(store_expecting(&[100, 100, 50]), embedder(), "patents", 100).unwrap();

        let report = indexer.run(stream::iter(records(250))).await.unwrap();

        assert_eq!(report.records_read, 250);
        assert_eq!(report.batches_flushed, 3);
        assert_eq!(report.items_upserted, 250);
        assert_eq!(report.collection, "patents");
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_final_flush() {
        let indexer =
            BatchIndexer::new(store_expecting(&[5, 5]), embedder(), "patents", 5).unwrap();

        let report = indexer.run(stream::iter(records(10))).await.unwrap();
        assert_eq!(report.batches_flushed, 2);
    }

    #[tokio::test]
    async fn test_empty_source_writes_nothing() {
        let indexer = BatchIndexer::new(store_expecting(&[]), embedder(), "patents", 5).unwrap();

        let report = indexer.run(stream::iter(records(0))).await.unwrap();
        assert_eq!(report.records_read, 0);
        assert_eq!(report.items_upserted, 0);
    }

    #[tokio::test]
    async fn test_limit_stops_early_and_flushes_remainder() {
        let indexer =
            BatchIndexer::new(store_expecting(&[4, 3]), embedder(), "patents", 4).unwrap();

        let report = indexer
            .run_with_limit(stream::iter(records(100)), Some(7))
            .await
            .unwrap();

        assert_eq!(report.records_read, 7);
        assert_eq!(report.items_upserted, 7);
    }

    #[tokio::test]
    async fn test_items_keep_source_order() {
        let mut store = MockVectorStore::new();
        store
            .expect_upsert()
            .times(1)
            .withf(|_, items| {
                items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>() == ["0", "1", "2"]
            })
            .returning(|_, items| Ok(items.len() as u64));

        let indexer = BatchIndexer::new(store, embedder(), "patents", 10).unwrap();
        indexer.run(stream::iter(records(3))).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_stops_the_run() {
        let mut store = MockVectorStore::new();
        store
            .expect_upsert()
            .times(1)
            .returning(|_, _| Err(SearchError::Store("quota exceeded".into())));

        let indexer = BatchIndexer::new(store, embedder(), "patents", 2).unwrap();
        let err = indexer
            .run(stream::iter(records(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Store(_)));
    }

    #[tokio::test]
    async fn test_source_error_drops_partial_batch() {
        let mut items = records(3);
        items.push(Err(SearchError::Source("bad row".into())));
        items.extend(records(3));

        // Nothing reaches the store: the error arrives before the batch fills.
        let indexer = BatchIndexer::new(store_expecting(&[]), embedder(), "patents", 10).unwrap();
        let err = indexer.run(stream::iter(items)).await.unwrap_err();

        assert!(matches!(err, SearchError::Source(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .returning(|_| Err(SearchError::Embedding("timeout".into())));

        let indexer =
            BatchIndexer::new(store_expecting(&[]), Arc::new(embedder), "patents", 10).unwrap();
        let err = indexer.run(stream::iter(records(1))).await.unwrap_err();

        assert!(matches!(err, SearchError::Embedding(_)));
    }
}
