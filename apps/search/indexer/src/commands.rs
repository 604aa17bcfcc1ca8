//! Indexing runs behind the CLI subcommands

use std::path::PathBuf;
use std::sync::Arc;

use domain_search::{
    BatchIndexer, DEFAULT_DIMENSION, EmbeddingProvider, HttpEmbeddingProvider, IndexReport,
    MetricType, MilvusCollection, MilvusStore, OpenAlexClient, PatentReader, PineconeStore,
    SearchResult, SourceRecord, StoreBackend, VectorStore,
};
use eyre::{Result, WrapErr};
use futures::{Stream, TryStreamExt};
use tracing::info;

use crate::config::Config;

/// IVF cluster count for the papers index
const PAPERS_NLIST: u32 = 100;

#[derive(Debug, Clone)]
pub struct PatentsArgs {
    pub file: PathBuf,
    pub store: StoreBackend,
    pub collection: Option<String>,
    pub batch_size: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PapersArgs {
    pub max_records: usize,
    pub per_page: u32,
    pub batch_size: usize,
    pub collection: String,
    pub create_collection: bool,
    pub create_index: bool,
}

fn embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = HttpEmbeddingProvider::new(config.embedding.clone())
        .wrap_err("Failed to create embedding client")?;
    Ok(Arc::new(provider))
}

async fn run<S, R>(
    store: S,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: &str,
    batch_size: usize,
    records: R,
    limit: Option<usize>,
) -> Result<IndexReport>
where
    S: VectorStore,
    R: Stream<Item = SearchResult<SourceRecord>>,
{
    let indexer = BatchIndexer::new(store, embedder, collection, batch_size)
        .wrap_err("Invalid batch size")?;

    indexer
        .run_with_limit(records, limit)
        .await
        .wrap_err_with(|| format!("Indexing into '{}' failed", collection))
}

/// Index the tab-separated patent file into Pinecone or Milvus.
pub async fn index_patents(config: &Config, args: PatentsArgs) -> Result<IndexReport> {
    let reader = PatentReader::from_path(&args.file)?;
    let records = futures::stream::iter(reader).map_ok(SourceRecord::from);
    let embedder = embedder(config)?;

    info!(file = %args.file.display(), store = %args.store, "Indexing patents");

    match args.store {
        StoreBackend::Pinecone => {
            let pinecone = config.pinecone()?;
            let collection = args.collection.unwrap_or_else(|| pinecone.index.clone());
            let store = PineconeStore::new(pinecone)?;
            run(store, embedder, &collection, args.batch_size, records, args.limit).await
        }
        StoreBackend::Milvus => {
            let collection = args
                .collection
                .unwrap_or_else(|| MilvusCollection::patents().name);
            let store = MilvusStore::new(config.milvus.clone())?.with_collection(MilvusCollection {
                name: collection.clone(),
                ..MilvusCollection::patents()
            });
            run(store, embedder, &collection, args.batch_size, records, args.limit).await
        }
    }
}

/// Page through OpenAlex and index the papers into Milvus, optionally
/// creating the collection and its index first.
pub async fn index_papers(config: &Config, args: PapersArgs) -> Result<IndexReport> {
    let layout = MilvusCollection {
        name: args.collection.clone(),
        ..MilvusCollection::papers()
    };
    let store = MilvusStore::new(config.milvus.clone())?.with_collection(layout.clone());

    if args.create_collection {
        let dimension = config.embedding.dimension.unwrap_or(DEFAULT_DIMENSION);
        store
            .create_collection(&layout, dimension)
            .await
            .wrap_err_with(|| format!("Failed to create collection '{}'", layout.name))?;
    }
    if args.create_index {
        store
            .create_index(&layout.name, MetricType::Cosine, PAPERS_NLIST)
            .await
            .wrap_err_with(|| format!("Failed to index collection '{}'", layout.name))?;
    }

    let client = OpenAlexClient::new(
        config.openalex.clone().with_per_page(args.per_page),
    )?;
    let records = client.papers(args.max_records).map_ok(SourceRecord::from);

    info!(
        collection = %layout.name,
        max_records = args.max_records,
        "Indexing OpenAlex papers"
    );
    run(
        store,
        embedder(config)?,
        &layout.name,
        args.batch_size,
        records,
        None,
    )
    .await
}
