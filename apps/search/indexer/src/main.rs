//! Search Indexer
//!
//! Bulk-loads the vector stores: patent abstracts from a TSV export and
//! research papers from the OpenAlex works API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_search::StoreBackend;
use eyre::Result;
use tracing::info;

mod commands;
mod config;

use commands::{PapersArgs, PatentsArgs};
use config::Config;

#[derive(Parser)]
#[command(name = "search-indexer")]
#[command(about = "Embed and index patents and papers into Pinecone or Milvus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index patent abstracts from a tab-separated file
    Patents {
        /// TSV file with patent_id and patent_abstract columns
        #[arg(short, long, default_value = "../patents.tsv")]
        file: PathBuf,

        /// Target vector store (pinecone, milvus)
        #[arg(short, long, default_value = "milvus")]
        store: StoreBackend,

        /// Index or collection name. Defaults to PINECONE_INDEX or patent_abstracts.
        #[arg(short, long)]
        collection: Option<String>,

        /// Items per upsert
        #[arg(short, long, default_value_t = 100)]
        batch_size: usize,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Index papers from OpenAlex into Milvus
    Papers {
        /// Stop after this many papers
        #[arg(short, long, default_value_t = 50_000)]
        max_records: usize,

        /// OpenAlex page size
        #[arg(short, long, default_value_t = 200)]
        per_page: u32,

        /// Items per upsert
        #[arg(short, long, default_value_t = 200)]
        batch_size: usize,

        /// Milvus collection name
        #[arg(short, long, default_value = "papers_collection")]
        collection: String,

        /// Create the collection before indexing
        #[arg(long)]
        create_collection: bool,

        /// Build the IVF_FLAT index and load the collection before indexing
        #[arg(long)]
        create_index: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let report = match cli.command {
        Commands::Patents {
            file,
            store,
            collection,
            batch_size,
            limit,
        } => {
            commands::index_patents(
                &config,
                PatentsArgs {
                    file,
                    store,
                    collection,
                    batch_size,
                    limit,
                },
            )
            .await?
        }

        Commands::Papers {
            max_records,
            per_page,
            batch_size,
            collection,
            create_collection,
            create_index,
        } => {
            commands::index_papers(
                &config,
                PapersArgs {
                    max_records,
                    per_page,
                    batch_size,
                    collection,
                    create_collection,
                    create_index,
                },
            )
            .await?
        }
    };

    info!(
        "Indexing complete: {} records read, {} items upserted in {} ms",
        report.records_read, report.items_upserted, report.duration_ms
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patents_defaults() {
        let cli = Cli::try_parse_from(["search-indexer", "patents"]).unwrap();
        match cli.command {
            Commands::Patents {
                file,
                store,
                collection,
                batch_size,
                limit,
            } => {
                assert_eq!(file, PathBuf::from("../patents.tsv"));
                assert_eq!(store, StoreBackend::Milvus);
                assert_eq!(collection, None);
                assert_eq!(batch_size, 100);
                assert_eq!(limit, None);
            }
            _ => panic!("expected patents subcommand"),
        }
    }

    #[test]
    fn test_patents_into_pinecone_with_limit() {
        let cli = Cli::try_parse_from([
            "search-indexer",
            "patents",
            "--store",
            "Pinecone",
            "--limit",
            "500",
        ])
        .unwrap();
        match cli.command {
            Commands::Patents { store, limit, .. } => {
                assert_eq!(store, StoreBackend::Pinecone);
                assert_eq!(limit, Some(500));
            }
            _ => panic!("expected patents subcommand"),
        }
    }

    #[test]
    fn test_unknown_store_is_rejected() {
        assert!(Cli::try_parse_from(["search-indexer", "patents", "--store", "qdrant"]).is_err());
    }

    #[test]
    fn test_papers_flags() {
        let cli = Cli::try_parse_from([
            "search-indexer",
            "papers",
            "--max-records",
            "1000",
            "--create-collection",
            "--create-index",
        ])
        .unwrap();
        match cli.command {
            Commands::Papers {
                max_records,
                per_page,
                batch_size,
                collection,
                create_collection,
                create_index,
            } => {
                assert_eq!(max_records, 1000);
                assert_eq!(per_page, 200);
                assert_eq!(batch_size, 200);
                assert_eq!(collection, "papers_collection");
                assert!(create_collection);
                assert!(create_index);
            }
            _ => panic!("expected papers subcommand"),
        }
    }

    #[test]
    fn test_negative_batch_size_is_rejected() {
        assert!(
            Cli::try_parse_from(["search-indexer", "papers", "--batch-size", "-5"]).is_err()
        );
    }
}
