use core_config::{app_info, env_or_default, server::ServerConfig, AppInfo, FromEnv};
use domain_search::{Collections, EmbeddingConfig, MilvusConfig, PineconeConfig};

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components with the search clients' configs
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub embedding: EmbeddingConfig,
    pub pinecone: PineconeConfig,
    pub milvus: MilvusConfig,
    pub collections: Collections,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080
        let embedding = EmbeddingConfig::from_env()?;
        let pinecone = PineconeConfig::from_env()?; // PINECONE_API_KEY is required
        let milvus = MilvusConfig::from_env()?;

        let collections = Collections {
            documents: pinecone.index.clone(),
            papers: env_or_default("MILVUS_PAPERS_COLLECTION", "papers_collection"),
            patents: env_or_default("MILVUS_PATENTS_COLLECTION", "patent_abstracts"),
        };

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            embedding,
            pinecone,
            milvus,
            collections,
        })
    }
}
