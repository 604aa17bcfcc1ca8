//! Configuration for the indexer

use core_config::{Environment, FromEnv};
use domain_search::{EmbeddingConfig, MilvusConfig, OpenAlexConfig, PineconeConfig};
use eyre::{Result, WrapErr};

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub embedding: EmbeddingConfig,
    pub milvus: MilvusConfig,
    pub openalex: OpenAlexConfig,
}

impl Config {
    /// Pinecone is not loaded here: its API key is only required when a
    /// run targets Pinecone.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            embedding: EmbeddingConfig::from_env().wrap_err("Invalid embedding configuration")?,
            milvus: MilvusConfig::from_env().wrap_err("Invalid Milvus configuration")?,
            openalex: OpenAlexConfig::from_env().wrap_err("Invalid OpenAlex configuration")?,
        })
    }

    pub fn pinecone(&self) -> Result<PineconeConfig> {
        PineconeConfig::from_env().wrap_err("Invalid Pinecone configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_without_pinecone_key() {
        temp_env::with_vars(
            [
                ("PINECONE_API_KEY", None::<&str>),
                ("MILVUS_URL", Some("http://milvus:19530")),
                ("OPENALEX_PER_PAGE", Some("50")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.milvus.url, "http://milvus:19530");
                assert_eq!(config.openalex.per_page, 50);
                assert!(config.pinecone().is_err());
            },
        );
    }

    #[test]
    fn test_bad_number_is_reported() {
        temp_env::with_var("EMBEDDING_TIMEOUT_SECS", Some("soon"), || {
            let err = Config::from_env().unwrap_err();
            assert!(format!("{:#}", err).contains("EMBEDDING_TIMEOUT_SECS"));
        });
    }
}
