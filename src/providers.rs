use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{AppConfig, LlmProvider};
use crate::models::RetrievedPassage;
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String>;
}

/// Restricts a search to the passages of one ingested document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    pub source: String,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest neighbours of `vector`, most similar first.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &DocumentFilter,
    ) -> Result<Vec<RetrievedPassage>>;
}

/// Long-lived clients built once at startup and shared behind `Arc`s.
pub struct Providers {
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn TextGenerator>,
}

pub fn build_providers(config: &AppConfig) -> Result<Providers> {
    match config.models.provider {
        LlmProvider::OpenAi => {
            let client = Arc::new(OpenAiClient::new(
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
            )?);
            Ok(Providers {
                embeddings: client.clone(),
                generator: client,
            })
        }
        LlmProvider::Ollama => {
            let client = Arc::new(OllamaClient::new(config.ollama_base_url.clone()));
            Ok(Providers {
                embeddings: client.clone(),
                generator: client,
            })
        }
    }
}
