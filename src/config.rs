use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Number of passages requested from the vector store for every question.
pub const MATCH_COUNT: usize = 8;

/// Sampling temperature for answer generation.
pub const ANSWER_TEMPERATURE: f32 = 0.2;

/// Dimension of `text-embedding-3-small`, which the textbook index was built with.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            other => anyhow::bail!("unsupported LLM_PROVIDER: {other} (expected openai or ollama)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub provider: LlmProvider,
    pub answer_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub qdrant_base_url: String,
    pub qdrant_collection: String,
    pub qdrant_api_key: Option<String>,
    /// Only passages ingested from this document are searched.
    pub document_source: String,
    pub score_threshold: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub ollama_base_url: String,
    pub models: ModelConfig,
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let provider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "openai".to_string())
            .parse::<LlmProvider>()?;

        let (default_answer_model, default_embedding_model) = match provider {
            LlmProvider::OpenAi => ("gpt-4o-mini", "text-embedding-3-small"),
            LlmProvider::Ollama => ("qwen2.5:14b-instruct", "mxbai-embed-large"),
        };

        Ok(Self {
            bind_addr: env::var("TEXTBOOK_CHAT_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            models: ModelConfig {
                provider,
                answer_model: env::var("ANSWER_MODEL")
                    .unwrap_or_else(|_| default_answer_model.to_string()),
                embedding_model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| default_embedding_model.to_string()),
                embedding_dimension: parse_var("EMBEDDING_DIMENSION")?
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            },
            retrieval: RetrievalConfig {
                qdrant_base_url: env::var("QDRANT_BASE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:6333".to_string()),
                qdrant_collection: env::var("QDRANT_COLLECTION")
                    .unwrap_or_else(|_| "textbook_chunks".to_string()),
                qdrant_api_key: non_empty_var("QDRANT_API_KEY"),
                document_source: env::var("DOCUMENT_SOURCE")
                    .unwrap_or_else(|_| "nutrition-textbook".to_string()),
                score_threshold: parse_var("RETRIEVAL_SCORE_THRESHOLD")?,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw}")),
        None => Ok(None),
    }
}
