use std::sync::Arc;

use crate::error::{ChatError, ChatResult};
use crate::providers::EmbeddingProvider;

/// Turns a validated question into a vector for the configured embedding model.
#[derive(Clone)]
pub struct QueryEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    dimension: usize,
}

impl QueryEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// `query` must already be trimmed and non-empty.
    pub async fn embed(&self, query: &str) -> ChatResult<Vec<f32>> {
        let vector = self
            .provider
            .embed(&self.model, query)
            .await
            .map_err(ChatError::Retrieval)?;

        if vector.len() != self.dimension {
            return Err(ChatError::Retrieval(anyhow::anyhow!(
                "embedding model {} returned {} dimensions, vector store expects {}",
                self.model,
                vector.len(),
                self.dimension
            )));
        }

        Ok(vector)
    }
}
