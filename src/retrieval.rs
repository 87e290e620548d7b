use std::sync::Arc;

use crate::config::MATCH_COUNT;
use crate::error::{ChatError, ChatResult};
use crate::models::RetrievedPassage;
use crate::providers::{DocumentFilter, VectorStore};

#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    filter: DocumentFilter,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, document_source: impl Into<String>) -> Self {
        Self {
            store,
            filter: DocumentFilter {
                source: document_source.into(),
            },
        }
    }

    /// Up to [`MATCH_COUNT`] passages of the configured document, in the store's
    /// similarity order. An empty list is a valid outcome.
    pub async fn retrieve(&self, embedding: &[f32]) -> ChatResult<Vec<RetrievedPassage>> {
        let mut passages = self
            .store
            .search(embedding, MATCH_COUNT, &self.filter)
            .await
            .map_err(ChatError::Retrieval)?;

        passages.truncate(MATCH_COUNT);
        Ok(passages)
    }
}
