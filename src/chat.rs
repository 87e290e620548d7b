use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::config::AppConfig;
use crate::context::build_context;
use crate::embedder::QueryEmbedder;
use crate::error::{ChatError, ChatResult};
use crate::generation::AnswerGenerator;
use crate::models::{ChatRequest, ChatResponse};
use crate::providers::build_providers;
use crate::qdrant_store::QdrantStore;
use crate::retrieval::Retriever;
use crate::sources::normalize_sources;

pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find anything in the textbook about that. Try rephrasing your question.";

/// Runs one question through embed → retrieve → context → generate → normalize.
///
/// Stages run one after another and the first failure ends the request.
#[derive(Clone)]
pub struct ChatService {
    embedder: QueryEmbedder,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl ChatService {
    pub fn new(embedder: QueryEmbedder, retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            embedder,
            retriever,
            generator,
        }
    }

    /// Builds the service with long-lived clients for the configured back-ends.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let providers = build_providers(config)?;
        let store = QdrantStore::new(
            config.retrieval.qdrant_base_url.clone(),
            config.retrieval.qdrant_collection.clone(),
        )
        .with_api_key(config.retrieval.qdrant_api_key.clone())
        .with_score_threshold(config.retrieval.score_threshold);

        Ok(Self::new(
            QueryEmbedder::new(
                providers.embeddings,
                config.models.embedding_model.clone(),
                config.models.embedding_dimension,
            ),
            Retriever::new(Arc::new(store), config.retrieval.document_source.clone()),
            AnswerGenerator::new(providers.generator, config.models.answer_model.clone()),
        ))
    }

    pub async fn answer(&self, request: ChatRequest) -> ChatResult<ChatResponse> {
        let started = Instant::now();

        let question = request.message.trim();
        if question.is_empty() {
            return Err(ChatError::validation("message must not be empty"));
        }

        let embedding = self.embedder.embed(question).await?;
        let passages = self.retriever.retrieve(&embedding).await?;

        let context = build_context(&passages);
        if context.is_empty() {
            tracing::info!(
                latency_ms = started.elapsed().as_millis() as u64,
                "no passages retrieved, returning fallback answer"
            );
            return Ok(ChatResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: vec![],
            });
        }

        let answer = self.generator.generate(question, &context).await?;
        let sources = normalize_sources(&passages);

        tracing::info!(
            passages = passages.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );

        Ok(ChatResponse { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::citations::parse_answer;
    use crate::models::RetrievedPassage;
    use crate::testing::{
        macronutrient_passages, FakeEmbedder, FakeGenerator, FakeStore, Harness,
    };

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn blank_message_never_reaches_the_pipeline() {
        let harness = Harness::with_passages(macronutrient_passages(), "unused");

        for message in ["", "   ", "\n\t "] {
            let err = harness.chat.answer(request(message)).await.unwrap_err();
            assert!(err.is_validation());
        }

        assert_eq!(harness.embedder.calls(), 0);
        assert_eq!(harness.store.calls(), 0);
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn empty_retrieval_returns_fallback_without_generation() {
        let harness = Harness::with_passages(vec![], "unused");

        let response = harness
            .chat
            .answer(request("What is vitamin Q?"))
            .await
            .unwrap();

        assert_eq!(response.answer, NO_CONTEXT_ANSWER);
        assert!(response.sources.is_empty());
        assert_eq!(harness.store.calls(), 1);
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn macronutrient_question_end_to_end() {
        let harness = Harness::with_passages(
            macronutrient_passages(),
            "Macronutrients include carbs, fats, and proteins [1][2].",
        );

        let response = harness
            .chat
            .answer(request("  What are macronutrients?  "))
            .await
            .unwrap();

        let (_, user, _) = harness.generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(user.starts_with(
            "Context:\n[1] (Page 12) Carbohydrates are the body's primary energy source.\n\n[2] (Page 45) "
        ));
        assert!(user.contains("\n\n[3] (Page 46) Proteins are built from amino acids."));
        assert!(user.ends_with("Question: What are macronutrients?"));

        assert_eq!(
            response.answer,
            "Macronutrients include carbs, fats, and proteins [1][2]."
        );
        let indexes: Vec<usize> = response.sources.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        let pages: Vec<Option<i64>> = response.sources.iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![Some(12), Some(45), Some(46)]);

        let parsed = parse_answer(&response.answer, &response.sources);
        let cited_pages: Vec<i64> = parsed.citations.iter().map(|c| c.page).collect();
        assert_eq!(cited_pages, vec![12, 45]);
    }

    #[tokio::test]
    async fn sources_follow_retrieval_order() {
        let passages = vec![
            RetrievedPassage::new("low", 0.2).with_page(3),
            RetrievedPassage::new("high", 0.9).with_page(1),
            RetrievedPassage::new("mid", 0.5),
        ];
        let harness = Harness::with_passages(passages, "answer");

        let response = harness.chat.answer(request("q")).await.unwrap();
        let contents: Vec<&str> = response
            .sources
            .iter()
            .map(|s| s.content.as_str())
            .collect();
        assert_eq!(contents, vec!["low", "high", "mid"]);
        for (i, source) in response.sources.iter().enumerate() {
            assert_eq!(source.index, i + 1);
        }
    }

    #[tokio::test]
    async fn embedding_failure_aborts_before_search() {
        let harness = Harness::new(
            FakeEmbedder::failing(),
            FakeStore::new(macronutrient_passages()),
            FakeGenerator::replying("unused"),
        );

        let err = harness.chat.answer(request("q")).await.unwrap_err();
        assert!(matches!(err, ChatError::Retrieval(_)));
        assert_eq!(harness.store.calls(), 0);
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_retrieval_error() {
        let harness = Harness::new(
            FakeEmbedder::new(1536),
            FakeStore::failing(),
            FakeGenerator::replying("unused"),
        );

        let err = harness.chat.answer(request("q")).await.unwrap_err();
        assert!(matches!(err, ChatError::Retrieval(_)));
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn generation_failure_returns_no_partial_answer() {
        let harness = Harness::new(
            FakeEmbedder::new(1536),
            FakeStore::new(macronutrient_passages()),
            FakeGenerator::failing(),
        );

        let err = harness.chat.answer(request("q")).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
        assert_eq!(harness.generator.calls(), 1);
    }
}
