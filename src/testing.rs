use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::chat::ChatService;
use crate::config::DEFAULT_EMBEDDING_DIMENSION;
use crate::embedder::QueryEmbedder;
use crate::generation::AnswerGenerator;
use crate::models::RetrievedPassage;
use crate::providers::{DocumentFilter, EmbeddingProvider, TextGenerator, VectorStore};
use crate::retrieval::Retriever;

pub struct FakeEmbedder {
    pub dimension: usize,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(DEFAULT_EMBEDDING_DIMENSION)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("embedding service unavailable");
        }
        Ok(vec![0.01; self.dimension])
    }
}

pub struct FakeStore {
    pub passages: Vec<RetrievedPassage>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<(usize, DocumentFilter)>>,
}

impl FakeStore {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            fail: false,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn search(
        &self,
        _vector: &[f32],
        limit: usize,
        filter: &DocumentFilter,
    ) -> Result<Vec<RetrievedPassage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some((limit, filter.clone()));
        if self.fail {
            anyhow::bail!("qdrant search returned non-success status");
        }
        Ok(self.passages.iter().take(limit).cloned().collect())
    }
}

pub struct FakeGenerator {
    pub reply: String,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<(String, String, f32)>>,
}

impl FakeGenerator {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        _model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() =
            Some((system.to_string(), user.to_string(), temperature));
        if self.fail {
            anyhow::bail!("model returned 503 Service Unavailable");
        }
        Ok(self.reply.clone())
    }
}

pub struct Harness {
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<FakeStore>,
    pub generator: Arc<FakeGenerator>,
    pub chat: ChatService,
}

impl Harness {
    pub fn new(embedder: FakeEmbedder, store: FakeStore, generator: FakeGenerator) -> Self {
        let embedder = Arc::new(embedder);
        let store = Arc::new(store);
        let generator = Arc::new(generator);

        let chat = ChatService::new(
            QueryEmbedder::new(
                embedder.clone(),
                "text-embedding-3-small",
                DEFAULT_EMBEDDING_DIMENSION,
            ),
            Retriever::new(store.clone(), "nutrition-textbook"),
            AnswerGenerator::new(generator.clone(), "gpt-4o-mini"),
        );

        Self {
            embedder,
            store,
            generator,
            chat,
        }
    }

    pub fn with_passages(passages: Vec<RetrievedPassage>, reply: &str) -> Self {
        Self::new(
            FakeEmbedder::new(DEFAULT_EMBEDDING_DIMENSION),
            FakeStore::new(passages),
            FakeGenerator::replying(reply),
        )
    }
}

pub fn macronutrient_passages() -> Vec<RetrievedPassage> {
    vec![
        RetrievedPassage::new(
            "Carbohydrates are the body's primary energy source.",
            0.91,
        )
        .with_page(12),
        RetrievedPassage::new("Dietary fats supply essential fatty acids.", 0.87).with_page(45),
        RetrievedPassage::new("Proteins are built from amino acids.", 0.84).with_page(46),
    ]
}
