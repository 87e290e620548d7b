use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ollama::normalize_err_body;
use crate::providers::{EmbeddingProvider, TextGenerator};

/// Calls `{base}/v1/embeddings` and non-streaming `{base}/v1/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let base_url = base_url.into();
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("OPENAI_BASE_URL must start with http:// or https://, got {base_url:?}");
        }
        let api_key = api_key.context("OPENAI_API_KEY is required when LLM_PROVIDER=openai")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("OPENAI_API_KEY is not a valid header value")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build openai http client")?;

        tracing::info!(endpoint = %base, "openai client initialized");

        Ok(Self {
            client,
            url_chat: format!("{base}/v1/chat/completions"),
            url_embeddings: format!("{base}/v1/embeddings"),
        })
    }

    pub async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingsReq<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingsResp {
            data: Vec<EmbeddingItem>,
        }

        #[derive(Deserialize)]
        struct EmbeddingItem {
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(&self.url_embeddings)
            .json(&EmbeddingsReq { model, input: text })
            .send()
            .await
            .context("failed to call openai embeddings endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "openai /v1/embeddings returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        let response = response
            .json::<EmbeddingsResp>()
            .await
            .context("failed to decode openai embeddings response")?;

        response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| anyhow::anyhow!("openai /v1/embeddings returned no data"))
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        let body = ChatCompletionReq {
            model,
            temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .context("failed to call openai chat completions endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "openai /v1/chat/completions returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        let response = response
            .json::<ChatCompletionResp>()
            .await
            .context("failed to decode openai chat completions response")?;

        first_choice_content(response)
    }
}

#[derive(Serialize)]
struct ChatCompletionReq<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice_content(response: ChatCompletionResp) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow::anyhow!("openai /v1/chat/completions returned no content"))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        self.embed_text(model, text).await
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        self.chat_completion(model, system, user, temperature).await
    }
}
