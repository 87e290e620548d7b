use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::providers::{EmbeddingProvider, TextGenerator};

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbedReq<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbedResp {
            embeddings: Vec<Vec<f32>>,
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&EmbedReq { model, input: text })
            .send()
            .await
            .context("failed to call ollama embed endpoint")?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "ollama /api/embed returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        let response = response
            .json::<EmbedResp>()
            .await
            .context("failed to decode ollama /api/embed response")?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("ollama /api/embed returned empty embeddings array"))
    }

    pub async fn generate_text(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateReq<'a> {
            model: &'a str,
            system: &'a str,
            prompt: &'a str,
            stream: bool,
            options: GenerateOptions,
        }

        #[derive(Serialize)]
        struct GenerateOptions {
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct GenerateResp {
            response: String,
        }

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&GenerateReq {
                model,
                system,
                prompt,
                stream: false,
                options: GenerateOptions { temperature },
            })
            .send()
            .await
            .context("failed to call ollama generate endpoint")?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "ollama /api/generate returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        let response = response
            .json::<GenerateResp>()
            .await
            .context("failed to decode ollama generate response")?;

        Ok(response.response.trim().to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        self.embed_text(model, text).await
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        self.generate_text(model, system, user, temperature).await
    }
}

/// Pulls the `error` field out of a JSON error body, falling back to the raw text.
pub(crate) fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
        if let Some(err) = json
            .get("error")
            .and_then(|v| v.get("message"))
            .and_then(|v| v.as_str())
        {
            return err.to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_json_error_field() {
        assert_eq!(
            normalize_err_body(r#"{"error":"model \"nope\" not found"}"#),
            "model \"nope\" not found"
        );
    }

    #[test]
    fn error_body_reads_nested_openai_style_message() {
        assert_eq!(
            normalize_err_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#),
            "Incorrect API key provided"
        );
    }

    #[test]
    fn error_body_falls_back_to_raw_text() {
        assert_eq!(normalize_err_body("  bad gateway \n"), "bad gateway");
        assert_eq!(normalize_err_body(""), "<empty body>");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = OllamaClient::new("http://127.0.0.1:11434/");
        assert_eq!(client.base_url, "http://127.0.0.1:11434");
    }
}
