use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::models::RetrievedPassage;
use crate::providers::{DocumentFilter, VectorStore};

/// Payload key the ingestion pipeline stores the source document identifier under.
const SOURCE_FILTER_KEY: &str = "metadata.source";

#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    score_threshold: Option<f32>,
}

impl QdrantStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key: None,
            score_threshold: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn search_body(&self, vector: &[f32], limit: usize, filter: &DocumentFilter) -> Value {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "filter": {
                "must": [
                    { "key": SOURCE_FILTER_KEY, "match": { "value": filter.source } }
                ]
            }
        });
        if let Some(threshold) = self.score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        body
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &DocumentFilter,
    ) -> Result<Vec<RetrievedPassage>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let mut request = self
            .client
            .post(url)
            .json(&self.search_body(vector, limit, filter));
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .context("failed to contact qdrant during search")?
            .error_for_status()
            .context("qdrant search returned non-success status")?
            .json::<QdrantSearchResponse>()
            .await
            .context("failed to decode qdrant search response")?;

        Ok(response.result.into_iter().map(into_passage).collect())
    }
}

/// Qdrant already returns hits best-first; the order is kept as is.
fn into_passage(point: QdrantResultPoint) -> RetrievedPassage {
    let mut payload = point.payload.unwrap_or_default();

    let content = match payload.remove("content") {
        Some(Value::String(text)) => text,
        other => {
            tracing::warn!(
                score = point.score,
                content = ?other,
                "qdrant hit has no string content in its payload"
            );
            String::new()
        }
    };

    let metadata = match payload.remove("metadata") {
        Some(Value::Object(map)) => map,
        _ => payload,
    };

    RetrievedPassage {
        content,
        similarity: point.score,
        metadata,
    }
}

#[derive(Debug, Deserialize)]
struct QdrantSearchResponse {
    result: Vec<QdrantResultPoint>,
}

#[derive(Debug, Deserialize)]
struct QdrantResultPoint {
    score: f64,
    payload: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_body_filters_by_document_source() {
        let store = QdrantStore::new("http://localhost:6333/", "textbook_chunks");
        let body = store.search_body(
            &[0.1, 0.2],
            8,
            &DocumentFilter {
                source: "nutrition-textbook".to_string(),
            },
        );

        assert_eq!(body["limit"], 8);
        assert_eq!(body["filter"]["must"][0]["key"], "metadata.source");
        assert_eq!(
            body["filter"]["must"][0]["match"]["value"],
            "nutrition-textbook"
        );
        assert!(body.get("score_threshold").is_none());
    }

    #[test]
    fn score_threshold_is_passed_through() {
        let store =
            QdrantStore::new("http://localhost:6333", "c").with_score_threshold(Some(0.3));
        let body = store.search_body(
            &[0.0],
            8,
            &DocumentFilter {
                source: "s".to_string(),
            },
        );
        let threshold = body["score_threshold"].as_f64().unwrap();
        assert!((threshold - 0.3).abs() < 1e-6);
    }

    #[test]
    fn response_points_keep_store_order_and_metadata() {
        let raw = r#"{
            "result": [
                {"id": "a", "score": 0.91, "payload": {"content": "Carbohydrates", "metadata": {"page": 12, "source": "nutrition-textbook", "chapter": "4"}}},
                {"id": "b", "score": 0.87, "payload": {"content": "Fats", "metadata": {"source": "nutrition-textbook"}}}
            ],
            "status": "ok",
            "time": 0.002
        }"#;
        let response: QdrantSearchResponse = serde_json::from_str(raw).unwrap();
        let passages: Vec<RetrievedPassage> =
            response.result.into_iter().map(into_passage).collect();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "Carbohydrates");
        assert_eq!(passages[0].page(), Some(12));
        assert_eq!(passages[0].metadata["chapter"], "4");
        assert_eq!(passages[1].content, "Fats");
        assert_eq!(passages[1].page(), None);
    }

    #[test]
    fn hit_without_content_keeps_its_slot() {
        let point: QdrantResultPoint = serde_json::from_str(
            r#"{"score": 0.4, "payload": {"text": "misnamed", "metadata": {"page": 3}}}"#,
        )
        .unwrap();
        let passage = into_passage(point);
        assert_eq!(passage.content, "");
        assert_eq!(passage.page(), Some(3));

        let bare: QdrantResultPoint = serde_json::from_str(r#"{"score": 0.2}"#).unwrap();
        assert_eq!(into_passage(bare).content, "");
    }

    #[test]
    fn flat_payload_is_used_as_metadata() {
        let point: QdrantResultPoint = serde_json::from_str(
            r#"{"score": 0.5, "payload": {"content": "Water", "page": 7}}"#,
        )
        .unwrap();
        let passage = into_passage(point);
        assert_eq!(passage.content, "Water");
        assert_eq!(passage.page(), Some(7));
    }
}
