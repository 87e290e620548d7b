use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A passage returned by the vector store, in store order.
///
/// `metadata` is whatever the ingestion pipeline attached to the chunk. Only the
/// `page` key is read; everything else is carried along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub content: String,
    pub similarity: f64,
    pub metadata: Map<String, Value>,
}

impl RetrievedPassage {
    pub fn new(content: impl Into<String>, similarity: f64) -> Self {
        Self {
            content: content.into(),
            similarity,
            metadata: Map::new(),
        }
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.metadata.insert("page".to_string(), Value::from(page));
        self
    }

    /// Page number if the metadata carries an integral numeric `page`.
    pub fn page(&self) -> Option<i64> {
        match self.metadata.get("page")? {
            Value::Number(n) => n.as_i64().or_else(|| {
                // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
                n.as_f64()
                    .filter(|f| {
                        f.is_finite()
                            && f.fract() == 0.0
                            && *f >= i64::MIN as f64
                            && *f < i64::MAX as f64
                    })
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }
}

/// Client-visible form of a retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub page: Option<i64>,
    pub content: String,
    pub similarity: f64,
    /// 1-based position in the response's source list.
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}
