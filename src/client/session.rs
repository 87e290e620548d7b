use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::client::citations::{parse_answer, ParsedAnswer};
use crate::models::{ChatRequest, ChatResponse, Source};

/// Shown in place of any failed request; the underlying error is only logged.
pub const FAILURE_MESSAGE: &str =
    "Sorry, I couldn't reach the textbook assistant just now. Please try again in a moment.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to chat server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatResponse, ClientError>;
}

/// Talks to `POST {base_url}/chat`.
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    chat_url: String,
}

impl HttpChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            chat_url: format!("{}/chat", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    async fn send(&self, message: &str) -> Result<ChatResponse, ClientError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(response.json::<ChatResponse>().await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub answer: String,
    pub sources: Vec<Source>,
    pub parsed: ParsedAnswer,
    pub failed: bool,
}

impl AssistantReply {
    fn from_response(response: ChatResponse) -> Self {
        let parsed = parse_answer(&response.answer, &response.sources);
        Self {
            answer: response.answer,
            sources: response.sources,
            parsed,
            failed: false,
        }
    }

    fn failure() -> Self {
        Self {
            answer: FAILURE_MESSAGE.to_string(),
            sources: vec![],
            parsed: parse_answer(FAILURE_MESSAGE, &[]),
            failed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Input was blank after trimming; nothing was sent.
    Ignored,
    /// Another question from this session is still in flight.
    Busy,
    Replied(AssistantReply),
}

/// One user's conversation. Holds at most one outstanding request.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    busy: AtomicBool,
    transcript: Mutex<Vec<TranscriptEntry>>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            busy: AtomicBool::new(false),
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut entries) = self.transcript.lock() {
            entries.clear();
        }
    }

    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        let message = input.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SubmitOutcome::Busy;
        }
        let _guard = BusyGuard(&self.busy);

        self.record(Role::User, message);

        let reply = match self.transport.send(message).await {
            Ok(response) => AssistantReply::from_response(response),
            Err(err) => {
                tracing::warn!("chat request failed: {}", err);
                AssistantReply::failure()
            }
        };

        self.record(Role::Assistant, &reply.answer);
        SubmitOutcome::Replied(reply)
    }

    fn record(&self, role: Role, text: &str) {
        if let Ok(mut entries) = self.transcript.lock() {
            entries.push(TranscriptEntry {
                role,
                text: text.to_string(),
            });
        }
    }
}
