use thiserror::Error;

/// Failure of a single chat request. Every variant aborts the whole request.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The question was empty after trimming or the request body was malformed.
    #[error("{0}")]
    Validation(String),

    /// Embedding the question or searching the vector store failed.
    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    /// The answer model call failed.
    #[error("generation failed: {0:#}")]
    Generation(anyhow::Error),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        ChatError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
