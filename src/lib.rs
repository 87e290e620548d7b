pub mod chat;
pub mod client;
pub mod config;
pub mod context;
pub mod embedder;
pub mod error;
pub mod generation;
pub mod models;
pub mod ollama;
pub mod openai;
pub mod providers;
pub mod qdrant_store;
pub mod retrieval;
pub mod server;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::ChatService;
pub use config::AppConfig;
pub use error::ChatError;
pub use server::{build_router, run_server};
