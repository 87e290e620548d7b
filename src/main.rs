use anyhow::Result;
use tracing_subscriber::EnvFilter;

use textbook_chat::{run_server, AppConfig, ChatService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        provider = ?config.models.provider,
        answer_model = %config.models.answer_model,
        embedding_model = %config.models.embedding_model,
        document = %config.retrieval.document_source,
        "starting textbook chat server"
    );

    let chat = ChatService::from_config(&config)?;

    run_server(config, chat).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
