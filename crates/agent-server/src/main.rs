//! agent-server HTTP Server
//!
//! Axum-based REST API over the trainer and summarizer agents.

use std::sync::Arc;

use agent_server::config::ServerConfig;
use agent_server::state::AppState;
use gym_trainer::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    agent_server::init_tracing("info,tower_http=debug");

    let config = ServerConfig::from_env()?;
    let (gateway, model) = config.gateway()?;

    // Verify backend connection
    match gateway.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to {} (model {})", gateway.name(), model);
            if let Ok(models) = gateway.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not available - requests will fail", gateway.name());
        }
    }

    let profiles = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    tracing::info!("Trainer data in {}", config.data_dir.display());

    let state = AppState::new(gateway, &model, profiles, config.chunking)?;

    tracing::info!("Registered {} trainer tools:", state.trainer.tools().len());
    for name in state.trainer.tools().names() {
        tracing::info!("  • {}", name);
    }

    let app = agent_server::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 agent-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                           - Health check");
    tracing::info!("  GET    /api/models                       - List available models");
    tracing::info!("  POST   /api/summarize                    - Summarize a document");
    tracing::info!("  POST   /api/trainer/ask                  - One-shot trainer request");
    tracing::info!("  GET    /api/trainer/sessions             - List conversations");
    tracing::info!("  POST   /api/trainer/sessions             - Start a conversation");
    tracing::info!("  POST   /api/trainer/sessions/{{id}}/messages - Send a message");
    tracing::info!("  DELETE /api/trainer/sessions/{{id}}        - End a conversation");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
