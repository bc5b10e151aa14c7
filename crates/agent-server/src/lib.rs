//! # agent-server
//!
//! Driver-facing surfaces for the trainer and summarizer agents: an axum
//! HTTP API (`agent-server`) and an interactive terminal chat
//! (`trainer-chat`).

pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    end_session, health_check, list_models, list_sessions, open_session, post_message, summarize,
    trainer_ask,
};
use crate::state::AppState;

/// Install the `tracing` subscriber; `RUST_LOG` overrides `default_filter`
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))

        // Batch
        .route("/api/summarize", post(summarize))
        .route("/api/trainer/ask", post(trainer_ask))

        // Conversational
        .route("/api/trainer/sessions", post(open_session).get(list_sessions))
        .route("/api/trainer/sessions/{id}/messages", post(post_message))
        .route("/api/trainer/sessions/{id}", delete(end_session))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
