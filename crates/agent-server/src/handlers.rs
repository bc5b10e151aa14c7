//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use agent_core::reasoning::ToolActivity;
use agent_core::session::{ChatSession, LoopState};
use agent_core::provider::ModelInfo;
use agent_core::{AgentError, DriverInput, RunOutput, SessionId, SessionStore, TurnReport};
use gym_trainer::{FAREWELL, GREETING};
use summarizer::SummarizeOutput;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: String,
    pub backend_connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn store_error(e: &AgentError) -> ApiError {
    tracing::error!("Session store error: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "SESSION_STORE", e.user_message())
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub goal: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

const fn default_list_limit() -> usize {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub state: LoopState,
    pub message_count: usize,
    pub updated_at: String,
}

impl From<&ChatSession> for SessionSummary {
    fn from(session: &ChatSession) -> Self {
        Self {
            session_id: session.id.to_string(),
            title: session.title(),
            state: session.state,
            message_count: session.message_count(),
            updated_at: session.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionMessageRequest {
    pub message: String,
}

/// Outcome of one driver turn
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub replies: Vec<String>,
    pub tools: Vec<ToolActivity>,
    pub ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnResponse {
    fn new(session: &ChatSession, turn: Result<TurnReport, AgentError>) -> Self {
        let session_id = session.id.to_string();
        match turn {
            Ok(report) => Self {
                session_id,
                replies: report.replies,
                tools: report.tools,
                ended: report.ended || !session.is_active(),
                error: None,
            },
            // The loop already ended the session with the reason
            Err(e) => Self {
                session_id,
                replies: Vec::new(),
                tools: Vec::new(),
                ended: !session.is_active(),
                error: Some(e.user_message()),
            },
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_connected = state.gateway.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.gateway.name().to_string(),
        backend_connected,
    })
}

/// List the backend's models
pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    state.gateway.list_models().await.map(Json).map_err(|e| {
        tracing::warn!("Model listing failed: {}", e);
        api_error(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", e.user_message())
    })
}

/// Batch summarization; failures are reported in the status field
pub async fn summarize(
    State(state): State<AppState>,
    Json(payload): Json<SummarizeRequest>,
) -> Json<SummarizeOutput> {
    Json(state.summarizer.run(&payload.text).await)
}

/// Batch trainer run of one goal
pub async fn trainer_ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<RunOutput>, ApiError> {
    if payload.goal.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_GOAL", "goal must not be empty"));
    }
    Ok(Json(state.trainer.ask(&payload.goal).await))
}

/// Open a trainer conversation and run the greeting turn
pub async fn open_session(
    State(state): State<AppState>,
    payload: Option<Json<OpenSessionRequest>>,
) -> Result<(StatusCode, Json<TurnResponse>), ApiError> {
    let Json(request) = payload.unwrap_or_default();

    let (mut session, turn) = state.trainer.open(GREETING).await;
    session.metadata.user_id = request.user_id;

    state.sessions.save(&session).map_err(|e| store_error(&e))?;
    Ok((StatusCode::CREATED, Json(TurnResponse::new(&session, turn))))
}

/// Most recently active conversations, optionally for one user
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = state
        .sessions
        .list(query.user_id.as_deref(), query.limit)
        .map_err(|e| store_error(&e))?;

    Ok(Json(sessions.iter().map(SessionSummary::from).collect()))
}

/// One driver turn; an end word closes the conversation
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SessionMessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let mut session = load_session(&state, &id)?;

    if !session.is_active() {
        return Err(api_error(
            StatusCode::CONFLICT,
            "SESSION_ENDED",
            AgentError::SessionEnded(id).user_message(),
        ));
    }

    let input = state.trainer.interpret(&payload.message);
    if input == DriverInput::Text(String::new()) {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "message must not be empty"));
    }
    let farewell = input == DriverInput::End;

    let turn = state.trainer.submit(&mut session, input).await;
    state.sessions.save(&session).map_err(|e| store_error(&e))?;

    let mut response = TurnResponse::new(&session, turn);
    if farewell {
        response.replies.push(FAREWELL.into());
    }
    Ok(Json(response))
}

/// Explicitly end and forget a conversation
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut session = load_session(&state, &id)?;
    session.end("ended by driver");

    state
        .sessions
        .delete(&session.id)
        .map_err(|e| store_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

fn load_session(state: &AppState, id: &str) -> Result<ChatSession, ApiError> {
    state
        .sessions
        .load(&SessionId::from_string(id))
        .map_err(|e| store_error(&e))?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                format!("no session with id '{id}'"),
            )
        })
}
