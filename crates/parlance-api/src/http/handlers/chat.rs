//! Chat turn HTTP handler.
//!
//! `POST /api/v1/chat` runs one full turn: persist the user message, call
//! the generation service, persist and return the reply. The WebSocket
//! session layer offers the same operation over a persistent connection.

use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use parlance_types::chat::{ChatReply, ChatRequest};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthedUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Deadline on the generation leg of one REST chat turn. The user message
/// persisted before the call is never rolled back on expiry.
const CHAT_DEADLINE: Duration = Duration::from_secs(30);

/// POST /api/v1/chat - Run one chat turn.
pub async fn chat(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let reply = state
        .chat_service
        .chat(user_id, &request, CHAT_DEADLINE)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let history = format!("/api/v1/conversations/{}/messages", reply.conversation_id);

    Ok(Json(
        ApiResponse::success(reply, request_id, elapsed).with_link("history", &history),
    ))
}
