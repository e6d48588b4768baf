//! Conversation management HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/conversations               - List the caller's conversations
//! - GET    /api/v1/conversations/{id}/messages - Ordered message history
//! - PUT    /api/v1/conversations/{id}/title    - Rename a conversation
//! - DELETE /api/v1/conversations/{id}          - Delete a conversation and its messages
//!
//! Ownership is enforced inside `ChatService`; these handlers only parse,
//! delegate, and wrap.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use parlance_types::chat::{Conversation, Message};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthedUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `PUT /conversations/{id}/title`.
#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid conversation id: {s}")))
}

/// GET /api/v1/conversations - List the caller's conversations, most
/// recently active first.
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<ApiResponse<Vec<Conversation>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversations = state.chat_service.conversations(user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(conversations, request_id, elapsed)
            .with_link("self", "/api/v1/conversations"),
    ))
}

/// GET /api/v1/conversations/{id}/messages - Ordered message history of an
/// owned conversation.
pub async fn get_messages(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversation_id = parse_uuid(&id)?;
    let messages = state.chat_service.history(user_id, &conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(messages, request_id, elapsed)
            .with_link("self", &format!("/api/v1/conversations/{id}/messages")),
    ))
}

/// PUT /api/v1/conversations/{id}/title - Rename an owned conversation.
pub async fn update_title(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversation_id = parse_uuid(&id)?;
    state
        .chat_service
        .rename(user_id, &conversation_id, &request.title)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(json!({ "updated": true }), request_id, elapsed)
            .with_link("self", &format!("/api/v1/conversations/{id}")),
    ))
}

/// DELETE /api/v1/conversations/{id} - Delete an owned conversation and all
/// its messages.
pub async fn delete_conversation(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversation_id = parse_uuid(&id)?;
    state.chat_service.delete(user_id, &conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(json!({ "deleted": true }), request_id, elapsed)
            .with_link("conversations", "/api/v1/conversations"),
    ))
}
