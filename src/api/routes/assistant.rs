//! Assistant Routes
//!
//! Streaming chat endpoint for the study assistant.
//!
//! - POST /api/v1/assistant/chat - Relay a chat turn, executing tool calls
//!
//! The response is `text/plain` and chunked: prose as the model writes it,
//! with marker blocks for every study record the assistant created.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use crate::api::dto::AssistantChatRequest;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::assistant;
use crate::provider::{ChatRequest, Role};
use crate::relay::{self, RELAY_CHANNEL_CAPACITY};
use crate::tools::{self, StudyToolHandler};

/// POST /api/v1/assistant/chat
///
/// Everything that can fail with a JSON error (auth, validation, provider
/// status) is checked before the streamed response is returned.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AssistantChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let token = bearer_token(&headers)?;
    let Json(req) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    validate_chat_request(&req)?;

    let context = if state.config.assistant.include_study_context {
        assistant::load_context(&state.backend, &token).await
    } else {
        None
    };

    let today = chrono::Local::now().date_naive();
    let request = ChatRequest {
        messages: assistant::build_messages(
            &state.config.assistant,
            &req.messages,
            context.as_ref(),
            today,
        ),
        tools: tools::tool_definitions(),
    };

    let chunks = state.provider.stream_chat(&request).await?;

    let (tx, rx) = mpsc::channel::<String>(RELAY_CHANNEL_CAPACITY);
    let handler = StudyToolHandler::new(Arc::clone(&state.backend), token);
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(request_id = %request_id, messages = req.messages.len(), "Starting assistant relay");

    let span = tracing::info_span!("relay", request_id = %request_id);
    tokio::spawn(
        async move {
            let _ = relay::run_relay(chunks, handler, tx).await;
        }
        .instrument(span),
    );

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response())
}

/// Extract the caller's bearer token
fn bearer_token(headers: &HeaderMap) -> ApiResult<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("invalid Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;

    Ok(token.to_string())
}

fn validate_chat_request(req: &AssistantChatRequest) -> ApiResult<()> {
    let last = req
        .messages
        .last()
        .ok_or_else(|| ApiError::Validation("messages cannot be empty".to_string()))?;

    if req.messages.iter().any(|m| m.role == Role::System) {
        return Err(ApiError::Validation(
            "system messages are not accepted".to_string(),
        ));
    }

    if last.role != Role::User {
        return Err(ApiError::Validation(
            "last message must come from the user".to_string(),
        ));
    }

    if last.content.trim().is_empty() {
        return Err(ApiError::Validation("message cannot be empty".to_string()));
    }

    Ok(())
}
