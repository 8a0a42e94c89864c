use crate::models::{ChatRequest, ChatResponse};
use crate::services::ChatError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use service_core::middleware::tracing::RequestId;

/// `POST /api/chat`
///
/// Always answers 200 with `{"answer": ...}`, including for bodies that
/// cannot be decoded; domain failures are reported in the answer text.
pub async fn chat(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatResponse> {
    let question = payload.map(|Json(req)| req.question).map_err(|rejection| {
        ChatError::Unexpected(anyhow::anyhow!(
            "Failed to read chat request: {}",
            rejection.body_text()
        ))
    });

    let answer = state.chat.answer(question).await;

    tracing::info!(
        request_id = request_id.as_ref().map(|Extension(id)| id.as_str()).unwrap_or("-"),
        outcome = answer.outcome,
        answer_len = answer.text.len(),
        "Chat request answered"
    );

    Json(ChatResponse::new(answer.text))
}
