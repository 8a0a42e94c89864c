use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Liveness check. Reports whether the model client is configured but stays
/// 200 either way, since the service keeps answering in degraded mode.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model_status = if state.chat.is_available() {
        "available"
    } else {
        "unavailable"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": state.service_name.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
            "model": model_status,
            "model_name": state.chat.model(),
            "table": state.chat.table_source().table(),
        })),
    )
}

/// Readiness check: ready once the database answers.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state
        .chat
        .table_source()
        .health_check()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Readiness check failed");
            AppError::ServiceUnavailable
        })?;

    Ok(StatusCode::OK)
}
