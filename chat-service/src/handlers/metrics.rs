use crate::AppState;
use axum::{extract::State, response::IntoResponse};

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}
