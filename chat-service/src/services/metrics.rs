//! Domain metrics for the chat endpoint, recorded through the `metrics` facade.

use metrics::{counter, histogram};
use std::time::Duration;

/// Count one answered question by outcome (`answered`, `invalid_input`, ...).
pub fn record_answer(outcome: &'static str) {
    counter!("chat_answers_total", "outcome" => outcome).increment(1);
}

/// Record how long a model call took and whether it succeeded.
pub fn record_model_call(model: &str, success: bool, elapsed: Duration) {
    let status = if success { "ok" } else { "error" };
    histogram!(
        "chat_model_latency_seconds",
        "model" => model.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

/// Count tokens reported by the model.
pub fn record_tokens(model: &str, input_tokens: i32, output_tokens: i32) {
    let model = model.to_string();
    counter!("chat_model_tokens_total", "model" => model.clone(), "type" => "input")
        .increment(input_tokens.max(0) as u64);
    counter!("chat_model_tokens_total", "model" => model, "type" => "output")
        .increment(output_tokens.max(0) as u64);
}
