//! The question handler: table context + question in, one answer out.
//!
//! Every failure is turned into a fixed, user-facing answer here. Callers get
//! an [`Answer`] back no matter what happened downstream.

use super::metrics;
use super::prompt::build_prompt;
use super::providers::{ProviderError, TextProvider};
use super::table::{DataSourceError, TableSource};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub const ANSWER_SERVICE_UNAVAILABLE: &str = "AI service is not available. Please try again later.";
pub const ANSWER_INVALID_INPUT: &str = "Please provide a question.";
pub const ANSWER_DATABASE_FAILED: &str = "Database connection failed.";
pub const ANSWER_MODEL_FAILED: &str = "AI failed to generate a response. Please try again.";
pub const ANSWER_UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("AI service is not initialized")]
    ServiceUnavailable,

    #[error("Question is empty")]
    InvalidInput,

    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Model error: {0}")]
    Model(#[from] ProviderError),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl ChatError {
    /// The fixed answer returned to the caller. Never carries error details.
    pub fn answer(&self) -> &'static str {
        match self {
            ChatError::ServiceUnavailable => ANSWER_SERVICE_UNAVAILABLE,
            ChatError::InvalidInput => ANSWER_INVALID_INPUT,
            ChatError::DataSource(_) => ANSWER_DATABASE_FAILED,
            ChatError::Model(_) => ANSWER_MODEL_FAILED,
            ChatError::Unexpected(_) => ANSWER_UNEXPECTED,
        }
    }

    /// Outcome label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ChatError::ServiceUnavailable => "service_unavailable",
            ChatError::InvalidInput => "invalid_input",
            ChatError::DataSource(_) => "data_source_error",
            ChatError::Model(_) => "model_error",
            ChatError::Unexpected(_) => "unexpected_error",
        }
    }
}

/// Text returned to the caller and how it came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub outcome: &'static str,
}

impl Answer {
    pub fn is_model_answer(&self) -> bool {
        self.outcome == OUTCOME_ANSWERED
    }
}

const OUTCOME_ANSWERED: &str = "answered";

/// Answers natural-language questions about one database table.
///
/// Holds no per-request state; clones share the provider and table source.
#[derive(Clone)]
pub struct ChatService {
    provider: Option<Arc<dyn TextProvider>>,
    source: Arc<dyn TableSource>,
}

impl ChatService {
    /// `provider` is `None` when the model client failed to initialize; the
    /// service then answers every question with the unavailable message.
    pub fn new(provider: Option<Arc<dyn TextProvider>>, source: Arc<dyn TableSource>) -> Self {
        Self { provider, source }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    pub fn table_source(&self) -> &Arc<dyn TableSource> {
        &self.source
    }

    /// Answer `question`, or the error that prevented reading it.
    ///
    /// Never fails: each error (and a panic anywhere below) becomes the
    /// matching fixed answer.
    #[instrument(skip_all, fields(table = %self.source.table()))]
    pub async fn answer(&self, question: Result<String, ChatError>) -> Answer {
        let result = AssertUnwindSafe(self.run(question))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ChatError::Unexpected(anyhow::anyhow!(
                    "question handler panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let answer = match result {
            Ok(text) => Answer {
                text,
                outcome: OUTCOME_ANSWERED,
            },
            Err(err) => {
                log_failure(&err);
                Answer {
                    text: err.answer().to_string(),
                    outcome: err.outcome(),
                }
            }
        };

        metrics::record_answer(answer.outcome);
        answer
    }

    async fn run(&self, question: Result<String, ChatError>) -> Result<String, ChatError> {
        // Availability is checked before the request is even looked at.
        let provider = self.provider.as_ref().ok_or(ChatError::ServiceUnavailable)?;

        let question = question?;
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidInput);
        }

        info!(question_len = question.len(), "Received question");
        debug!(question = %question, "Question text");

        let context = self.source.fetch_context().await?;

        let prompt = build_prompt(&context, question)
            .map_err(|e| ChatError::Unexpected(anyhow::anyhow!("Failed to render prompt: {}", e)))?;

        info!(model = %provider.model(), prompt_len = prompt.len(), "Sending prompt to model");

        let started = Instant::now();
        let result = provider.generate(&prompt).await;
        metrics::record_model_call(provider.model(), result.is_ok(), started.elapsed());

        let response = result?;
        metrics::record_tokens(provider.model(), response.input_tokens, response.output_tokens);

        response.text.ok_or_else(|| {
            ChatError::Model(ProviderError::ApiError(format!(
                "response contained no text (finish reason: {})",
                response.finish_reason.as_str()
            )))
        })
    }
}

fn log_failure(err: &ChatError) {
    match err {
        ChatError::ServiceUnavailable => warn!("Question rejected: AI service is not available"),
        ChatError::InvalidInput => debug!("Question rejected: empty question"),
        ChatError::DataSource(e) => error!(error = %e, kind = e.kind(), "Database error"),
        ChatError::Model(e) => error!(error = %e, kind = e.kind(), "Model error"),
        ChatError::Unexpected(e) => error!(error = %e, "Unexpected error"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDescriptor, TableContext};
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::table::StaticTableSource;
    use serde_json::json;

    fn users_context() -> TableContext {
        let rows = (1..=3)
            .map(|id| {
                json!({"id": id, "email": format!("user{}@example.com", id)})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();

        TableContext {
            table: "users".to_string(),
            columns: vec![
                ColumnDescriptor::new("id", "int"),
                ColumnDescriptor::new("email", "varchar"),
            ],
            rows,
        }
    }

    fn service(
        provider: Option<Arc<MockTextProvider>>,
        source: Arc<StaticTableSource>,
    ) -> ChatService {
        ChatService::new(provider.map(|p| p as Arc<dyn TextProvider>), source)
    }

    #[tokio::test]
    async fn returns_model_text_verbatim() {
        let provider = Arc::new(MockTextProvider::replying("There are 3 users."));
        let source = Arc::new(StaticTableSource::new(users_context()));
        let chat = service(Some(provider.clone()), source.clone());

        let answer = chat
            .answer(Ok("How many users are there?".to_string()))
            .await;

        assert_eq!(answer.text, "There are 3 users.");
        assert!(answer.is_model_answer());
        assert_eq!(source.call_count(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn prompt_carries_question_schema_and_rows() {
        let provider = Arc::new(MockTextProvider::replying("ok"));
        let context = users_context();
        let chat = service(
            Some(provider.clone()),
            Arc::new(StaticTableSource::new(context.clone())),
        );

        chat.answer(Ok("  How many users are there?\n".to_string()))
            .await;

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        assert!(prompt.contains("\"How many users are there?\""));
        assert!(prompt.contains(&crate::services::prompt::render_schema(&context.columns).unwrap()));
        assert!(prompt.contains(&crate::services::prompt::render_rows(&context.rows).unwrap()));
    }

    #[tokio::test]
    async fn whitespace_question_touches_nothing() {
        let provider = Arc::new(MockTextProvider::replying("unused"));
        let source = Arc::new(StaticTableSource::new(users_context()));
        let chat = service(Some(provider.clone()), source.clone());

        for question in ["", "   ", "\n\t "] {
            let answer = chat.answer(Ok(question.to_string())).await;
            assert_eq!(answer.text, ANSWER_INVALID_INPUT);
            assert_eq!(answer.outcome, "invalid_input");
        }

        assert_eq!(source.call_count(), 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_model_short_circuits_before_database() {
        let source = Arc::new(StaticTableSource::new(users_context()));
        let chat = service(None, source.clone());

        for question in ["How many users?", "", "   "] {
            let answer = chat.answer(Ok(question.to_string())).await;
            assert_eq!(answer.text, ANSWER_SERVICE_UNAVAILABLE);
        }
        let answer = chat
            .answer(Err(ChatError::Unexpected(anyhow::anyhow!("bad body"))))
            .await;
        assert_eq!(answer.text, ANSWER_SERVICE_UNAVAILABLE);

        assert!(!chat.is_available());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn database_failure_never_reaches_model() {
        let provider = Arc::new(MockTextProvider::replying("unused"));
        let chat = service(
            Some(provider.clone()),
            Arc::new(StaticTableSource::unreachable("users")),
        );

        let answer = chat.answer(Ok("How many users?".to_string())).await;

        assert_eq!(answer.text, ANSWER_DATABASE_FAILED);
        assert_eq!(answer.outcome, "data_source_error");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_returns_model_fallback() {
        let chat = service(
            Some(Arc::new(MockTextProvider::failing("quota exceeded"))),
            Arc::new(StaticTableSource::new(users_context())),
        );

        let answer = chat.answer(Ok("How many users?".to_string())).await;

        assert_eq!(answer.text, ANSWER_MODEL_FAILED);
        assert!(!answer.text.contains("quota"));
    }

    #[tokio::test]
    async fn model_response_without_text_is_model_failure() {
        let chat = service(
            Some(Arc::new(MockTextProvider::empty())),
            Arc::new(StaticTableSource::new(users_context())),
        );

        let answer = chat.answer(Ok("How many users?".to_string())).await;

        assert_eq!(answer.text, ANSWER_MODEL_FAILED);
    }

    #[tokio::test]
    async fn panic_below_is_caught_as_unexpected() {
        let chat = service(
            Some(Arc::new(MockTextProvider::panicking())),
            Arc::new(StaticTableSource::new(users_context())),
        );

        let answer = chat.answer(Ok("How many users?".to_string())).await;

        assert_eq!(answer.text, ANSWER_UNEXPECTED);
        assert_eq!(answer.outcome, "unexpected_error");
    }

    #[tokio::test]
    async fn unreadable_request_is_unexpected_when_available() {
        let source = Arc::new(StaticTableSource::new(users_context()));
        let chat = service(Some(Arc::new(MockTextProvider::replying("unused"))), source.clone());

        let answer = chat
            .answer(Err(ChatError::Unexpected(anyhow::anyhow!("not json"))))
            .await;

        assert_eq!(answer.text, ANSWER_UNEXPECTED);
        assert_eq!(source.call_count(), 0);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
    }
}
