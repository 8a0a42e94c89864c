//! Shared fixtures for chat-service integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chat_service::config::CorsConfig;
use chat_service::models::{ColumnDescriptor, TableContext};
use chat_service::services::providers::mock::MockTextProvider;
use chat_service::services::providers::TextProvider;
use chat_service::services::table::StaticTableSource;
use chat_service::services::ChatService;
use chat_service::startup::build_router;
use chat_service::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use service_core::observability::detached_metrics_handle;
use std::sync::Arc;

/// Three-row `users` table.
pub fn users_context() -> TableContext {
    let rows = [
        json!({"id": 1, "name": "Ada", "email": "ada@example.com"}),
        json!({"id": 2, "name": "Grace", "email": "grace@example.com"}),
        json!({"id": 3, "name": "Linus", "email": null}),
    ]
    .into_iter()
    .map(|row| row.as_object().cloned().unwrap())
    .collect();

    let mut id = ColumnDescriptor::new("id", "int");
    id.nullable = false;
    id.key = "PRI".to_string();
    id.extra = "auto_increment".to_string();

    TableContext {
        table: "users".to_string(),
        columns: vec![
            id,
            ColumnDescriptor::new("name", "varchar(255)"),
            ColumnDescriptor::new("email", "varchar(255)"),
        ],
        rows,
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Option<Arc<MockTextProvider>>,
    pub source: Arc<StaticTableSource>,
}

impl TestApp {
    pub fn new(provider: Option<MockTextProvider>, source: StaticTableSource) -> Self {
        let provider = provider.map(Arc::new);
        let source = Arc::new(source);

        let chat = ChatService::new(
            provider.clone().map(|p| p as Arc<dyn TextProvider>),
            source.clone(),
        );
        let state = AppState::new("chat-service-test", chat, detached_metrics_handle());
        let router = build_router(state, &CorsConfig::default()).expect("router should build");

        Self {
            router,
            provider,
            source,
        }
    }

    /// App whose model always answers `reply` about [`users_context`].
    pub fn replying(reply: &str) -> Self {
        Self::new(
            Some(MockTextProvider::replying(reply)),
            StaticTableSource::new(users_context()),
        )
    }

    pub fn provider_calls(&self) -> usize {
        self.provider.as_ref().map(|p| p.call_count()).unwrap_or(0)
    }

    pub async fn post_chat(&self, body: impl Into<Body>) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;

        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
