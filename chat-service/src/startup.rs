//! Application startup and lifecycle management.

use crate::config::{ChatConfig, CorsConfig, GeminiSettings};
use crate::handlers::{
    chat::chat,
    health::{health_check, readiness_check},
    metrics::metrics,
};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::table::MySqlTableSource;
use crate::services::ChatService;
use crate::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the model client, or `None` when it cannot be initialized.
///
/// A missing key is not fatal: the service runs degraded and answers every
/// question with the unavailable message.
pub fn init_text_provider(settings: &GeminiSettings) -> Option<Arc<dyn TextProvider>> {
    let Some(api_key) = settings.api_key.clone() else {
        tracing::error!("Gemini API initialization failed: GEMINI_API_KEY is missing");
        return None;
    };

    let mut config = GeminiConfig::new(api_key, settings.model.clone());
    config.api_base = settings.api_base.clone();

    match GeminiTextProvider::new(config) {
        Ok(provider) => {
            tracing::info!(model = %provider.model(), "Initialized Gemini text provider");
            let provider: Arc<dyn TextProvider> = Arc::new(provider);
            Some(provider)
        }
        Err(e) => {
            tracing::error!(error = %e, "Gemini API initialization failed");
            None
        }
    }
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, AppError> {
    if config.allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState, cors: &CorsConfig) -> Result<Router, AppError> {
    let router = Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .layer(from_fn(metrics_middleware))
        .layer(cors_layer(cors)?)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    Ok(router)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig, metrics: PrometheusHandle) -> Result<Self, AppError> {
        let source = Arc::new(MySqlTableSource::new(&config.database));
        let provider = init_text_provider(&config.gemini);

        // Logged only; a failure here does not disable the provider.
        if let Some(provider) = provider.clone() {
            tokio::spawn(async move {
                match provider.health_check().await {
                    Ok(()) => tracing::info!(model = %provider.model(), "Gemini API reachable"),
                    Err(e) => tracing::warn!(error = %e, "Gemini API health check failed"),
                }
            });
        }

        let chat = ChatService::new(provider, source);

        Self::build_with(&config, chat, metrics).await
    }

    /// Build around an existing [`ChatService`], e.g. one wired to mocks.
    pub async fn build_with(
        config: &ChatConfig,
        chat: ChatService,
        metrics: PrometheusHandle,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.service_name.clone(), chat, metrics);
        let router = build_router(state, &config.cors)?;

        // Port 0 = random port for testing
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
