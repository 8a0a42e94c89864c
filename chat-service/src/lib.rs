pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use metrics_exporter_prometheus::PrometheusHandle;
use services::ChatService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub chat: ChatService,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(service_name: impl Into<String>, chat: ChatService, metrics: PrometheusHandle) -> Self {
        Self {
            service_name: service_name.into(),
            chat,
            metrics,
        }
    }
}
