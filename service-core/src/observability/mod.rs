pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_tracing};
pub use metrics::{detached_metrics_handle, init_metrics};
