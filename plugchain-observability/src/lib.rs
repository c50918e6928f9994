pub mod metrics;
pub mod tracing;

pub use metrics::{chain_metrics, gather_metrics, ChainMetrics, REGISTRY};
pub use tracing::{init_tracing, TracingConfig};

/// Basic initialization: metrics registered up front, then either full tracing or minimal logging
pub fn init_basic_observability(service_name: &str, enable_tracing: bool) {
    let _ = chain_metrics();

    if enable_tracing {
        let _ = init_tracing(TracingConfig {
            service_name: service_name.to_string(),
            json: std::env::var("PLUGCHAIN_LOG_JSON").is_ok_and(|v| v == "1"),
            ..Default::default()
        });
    } else {
        init_minimal_logging();
    }
}

/// Minimal logging setup without metrics
pub fn init_minimal_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
