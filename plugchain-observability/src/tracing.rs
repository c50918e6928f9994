use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialization options for tracing
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    /// Emit one JSON object per event instead of human readable lines
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "plugchain".to_string(),
            json: false,
            default_filter: "info".to_string(),
        }
    }
}

/// Initialize the global tracing subscriber
pub fn init_tracing(config: TracingConfig) -> Result<(), anyhow::Error> {
    // Default to "info" level only - "debug" logs every dropped constraint and chain span
    // Use RUST_LOG=plugchain_plugin=trace to follow individual plugin steps
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_current_span(true).with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_thread_ids(true).with_target(true));

    Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    tracing::info!(service = %config.service_name, "Tracing initialized");
    Ok(())
}
