//! Prometheus counters for chain invocations.

use plugchain_plugin::{BoxFuture, ChainHandler, ChainOutcome, PluginError, PluginResult};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;

/// Registry holding every plugchain metric
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static CHAIN_METRICS: LazyLock<ChainMetrics> =
    LazyLock::new(|| ChainMetrics::new(&REGISTRY).expect("chain metrics register once"));

/// Counters describing how chain invocations end
#[derive(Clone)]
pub struct ChainMetrics {
    invocations: IntCounterVec,
    terminations: IntCounterVec,
}

impl ChainMetrics {
    /// Create the counters and register them with `registry`
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let invocations = IntCounterVec::new(
            Opts::new(
                "plugchain_chain_invocations_total",
                "Chain invocations by outcome",
            ),
            &["outcome"],
        )?;
        let terminations = IntCounterVec::new(
            Opts::new(
                "plugchain_plugin_terminations_total",
                "Chains stopped early, by the plugin that stopped them",
            ),
            &["plugin"],
        )?;

        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(terminations.clone()))?;

        Ok(Self {
            invocations,
            terminations,
        })
    }

    pub fn record(&self, outcome: &ChainOutcome) {
        match outcome {
            ChainOutcome::Completed => {
                self.invocations.with_label_values(&["completed"]).inc();
            }
            ChainOutcome::Terminated { plugin } => {
                self.invocations.with_label_values(&["terminated"]).inc();
                self.terminations.with_label_values(&[plugin.as_str()]).inc();
            }
        }
    }

    /// Record the result of `ChainHandler::handle`, errors included
    pub fn observe(&self, result: &Result<ChainOutcome, PluginError>) {
        match result {
            Ok(outcome) => self.record(outcome),
            Err(_) => self.invocations.with_label_values(&["error"]).inc(),
        }
    }

    /// Run `handler` for one invocation and record how it ended.
    ///
    /// ```rust,no_run
    /// # async fn serve(handler: plugchain_plugin::ChainHandler, mut ctx: plugchain_plugin::HttpContext) {
    /// let outcome = plugchain_observability::chain_metrics()
    ///     .handle(&handler, &mut ctx, |ctx| Box::pin(async move {
    ///         *ctx.response.body_mut() = b"hello".to_vec();
    ///         Ok(())
    ///     }))
    ///     .await;
    /// # }
    /// ```
    pub async fn handle<C, F>(
        &self,
        handler: &ChainHandler<C>,
        ctx: &mut C,
        terminal: F,
    ) -> Result<ChainOutcome, PluginError>
    where
        C: Send + 'static,
        F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, PluginResult> + Send + 'static,
    {
        let result = handler.handle(ctx, terminal).await;
        self.observe(&result);
        result
    }

    pub fn invocations(&self, outcome: &str) -> u64 {
        self.invocations.with_label_values(&[outcome]).get()
    }

    pub fn terminations(&self, plugin: &str) -> u64 {
        self.terminations.with_label_values(&[plugin]).get()
    }
}

/// Process-wide chain metrics, registered with [`REGISTRY`] on first use
pub fn chain_metrics() -> &'static ChainMetrics {
    &CHAIN_METRICS
}

/// Render [`REGISTRY`] in the Prometheus text format
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
