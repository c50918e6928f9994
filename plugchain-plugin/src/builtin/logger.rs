use crate::traits::*;
use async_trait::async_trait;
use plugchain_common::LOGGER_PLUGIN_ID;
use std::time::Instant;
use tracing::{info, warn};

/// Logs each request, then the response once the rest of the chain has run
pub struct LoggerPlugin {
    log_bodies: bool,
}

impl LoggerPlugin {
    pub fn new() -> Self {
        Self { log_bodies: false }
    }

    pub fn with_body_logging(mut self) -> Self {
        self.log_bodies = true;
        self
    }
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for LoggerPlugin {
    fn id(&self) -> &str {
        LOGGER_PLUGIN_ID
    }

    async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
        info!(
            method = %ctx.request.method(),
            uri = %ctx.request.uri(),
            remote_addr = %ctx.remote_addr,
            "Incoming request"
        );
        if self.log_bodies && !ctx.request.body().is_empty() {
            info!(body_size = ctx.request.body().len(), "Request body");
        }

        let started = Instant::now();
        let result = next.run(ctx).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = ctx.response.status();

        if status.is_success() {
            info!(status = status.as_u16(), duration_ms, "Response sent");
        } else {
            warn!(status = status.as_u16(), duration_ms, "Response sent (error)");
        }

        result
    }
}
