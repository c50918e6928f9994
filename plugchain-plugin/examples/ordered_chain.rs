use async_trait::async_trait;
use plugchain_plugin::builtin::{LoggerPlugin, RateLimitPlugin, SecurityHeadersPlugin};
use plugchain_plugin::{
    Constraint, HttpContext, Next, Plugin, PluginRegistry, PluginResult, RegisterOptions,
};
use plugchain_common::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;

/// Example plugin that adds a CORS header to every response
pub struct CorsPlugin {
    origin: String,
}

impl CorsPlugin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

#[async_trait]
impl Plugin for CorsPlugin {
    fn id(&self) -> &str {
        "cors"
    }

    // Reject over-limit clients before doing any header work
    fn after(&self) -> Constraint {
        Constraint::from("rateLimiter")
    }

    async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
        ctx.response
            .headers_mut()
            .insert("access-control-allow-origin", self.origin.parse()?);
        next.run(ctx).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup logging
    tracing_subscriber::fmt().init();

    let registry: PluginRegistry = PluginRegistry::new();

    // Registration order does not matter; constraints decide
    registry.register_plugin(Arc::new(SecurityHeadersPlugin::new()))?;
    registry.register_plugin(Arc::new(CorsPlugin::new("https://example.com")))?;
    registry.register(
        Arc::new(RateLimitPlugin::try_new(&RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(10),
            disable_cleanup: false,
        })?),
        RegisterOptions::new().after("logger"),
    )?;
    registry.register_plugin(Arc::new(LoggerPlugin::new()))?;

    registry.init_all().await?;
    let handler = registry.route_handler()?;
    println!("Execution order: {:?}", registry.execution_order()?);

    for i in 1..=3 {
        let req = http::Request::builder()
            .uri("http://example.com/")
            .body(vec![])?;
        let mut ctx = HttpContext::new(req, "127.0.0.1:1234".parse()?);

        let outcome = handler
            .handle(&mut ctx, |ctx| {
                Box::pin(async move {
                    *ctx.response.body_mut() = b"hello".to_vec();
                    Ok(())
                })
            })
            .await?;

        println!(
            "Request {i}: {} {:?} ({:?})",
            ctx.response.status(),
            String::from_utf8_lossy(ctx.response.body()),
            outcome
        );
    }

    registry.shutdown_all().await?;
    Ok(())
}
