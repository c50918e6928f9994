//! Plugin integration tests
//!
//! The built-in plugins registered together, with metrics recorded per request

use plugchain_common::{RateLimitConfig, SecurityHeadersConfig};
use plugchain_observability::ChainMetrics;
use plugchain_plugin::builtin::{LoggerPlugin, RateLimitPlugin, SecurityHeadersPlugin};
use plugchain_plugin::{PluginRegistry, RegisterOptions};
use plugchain_tests::{http_context, ok_handler, trace, TracePlugin};
use std::sync::Arc;
use std::time::Duration;

fn registry_with_builtins(max_requests: u32) -> PluginRegistry {
    let registry: PluginRegistry = PluginRegistry::new();
    registry
        .register_plugin(Arc::new(SecurityHeadersPlugin::new()))
        .unwrap();
    registry
        .register(
            Arc::new(
                RateLimitPlugin::try_new(&RateLimitConfig {
                    max_requests,
                    window: Duration::from_secs(60),
                    disable_cleanup: true,
                })
                .unwrap(),
            ),
            RegisterOptions::new().after("logger"),
        )
        .unwrap();
    registry
        .register_plugin(Arc::new(LoggerPlugin::new()))
        .unwrap();
    registry
}

/// Logger first, then the limiter; security declares `after = "cors"`, which is absent
#[tokio::test]
async fn test_builtin_order() {
    let registry = registry_with_builtins(10);
    assert_eq!(
        registry.execution_order().unwrap(),
        vec!["security", "logger", "rateLimiter"]
    );
}

/// A registered cors plugin pulls security behind it
#[tokio::test]
async fn test_security_runs_after_cors_when_present() {
    let trace = trace();
    let registry = registry_with_builtins(10);
    registry
        .register_plugin(TracePlugin::new("cors", &trace).runs_after("rateLimiter").shared())
        .unwrap();

    assert_eq!(
        registry.execution_order().unwrap(),
        vec!["logger", "rateLimiter", "cors", "security"]
    );
}

#[tokio::test]
async fn test_security_headers_on_response() {
    let registry = registry_with_builtins(10);
    let handler = registry.route_handler().unwrap();

    let mut ctx = http_context("/index.html", "192.168.1.1:40000");
    let outcome = handler.handle(&mut ctx, ok_handler("hello")).await.unwrap();

    assert!(outcome.is_completed());
    let headers = ctx.response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(
        headers["strict-transport-security"],
        "max-age=31536000; includeSubDomains"
    );
    assert_eq!(ctx.response.body(), b"hello");
}

#[tokio::test]
async fn test_custom_security_config() {
    let registry: PluginRegistry = PluginRegistry::new();
    let config = SecurityHeadersConfig {
        hsts_max_age: 600,
        frame_options: "DENY".to_string(),
        ..Default::default()
    };
    registry
        .register_plugin(Arc::new(SecurityHeadersPlugin::try_new(&config).unwrap()))
        .unwrap();

    let handler = registry.route_handler().unwrap();
    let mut ctx = http_context("/", "192.168.1.1:40000");
    handler.handle(&mut ctx, ok_handler("")).await.unwrap();

    assert_eq!(ctx.response.headers()["x-frame-options"], "DENY");
    assert_eq!(
        ctx.response.headers()["strict-transport-security"],
        "max-age=600; includeSubDomains"
    );
}

/// Over the limit the chain stops at the limiter with a 429
#[tokio::test]
async fn test_rate_limit_short_circuits() {
    plugchain_observability::init_minimal_logging();
    let registry = registry_with_builtins(2);
    registry.init_all().await.expect("Failed to init plugins");
    let handler = registry.route_handler().unwrap();
    let metrics = ChainMetrics::new(&prometheus::Registry::new()).unwrap();

    for i in 0..2 {
        let mut ctx = http_context("/test", "192.168.1.1:12345");
        let outcome = metrics
            .handle(&handler, &mut ctx, ok_handler("ok"))
            .await
            .unwrap();
        assert!(outcome.is_completed(), "Request {} should be allowed", i + 1);
        assert_eq!(ctx.response.status(), http::StatusCode::OK);
    }

    let mut ctx = http_context("/test", "192.168.1.1:12345");
    let outcome = metrics
        .handle(&handler, &mut ctx, ok_handler("ok"))
        .await
        .unwrap();

    assert_eq!(outcome.terminated_by(), Some("rateLimiter"));
    assert_eq!(ctx.response.status(), http::StatusCode::TOO_MANY_REQUESTS);
    assert!(ctx.response.headers().contains_key("retry-after"));
    assert_eq!(ctx.response.body(), b"Too Many Requests");
    // Security ran before the limiter
    assert_eq!(ctx.response.headers()["x-frame-options"], "SAMEORIGIN");

    // Another client is unaffected
    let mut ctx = http_context("/test", "192.168.1.2:12345");
    let outcome = metrics
        .handle(&handler, &mut ctx, ok_handler("ok"))
        .await
        .unwrap();
    assert!(outcome.is_completed());

    assert_eq!(metrics.invocations("completed"), 3);
    assert_eq!(metrics.invocations("terminated"), 1);
    assert_eq!(metrics.terminations("rateLimiter"), 1);

    registry
        .shutdown_all()
        .await
        .expect("Failed to shutdown plugins");
}

