//! Concurrency tests
//!
//! One handler shared by many tasks

use async_trait::async_trait;
use plugchain_plugin::{HttpContext, Next, Plugin, PluginRegistry, PluginResult};
use plugchain_tests::{http_context, ok_handler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts invocations and yields to the scheduler mid-chain
struct SlowCounter {
    id: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin for SlowCounter {
    fn id(&self) -> &str {
        self.id
    }

    async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        ctx.response
            .headers_mut()
            .append("x-visited", http::HeaderValue::from_static(self.id));
        next.run(ctx).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_are_isolated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry: PluginRegistry = PluginRegistry::new();
    for id in ["one", "two", "three"] {
        registry
            .register_plugin(Arc::new(SlowCounter {
                id,
                calls: Arc::clone(&calls),
            }))
            .unwrap();
    }
    let handler = registry.route_handler().unwrap();

    let mut tasks = Vec::new();
    for i in 0..50 {
        let handler = handler.clone();
        tasks.push(tokio::spawn(async move {
            let mut ctx = http_context(&format!("/req/{i}"), "10.0.0.1:5000");
            let outcome = handler.handle(&mut ctx, ok_handler("done")).await.unwrap();
            (outcome, ctx)
        }));
    }

    for task in tasks {
        let (outcome, ctx) = task.await.unwrap();
        assert!(outcome.is_completed());
        let visited: Vec<_> = ctx
            .response
            .headers()
            .get_all("x-visited")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(visited, vec!["one", "two", "three"]);
        assert_eq!(ctx.response.body(), b"done");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 150);
}

/// A registration racing with invocations either fully applies or not at all
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_during_traffic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry: PluginRegistry = PluginRegistry::new();
    registry
        .register_plugin(Arc::new(SlowCounter {
            id: "base",
            calls: Arc::clone(&calls),
        }))
        .unwrap();
    let handler = registry.route_handler().unwrap();

    let traffic = {
        let handler = handler.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                let mut ctx = http_context("/", "10.0.0.1:5000");
                let outcome = handler.handle(&mut ctx, ok_handler("done")).await.unwrap();
                assert!(outcome.is_completed());
            }
        })
    };

    registry
        .register_plugin(Arc::new(SlowCounter {
            id: "extra",
            calls: Arc::clone(&calls),
        }))
        .unwrap();
    traffic.await.unwrap();

    assert_eq!(registry.len(), 2);
    let mut ctx = http_context("/", "10.0.0.1:5000");
    handler.handle(&mut ctx, ok_handler("done")).await.unwrap();
    assert_eq!(ctx.response.headers().get_all("x-visited").iter().count(), 2);
}
