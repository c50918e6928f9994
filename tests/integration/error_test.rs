//! Error tests
//!
//! Duplicate ids, cycles, strict mode and plugin failures

use plugchain_common::{ChainError, RegistryConfig, DEFAULT_MAX_CHAIN_DEPTH};
use plugchain_plugin::{FnPlugin, HttpContext, PluginError, PluginRegistry, RegisterOptions};
use plugchain_tests::{entries, http_context, ok_handler, trace, TracePlugin};
use std::sync::Arc;

#[test]
fn test_duplicate_id_reported_on_sort() {
    let trace = trace();
    let registry: PluginRegistry = PluginRegistry::new();
    registry
        .register_plugin(TracePlugin::new("auth", &trace).shared())
        .unwrap();
    registry
        .register_plugin(TracePlugin::new("auth", &trace).shared())
        .unwrap();

    let err = registry.route_handler().unwrap_err();
    assert_eq!(err, ChainError::DuplicateId("auth".to_string()));
    assert_eq!(err.to_string(), "Duplicate plugin id: \"auth\"");
}

#[test]
fn test_cycle_after_sort_is_rejected_and_rolled_back() {
    let trace = trace();
    let registry: PluginRegistry = PluginRegistry::new();
    registry
        .register_plugin(TracePlugin::new("a", &trace).runs_before("b").shared())
        .unwrap();
    registry
        .register_plugin(TracePlugin::new("b", &trace).shared())
        .unwrap();
    registry.route_handler().unwrap();

    let err = registry
        .register(
            TracePlugin::new("c", &trace).shared(),
            RegisterOptions::new().before("a").after("b"),
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::CyclicDependency(_)));
    assert_eq!(registry.ids(), vec!["a", "b"]);
    assert!(registry.is_sorted());
}

#[test]
fn test_strict_mode_rejects_unknown_targets() {
    let trace = trace();
    let registry: PluginRegistry = PluginRegistry::with_config(&RegistryConfig {
        strict_constraints: true,
        ..Default::default()
    });
    registry
        .register_plugin(TracePlugin::new("security", &trace).runs_after("cors").shared())
        .unwrap();

    let err = registry.execution_order().unwrap_err();
    assert_eq!(
        err,
        ChainError::UnknownConstraint {
            plugin: "security".to_string(),
            target: "cors".to_string(),
        }
    );

    let lenient: PluginRegistry = PluginRegistry::new();
    lenient
        .register_plugin(TracePlugin::new("security", &trace).runs_after("cors").shared())
        .unwrap();
    assert_eq!(lenient.execution_order().unwrap(), vec!["security"]);
}

#[tokio::test]
async fn test_plugin_error_reaches_caller() {
    let registry: PluginRegistry = PluginRegistry::new();
    registry
        .register_plugin(Arc::new(FnPlugin::new(
            "broken",
            |_ctx: &mut HttpContext, _next| {
                Box::pin(async { Err::<(), PluginError>("backend unavailable".into()) })
            },
        )))
        .unwrap();

    let handler = registry.route_handler().unwrap();
    let mut ctx = http_context("/", "10.0.0.1:5000");
    let err = handler.handle(&mut ctx, ok_handler("done")).await.unwrap_err();

    assert_eq!(err.to_string(), "backend unavailable");
    assert!(ctx.response.body().is_empty());
}

/// A chain that sorts fine but is too long to run is refused, not run
#[tokio::test]
async fn test_overlong_chain_is_refused() {
    let trace = trace();
    let registry: PluginRegistry = PluginRegistry::new();
    for i in 0..10_000 {
        let step = TracePlugin::new(&format!("step-{i}"), &trace);
        let step = if i == 0 {
            step
        } else {
            step.runs_after(format!("step-{}", i - 1))
        };
        registry.register_plugin(step.shared()).unwrap();
    }

    let handler = registry.route_handler().unwrap();
    let mut ctx = http_context("/", "10.0.0.1:5000");
    let err = handler.handle(&mut ctx, ok_handler("done")).await.unwrap_err();

    assert_eq!(
        *err.downcast::<ChainError>().unwrap(),
        ChainError::ChainTooDeep {
            len: 10_000,
            max: DEFAULT_MAX_CHAIN_DEPTH,
        }
    );
    assert!(entries(&trace).is_empty());
    assert!(ctx.response.body().is_empty());
}
