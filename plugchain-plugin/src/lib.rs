//! # plugchain Plugin System
//!
//! This crate orders a set of named plugins by their declared `before`/`after`
//! constraints and runs them as a chain over a shared context. Each plugin either
//! hands control to the rest of the chain or stops it.
//!
//! ## Features
//!
//! - **Deterministic Ordering** - Depth-first topological sort with cycle and duplicate-id detection
//! - **Continuation Passing** - Plugins call `next.run(ctx)` to continue, or return to stop the chain
//! - **Async-First** - Plugins may await before (and after) continuing
//! - **Built-in Plugins** - Security headers, rate limiting and request logging included
//!
//! ## Quick Start
//!
//! ### Creating a Custom Plugin
//!
//! ```rust
//! use plugchain_plugin::{Constraint, HttpContext, Next, Plugin, PluginResult};
//! use async_trait::async_trait;
//!
//! struct Cors;
//!
//! #[async_trait]
//! impl Plugin for Cors {
//!     fn id(&self) -> &str {
//!         "cors"
//!     }
//!
//!     fn before(&self) -> Constraint {
//!         Constraint::from("rateLimiter")
//!     }
//!
//!     async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
//!         ctx.response
//!             .headers_mut()
//!             .insert("access-control-allow-origin", "*".parse()?);
//!         next.run(ctx).await
//!     }
//! }
//! ```
//!
//! ### Registering Plugins and Handling Requests
//!
//! ```rust,no_run
//! use plugchain_plugin::builtin::SecurityHeadersPlugin;
//! use plugchain_plugin::{HttpContext, PluginRegistry, RegisterOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let registry: PluginRegistry = PluginRegistry::new();
//!     registry.register(
//!         Arc::new(SecurityHeadersPlugin::new()),
//!         RegisterOptions::new().after("logger"),
//!     )?;
//!
//!     // Sorts now; ordering errors surface here
//!     let handler = registry.route_handler()?;
//!
//!     let req = http::Request::builder().uri("/").body(vec![])?;
//!     let mut ctx = HttpContext::new(req, "127.0.0.1:8080".parse()?);
//!     let outcome = handler
//!         .handle(&mut ctx, |ctx| Box::pin(async move {
//!             *ctx.response.body_mut() = b"hello".to_vec();
//!             Ok(())
//!         }))
//!         .await?;
//!     assert!(outcome.is_completed());
//!     Ok(())
//! }
//! ```
//!
//! ## Ordering Rules
//!
//! - `before = "x"` adds the edge `self -> x`; `after = "x"` adds `x -> self`
//! - Constraints naming unregistered plugins are ignored (or rejected in strict mode)
//! - Registering after the first sort re-sorts immediately
//!
//! ## See Also
//!
//! - [`Plugin`] - Core plugin trait
//! - [`PluginRegistry`] - Registration and ordering
//! - [`ChainHandler`] - Reusable chain executor
//! - [`sort()`] - The underlying topological sort

pub mod builtin;
pub mod chain;
pub mod graph;
pub mod registry;
pub mod sort;
pub mod traits;

pub use chain::{run_chain, run_chain_with_depth, ChainOutcome};
pub use graph::{build_graph, Declared, Graph};
pub use registry::*;
pub use sort::sort;
pub use traits::*;
