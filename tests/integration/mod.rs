#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for `plugchain`
//!
//! These tests drive registries end to end: registration, ordering,
//! chain execution with the built-in plugins, and metrics.

mod concurrent_test;
mod error_test;
mod plugin_test;
