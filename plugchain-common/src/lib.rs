//! Common types for `plugchain`: errors, configuration and well-known ids

pub mod config;
pub mod constants;
pub mod error;

pub use config::{RateLimitConfig, RegistryConfig, SecurityHeadersConfig};
pub use constants::{
    CORS_PLUGIN_ID, DEFAULT_MAX_CHAIN_DEPTH, LOGGER_PLUGIN_ID, RATE_LIMIT_PLUGIN_ID,
    SECURITY_PLUGIN_ID,
};
pub use error::{ChainError, Result};
