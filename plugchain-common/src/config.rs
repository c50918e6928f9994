//! Configuration types for `plugchain` registries and built-in plugins

use crate::constants::{
    DEFAULT_HSTS_MAX_AGE_SECS, DEFAULT_MAX_CHAIN_DEPTH, DEFAULT_RATE_LIMIT_MAX_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_MS,
};
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Reject constraints that name unregistered plugins instead of ignoring them
    pub strict_constraints: bool,
    /// Longest chain a handler will run; each plugin adds one level of nested polling
    pub max_chain_depth: usize,
}

impl RegistryConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_depth == 0 {
            return Err(ChainError::Config("max_chain_depth must be positive".into()));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_constraints: false,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed per window
    pub max_requests: u32,
    /// Window duration
    pub window: Duration,
    /// Skip the periodic eviction of idle keys
    pub disable_cleanup: bool,
}

impl RateLimitConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(ChainError::Config("max_requests must be positive".into()));
        }
        if self.window.is_zero() {
            return Err(ChainError::Config("window must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            disable_cleanup: false,
        }
    }
}

/// Security header values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// `Strict-Transport-Security` max-age in seconds
    pub hsts_max_age: u64,
    /// `X-Frame-Options` value
    pub frame_options: String,
    /// `Referrer-Policy` value
    pub referrer_policy: String,
}

impl SecurityHeadersConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.frame_options.is_empty() {
            return Err(ChainError::Config("frame_options is required".into()));
        }
        if self.referrer_policy.is_empty() {
            return Err(ChainError::Config("referrer_policy is required".into()));
        }
        Ok(())
    }

    /// Rendered `Strict-Transport-Security` header value.
    pub fn hsts_value(&self) -> String {
        format!("max-age={}; includeSubDomains", self.hsts_max_age)
    }
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            hsts_max_age: DEFAULT_HSTS_MAX_AGE_SECS,
            frame_options: "SAMEORIGIN".to_string(),
            referrer_policy: "no-referrer".to_string(),
        }
    }
}
