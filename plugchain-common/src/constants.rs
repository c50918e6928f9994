//! Well-known plugin ids and defaults shared by the built-in plugins.
//!
//! Use these constants instead of string literals so constraint declarations
//! stay consistent across the plugin crate, tests, and demos.

/// Id of the built-in security headers plugin.
pub const SECURITY_PLUGIN_ID: &str = "security";

/// Id of the built-in rate limiter plugin.
pub const RATE_LIMIT_PLUGIN_ID: &str = "rateLimiter";

/// Id of the built-in request/response logger plugin.
pub const LOGGER_PLUGIN_ID: &str = "logger";

/// Id the security plugin declares it must run after.
pub const CORS_PLUGIN_ID: &str = "cors";

/// Default number of requests allowed per rate limit window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Default rate limit window in milliseconds (one minute).
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;

/// Default `Strict-Transport-Security` max-age in seconds (one year).
pub const DEFAULT_HSTS_MAX_AGE_SECS: u64 = 31_536_000;

/// Default cap on the number of plugins a single chain invocation may walk.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 512;
