pub mod logger;
pub mod rate_limit;
pub mod security;

pub use logger::LoggerPlugin;
pub use rate_limit::{AsyncKeyFn, KeyFn, LimitHandler, LimitInfo, RateLimitPlugin, SharedLimiter};
pub use security::SecurityHeadersPlugin;
