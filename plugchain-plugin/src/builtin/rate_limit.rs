use crate::traits::*;
use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use http::header::{HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::StatusCode;
use plugchain_common::{ChainError, RateLimitConfig, Result, RATE_LIMIT_PLUGIN_ID};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Keyed token bucket store. Clone the `Arc` to share counters between plugins.
pub type SharedLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// Derives the rate limit key for a request
pub type KeyFn = Arc<dyn Fn(&HttpContext) -> String + Send + Sync>;

/// Derives the rate limit key for a request, possibly after awaiting a lookup
pub type AsyncKeyFn = Arc<dyn for<'a> Fn(&'a HttpContext) -> BoxFuture<'a, String> + Send + Sync>;

/// Writes the response for a request over the limit
pub type LimitHandler = Arc<dyn Fn(&mut HttpContext, &LimitInfo) + Send + Sync>;

/// Details about a rejected request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitInfo {
    pub key: String,
    /// Seconds until the key may send again, rounded up
    pub retry_after: u64,
    pub max_requests: u32,
    /// Requests left for the key; always 0 once a request is rejected
    pub remaining_requests: u32,
}

enum KeySource {
    ClientIp,
    Sync(KeyFn),
    Async(AsyncKeyFn),
}

/// Rate limiting plugin using a keyed token bucket.
///
/// Each key (the client IP unless a key function is set) may send
/// `max_requests` in a burst, refilled evenly over `window`. A request over
/// the limit gets a `429` with `Retry-After` and the chain stops there.
///
/// Idle keys are evicted by a background task started by `init`, or by the
/// first request if `init` was never called. Set `disable_cleanup` to opt out.
pub struct RateLimitPlugin {
    limiter: SharedLimiter,
    clock: DefaultClock,
    config: RateLimitConfig,
    key_source: KeySource,
    on_limit_reached: Option<LimitHandler>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimitPlugin {
    pub fn try_new(config: &RateLimitConfig) -> Result<Self> {
        let limiter = Self::limiter_for(config)?;
        Ok(Self {
            limiter,
            clock: DefaultClock::default(),
            config: config.clone(),
            key_source: KeySource::ClientIp,
            on_limit_reached: None,
            cleanup: Mutex::new(None),
        })
    }

    /// Build a limiter store for `config` that several plugins can share
    pub fn limiter_for(config: &RateLimitConfig) -> Result<SharedLimiter> {
        config.validate()?;
        let burst = NonZeroU32::new(config.max_requests)
            .ok_or_else(|| ChainError::Config("max_requests must be positive".into()))?;
        let quota = Quota::with_period(config.window / config.max_requests)
            .ok_or_else(|| ChainError::Config("window too short for max_requests".into()))?
            .allow_burst(burst);

        Ok(Arc::new(RateLimiter::new(
            quota,
            DefaultKeyedStateStore::default(),
            DefaultClock::default(),
        )))
    }

    /// Count requests against `limiter` instead of a private store.
    ///
    /// The quota is the one `limiter` was built with.
    pub fn with_shared_limiter(mut self, limiter: SharedLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// The store this plugin counts against
    pub fn limiter(&self) -> SharedLimiter {
        Arc::clone(&self.limiter)
    }

    /// Key requests by something other than the client IP
    pub fn with_key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpContext) -> String + Send + Sync + 'static,
    {
        self.key_source = KeySource::Sync(Arc::new(f));
        self
    }

    /// Key requests by the result of an async lookup
    pub fn with_async_key_fn<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a HttpContext) -> BoxFuture<'a, String> + Send + Sync + 'static,
    {
        self.key_source = KeySource::Async(Arc::new(f));
        self
    }

    /// Replace the default plain text `Too Many Requests` body.
    ///
    /// Status and `Retry-After` are already set when the handler runs.
    pub fn on_limit_reached<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut HttpContext, &LimitInfo) + Send + Sync + 'static,
    {
        self.on_limit_reached = Some(Arc::new(f));
        self
    }

    async fn key(&self, ctx: &HttpContext) -> String {
        match &self.key_source {
            KeySource::ClientIp => ctx.remote_addr.ip().to_string(),
            KeySource::Sync(f) => f(ctx),
            KeySource::Async(f) => f(ctx).await,
        }
    }

    /// Spawns the eviction task unless it is disabled or already running
    fn start_cleanup(&self) {
        if self.config.disable_cleanup {
            return;
        }

        let mut cleanup = self.cleanup.lock().unwrap_or_else(PoisonError::into_inner);
        if cleanup.is_some() {
            return;
        }

        let limiter = Arc::clone(&self.limiter);
        let period = self.config.window * 2;
        *cleanup = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.retain_recent();
                debug!(keys = limiter.len(), "Evicted idle rate limit keys");
            }
        }));
    }

    fn reject(&self, ctx: &mut HttpContext, info: &LimitInfo) {
        *ctx.response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        ctx.response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(info.retry_after));

        if let Some(handler) = &self.on_limit_reached {
            handler(ctx, info);
            return;
        }

        ctx.response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        *ctx.response.body_mut() = b"Too Many Requests".to_vec();
    }
}

fn ceil_secs(wait: Duration) -> u64 {
    wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
}

#[async_trait]
impl Plugin for RateLimitPlugin {
    fn id(&self) -> &str {
        RATE_LIMIT_PLUGIN_ID
    }

    /// Starts evicting idle keys every two windows, unless disabled
    async fn init(&self) -> PluginResult {
        self.start_cleanup();
        Ok(())
    }

    async fn shutdown(&self) -> PluginResult {
        if let Some(task) = self
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        Ok(())
    }

    async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
        self.start_cleanup();
        let key = self.key(ctx).await;

        match self.limiter.check_key(&key) {
            Ok(()) => next.run(ctx).await,
            Err(not_until) => {
                let info = LimitInfo {
                    retry_after: ceil_secs(not_until.wait_time_from(self.clock.now())),
                    max_requests: self.config.max_requests,
                    remaining_requests: 0,
                    key,
                };
                warn!(key = %info.key, retry_after = info.retry_after, "Rate limit exceeded");
                self.reject(ctx, &info);
                Ok(())
            }
        }
    }
}

impl Drop for RateLimitPlugin {
    fn drop(&mut self) {
        if let Some(task) = self
            .cleanup
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
