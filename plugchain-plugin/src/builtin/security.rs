use crate::traits::*;
use async_trait::async_trait;
use http::header::{
    HeaderName, HeaderValue, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use plugchain_common::{
    ChainError, Result, SecurityHeadersConfig, CORS_PLUGIN_ID, SECURITY_PLUGIN_ID,
};

/// Adds a fixed set of security headers to every response, then continues.
///
/// Declares that it runs after the `cors` plugin when one is registered.
#[derive(Debug, Clone)]
pub struct SecurityHeadersPlugin {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeadersPlugin {
    pub fn new() -> Self {
        Self {
            headers: vec![
                (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
                (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
                (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
                (
                    STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ),
            ],
        }
    }

    pub fn try_new(config: &SecurityHeadersConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            headers: Self::headers(config)?,
        })
    }

    fn headers(config: &SecurityHeadersConfig) -> Result<Vec<(HeaderName, HeaderValue)>> {
        let value = |v: &str| {
            HeaderValue::from_str(v)
                .map_err(|e| ChainError::Config(format!("invalid header value {v:?}: {e}")))
        };
        Ok(vec![
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (X_FRAME_OPTIONS, value(&config.frame_options)?),
            (REFERRER_POLICY, value(&config.referrer_policy)?),
            (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
            (STRICT_TRANSPORT_SECURITY, value(&config.hsts_value())?),
        ])
    }
}

impl Default for SecurityHeadersPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for SecurityHeadersPlugin {
    fn id(&self) -> &str {
        SECURITY_PLUGIN_ID
    }

    fn after(&self) -> Constraint {
        Constraint::from(CORS_PLUGIN_ID)
    }

    async fn process(&self, ctx: &mut HttpContext, next: Next<'_, HttpContext>) -> PluginResult {
        let headers = ctx.response.headers_mut();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        next.run(ctx).await
    }
}
