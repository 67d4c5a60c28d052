//! Per-call API context: base URL, default headers, credential headers.
//!
//! # Design
//! Configuration is passed explicitly — never global state — so concurrent
//! callers with different contexts cannot interfere. The header provider is
//! resolved once per call and never cached, which supports per-request
//! credential rotation. The request builder appends whatever headers it is
//! given without inspecting them.

use std::fmt;
use std::sync::Arc;

type HeaderProviderFn = dyn Fn() -> Vec<(String, String)> + Send + Sync;

/// Connection configuration for one API: where requests go and which
/// headers accompany them.
#[derive(Clone)]
pub struct ApiContext {
    base_url: String,
    default_headers: Vec<(String, String)>,
    header_provider: Option<Arc<HeaderProviderFn>>,
}

impl ApiContext {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
            header_provider: None,
        }
    }

    /// Add a fixed header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Install a credential/header provider, consulted freshly on every
    /// call so rotated credentials take effect immediately.
    pub fn with_header_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Vec<(String, String)> + Send + Sync + 'static,
    {
        self.header_provider = Some(Arc::new(provider));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers for one request: the fixed defaults followed by whatever the
    /// provider returns right now.
    pub fn resolve_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.default_headers.clone();
        if let Some(provider) = &self.header_provider {
            headers.extend(provider());
        }
        headers
    }
}

impl fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiContext")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("header_provider", &self.header_provider.is_some())
            .finish()
    }
}
