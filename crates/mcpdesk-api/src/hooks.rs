// Request shaping and failure notification.
//
// Both are plain values handed to the gateway at construction time. There is
// no global interceptor registry: two gateways built with different hooks
// never observe each other's configuration.

use std::fmt;
use std::sync::Arc;

use reqwest::RequestBuilder;
use reqwest::header::{HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// One request-shaping step.
pub type RequestHook = Arc<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// Ordered chain of request-shaping steps, applied before every gateway call.
#[derive(Clone, Default)]
pub struct RequestHooks {
    hooks: Vec<RequestHook>,
}

impl RequestHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step; steps run in the order they were added.
    pub fn with<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Attach `Authorization: Bearer <token>` to every request.
    pub fn with_bearer_token(self, token: SecretString) -> Self {
        self.with(move |builder| builder.bearer_auth(token.expose_secret()))
    }

    /// Attach a fixed header to every request.
    pub fn with_header(self, name: HeaderName, value: HeaderValue) -> Self {
        self.with(move |builder| builder.header(name.clone(), value.clone()))
    }

    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        self.hooks.iter().fold(builder, |builder, hook| hook(builder))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

// ── Notification ─────────────────────────────────────────────────────

/// Transient, user-visible notification raised for each failed gateway call.
///
/// Chat stream failures never reach the notifier; they are delivered to the
/// stream's consumer only.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &Error);
}

/// Default notifier: logs the normalized message at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, error: &Error) {
        tracing::warn!(
            kind = %error.kind(),
            status = ?error.status(),
            "{}",
            error.message()
        );
    }
}

impl<F> Notifier for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn notify(&self, error: &Error) {
        self(error);
    }
}
