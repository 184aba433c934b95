// Request/response gateway
//
// Wraps `reqwest::Client` with base-path joining, query flattening, the
// request-hook chain, and response-kind dispatch. Endpoint groups (chat,
// markets, tools, connection tests) are inherent methods in separate files
// so this module stays focused on transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::hooks::{Notifier, RequestHooks, TracingNotifier};
use crate::normalize::{self, Origin};
use crate::transport::TransportConfig;

/// How a successful response body is decoded. Declared per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    #[default]
    Json,
    Text,
}

/// A decoded success body, matching the declared [`ResponseKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

/// Per-call inputs: query parameters, optional JSON body, response kind.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    params: Vec<(String, String)>,
    body: Option<Value>,
    response_kind: ResponseKind,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter. `None` values are left out of the query string.
    pub fn param(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.params.push((key.to_owned(), value.to_string()));
        }
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: format!("failed to serialize request body: {e}"),
            body: String::new(),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = kind;
        self
    }

    pub fn text(self) -> Self {
        self.response_kind(ResponseKind::Text)
    }
}

/// Construction-time options for a [`Gateway`].
#[derive(Clone)]
pub struct GatewayOptions {
    pub hooks: RequestHooks,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            hooks: RequestHooks::new(),
            notifier: Arc::new(TracingNotifier),
        }
    }
}

impl std::fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Request/response client for the admin API.
///
/// Every call ends in either the decoded payload or a normalized [`Error`];
/// failures are also reported once to the configured [`Notifier`].
/// Concurrent calls share no mutable state.
#[derive(Clone)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
    hooks: RequestHooks,
    notifier: Arc<dyn Notifier>,
}

impl Gateway {
    /// Create a gateway from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:9898/api`.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        options: GatewayOptions,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: Some(transport.timeout),
            hooks: options.hooks,
            notifier: options.notifier,
        })
    }

    /// Create a gateway around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, options: GatewayOptions) -> Self {
        Self {
            http,
            base_url,
            timeout: None,
            hooks: options.hooks,
            notifier: options.notifier,
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Core call ────────────────────────────────────────────────────

    /// Issue one call and decode the body as declared in `options`.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<Payload, Error> {
        let result = self.execute(method, path, options).await;
        if let Err(ref err) = result {
            self.notifier.notify(err);
        }
        result
    }

    /// Issue a JSON call and decode the body into `T` as received.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        let payload = self
            .call(method, path, options.response_kind(ResponseKind::Json))
            .await?;
        let value = match payload {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        };
        <T as serde::Deserialize>::deserialize(&value).map_err(|e| {
            let err = Error::Deserialization {
                message: e.to_string(),
                body: value.to_string(),
            };
            self.notifier.notify(&err);
            err
        })
    }

    /// Issue a text call and return the raw body.
    pub async fn fetch_text(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<String, Error> {
        match self.call(method, path, options.text()).await? {
            Payload::Text(text) => Ok(text),
            Payload::Json(value) => Ok(value.to_string()),
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        options: CallOptions,
    ) -> Result<Payload, Error> {
        let mut url = endpoint_url(&self.base_url, path)?;
        if !options.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.params);
        }

        debug!("{method} {url}");

        let mut builder = self.http.request(method, url);
        if let Some(ref body) = options.body {
            builder = builder.json(body);
        }
        builder = self.hooks.apply(builder);

        let resp = builder
            .send()
            .await
            .map_err(|e| normalize::from_reqwest(&e, Origin::Request, self.timeout))?;

        if !resp.status().is_success() {
            return Err(normalize::from_response(resp, Origin::Request).await);
        }

        let body = resp
            .text()
            .await
            .map_err(|e| normalize::from_reqwest(&e, Origin::Request, self.timeout))?;
        trace!(bytes = body.len(), "response body received");

        decode(body, options.response_kind)
    }

    // ── Verb helpers (envelope endpoints) ────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        self.fetch_json(Method::GET, path, options).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        self.fetch_json(Method::POST, path, options).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        self.fetch_json(Method::PUT, path, options).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, Error> {
        self.fetch_json(Method::DELETE, path, options).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Join a relative resource path onto the API root.
///
/// `http://host/api` + `/mcp/tools` → `http://host/api/mcp/tools`.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

fn decode(body: String, kind: ResponseKind) -> Result<Payload, Error> {
    match kind {
        ResponseKind::Text => Ok(Payload::Text(body)),
        ResponseKind::Json if body.trim().is_empty() => Ok(Payload::Json(Value::Null)),
        ResponseKind::Json => serde_json::from_str(&body)
            .map(Payload::Json)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            }),
    }
}
