//! Failure normalization.
//!
//! Every failure the gateway or a chat stream can observe is funnelled
//! through [`normalize`], which picks exactly one user-facing message and
//! an [`ErrorKind`](crate::ErrorKind). Extraction priority, first match wins:
//!
//! 1. a response body that is a plain string is used verbatim
//! 2. a structured body with a string `message` field yields that field
//! 3. any other response becomes `request failed: <status> <reason>`
//! 4. with no response, the transport failure's own description is used
//! 5. otherwise the fixed [`FALLBACK_MESSAGE`]

use std::error::Error as _;
use std::time::Duration;

use serde_json::Value;

use crate::error::Error;

/// Message used when a failure carries nothing worth showing.
pub const FALLBACK_MESSAGE: &str = "request failed";

/// Where the failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// An ordinary gateway call.
    Request,
    /// A chat stream, before or after the first event.
    Stream,
}

/// Raw failure shapes, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The server answered with a non-2xx status.
    Response {
        status: u16,
        status_text: String,
        body: String,
    },
    /// No response; `description` is whatever the transport reported.
    Transport { description: Option<String> },
    /// Nothing at all is known about the failure.
    Empty,
}

impl Failure {
    /// Build a response failure, filling `status_text` with the canonical
    /// reason phrase for `status`.
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_owned();
        Self::Response {
            status,
            status_text,
            body: body.into(),
        }
    }
}

/// Collapse a [`Failure`] into the crate [`Error`].
///
/// Failures observed on a chat stream are always `Error::Stream`; everything
/// else maps by branch (response → `Server`, transport → `Network`,
/// nothing → `Unknown`).
pub fn normalize(failure: Failure, origin: Origin) -> Error {
    match failure {
        Failure::Response {
            status,
            status_text,
            body,
        } => {
            let message = message_from_body(&body)
                .unwrap_or_else(|| synthesize_status_message(status, &status_text));
            match origin {
                Origin::Request => Error::Server { status, message },
                Origin::Stream => Error::Stream {
                    message,
                    status: Some(status),
                },
            }
        }
        Failure::Transport {
            description: Some(description),
        } if !description.trim().is_empty() => match origin {
            Origin::Request => Error::Network {
                message: description,
            },
            Origin::Stream => Error::Stream {
                message: description,
                status: None,
            },
        },
        Failure::Transport { .. } | Failure::Empty => match origin {
            Origin::Request => Error::Unknown {
                message: FALLBACK_MESSAGE.to_owned(),
            },
            Origin::Stream => Error::Stream {
                message: FALLBACK_MESSAGE.to_owned(),
                status: None,
            },
        },
    }
}

/// Normalize a `reqwest` transport error (no usable response).
///
/// `timeout` is the configured request timeout, used to word the message
/// when the failure was a timeout.
pub fn from_reqwest(err: &reqwest::Error, origin: Origin, timeout: Option<Duration>) -> Error {
    let description = if err.is_timeout() {
        match timeout {
            Some(t) => format!("request timed out after {}", format_timeout(t)),
            None => "request timed out".to_owned(),
        }
    } else {
        describe_chain(err)
    };

    normalize(
        Failure::Transport {
            description: Some(description),
        },
        origin,
    )
}

/// Normalize a non-2xx response, consuming its body.
pub async fn from_response(resp: reqwest::Response, origin: Origin) -> Error {
    let status = resp.status().as_u16();
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, status, "failed to read error body");
            String::new()
        }
    };
    normalize(Failure::response(status, body), origin)
}

// ── Extraction helpers ───────────────────────────────────────────────

/// Branches 1 and 2: a plain-string body or a structured `message` field.
fn message_from_body(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        // Not JSON at all: the body is plain text.
        Err(_) => Some(body.to_owned()),
        Ok(Value::String(s)) if !s.is_empty() => Some(s),
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned),
        Ok(_) => None,
    }
}

fn synthesize_status_message(status: u16, status_text: &str) -> String {
    format!("{FALLBACK_MESSAGE}: {status} {status_text}")
        .trim_end()
        .to_owned()
}

/// Whole seconds as `30s`, anything else in milliseconds (`300ms`, `1500ms`).
fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

/// `reqwest` keeps the interesting part (connection refused, dns error)
/// in the source chain; join it onto the top-level message.
fn describe_chain(err: &reqwest::Error) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !description.contains(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}
