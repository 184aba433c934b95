use thiserror::Error;

/// Coarse classification attached to every normalized failure.
///
/// Callers branch on this rather than on individual variants: a
/// `NetworkFailure` means no response reached the client, a
/// `ServerFailure` means the server answered with a non-2xx status,
/// and `StreamFailure` covers anything that went wrong while a chat
/// stream was open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum ErrorKind {
    NetworkFailure,
    ServerFailure,
    StreamFailure,
    Unknown,
}

/// Top-level error type for the `mcpdesk-api` crate.
///
/// The normalized variants (`Network`, `Server`, `Stream`, `Unknown`) are
/// produced by [`crate::normalize`] and display as the bare user-facing
/// message. The remaining variants describe failures that happen before a
/// request is ever sent or after a 2xx body fails to decode.
#[derive(Debug, Error)]
pub enum Error {
    // ── Normalized ──────────────────────────────────────────────────
    /// No response reached the client (refused, DNS, TLS, timeout).
    #[error("{message}")]
    Network { message: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Failure while a streaming connection was open (or opening).
    #[error("{message}")]
    Stream { message: String, status: Option<u16> },

    /// Nothing usable could be extracted from the failure.
    #[error("{message}")]
    Unknown { message: String },

    // ── Local ───────────────────────────────────────────────────────
    /// URL parsing error (bad base URL or path).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A 2xx body could not be decoded into the declared type.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl Error {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::NetworkFailure,
            Self::Server { .. } => ErrorKind::ServerFailure,
            Self::Stream { .. } => ErrorKind::StreamFailure,
            Self::Unknown { .. }
            | Self::InvalidUrl(_)
            | Self::Deserialization { .. }
            | Self::ClientBuild(_) => ErrorKind::Unknown,
        }
    }

    /// The user-facing message, without any variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Network { message }
            | Self::Server { message, .. }
            | Self::Stream { message, .. }
            | Self::Unknown { message }
            | Self::Deserialization { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of the response that caused this error, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Stream { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` if retrying the same call might succeed.
    ///
    /// Nothing in this crate retries on its own; this is a hint for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Server { status, .. } => *status == 429 || *status >= 500,
            Self::Stream { status, .. } => status.is_none_or(|s| s == 429 || s >= 500),
            _ => false,
        }
    }

    /// Returns `true` if the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_message_for_normalized_variants() {
        let err = Error::Server {
            status: 500,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "overloaded");
        assert_eq!(err.kind(), ErrorKind::ServerFailure);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn transient_classification() {
        let network = Error::Network {
            message: "refused".into(),
        };
        let unavailable = Error::Server {
            status: 503,
            message: String::new(),
        };
        let bad_request = Error::Server {
            status: 400,
            message: String::new(),
        };
        let dropped = Error::Stream {
            message: "dropped".into(),
            status: None,
        };
        let unknown = Error::Unknown {
            message: "?".into(),
        };

        assert!(network.is_transient());
        assert!(unavailable.is_transient());
        assert!(!bad_request.is_transient());
        assert!(dropped.is_transient());
        assert!(!unknown.is_transient());
    }

    #[test]
    fn local_errors_are_unknown_kind() {
        let err = Error::ClientBuild("bad tls".into());
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "Failed to build HTTP client: bad tls");
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::StreamFailure.to_string(), "StreamFailure");
    }
}
