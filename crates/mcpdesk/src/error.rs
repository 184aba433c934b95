//! CLI error types with miette diagnostics.
//!
//! Maps normalized API errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use mcpdesk_api::{Error as ApiError, ErrorKind};
use mcpdesk_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(mcpdesk::connection_failed),
        help(
            "Check that the console backend is running and reachable.\n\
             URL: {url}\n\
             Set it with --base-url or MCPDESK_API_BASE_URL."
        )
    )]
    ConnectionFailed { url: String, message: String },

    #[error("{message}")]
    #[diagnostic(
        code(mcpdesk::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { message: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(mcpdesk::server_error), help("The server answered with HTTP {status}."))]
    Server { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(mcpdesk::not_found), help("Run: mcpdesk {list_command} to see what exists."))]
    NotFound { message: String, list_command: String },

    /// A 2xx answer whose envelope reports `success: false`.
    #[error("{message}")]
    #[diagnostic(code(mcpdesk::rejected))]
    Rejected { message: String },

    #[error("chat stream failed: {message}")]
    #[diagnostic(code(mcpdesk::stream_failed))]
    StreamFailed { message: String },

    #[error("{message}")]
    #[diagnostic(code(mcpdesk::api_error))]
    Api { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(mcpdesk::interrupted))]
    Interrupted,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mcpdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(mcpdesk::config),
        help("Inspect the resolved settings with: mcpdesk config show")
    )]
    Config(Box<ConfigError>),

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(mcpdesk::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(mcpdesk::json), help("Check the JSON text or file and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the "list" command to suggest when the error is a 404.
    pub fn with_list_hint(self, list_command: &str) -> Self {
        match self {
            Self::Server {
                status: 404,
                message,
            } => Self::NotFound {
                message,
                list_command: list_command.into(),
            },
            other => other,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl CliError {
    /// Like `From`, but keeps the base URL for connection help text.
    pub fn from_api(err: ApiError, base_url: &str) -> Self {
        match err.kind() {
            ErrorKind::NetworkFailure if err.message().contains("timed out") => Self::Timeout {
                message: err.message(),
            },
            ErrorKind::NetworkFailure => Self::ConnectionFailed {
                url: base_url.into(),
                message: err.message(),
            },
            _ => err.into(),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network { message } => Self::ConnectionFailed {
                url: "(configured base URL)".into(),
                message,
            },
            ApiError::Server { status, message } => Self::Server { status, message },
            ApiError::Stream { message, .. } => Self::StreamFailed { message },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            },
            other => Self::Api {
                message: other.message(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let offline = CliError::from_api(
            ApiError::Network {
                message: "connection refused".into(),
            },
            "http://localhost:9898/api",
        );
        assert_eq!(offline.exit_code(), exit_code::CONNECTION);

        let slow = CliError::from_api(
            ApiError::Network {
                message: "request timed out after 30s".into(),
            },
            "http://localhost:9898/api",
        );
        assert_eq!(slow.exit_code(), exit_code::TIMEOUT);

        let missing = CliError::from(ApiError::Server {
            status: 404,
            message: "tool 9 not found".into(),
        })
        .with_list_hint("tools list");
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(missing.to_string(), "tool 9 not found");
    }

    #[test]
    fn server_message_is_shown_as_is() {
        let err = CliError::from(ApiError::Server {
            status: 500,
            message: "overloaded".into(),
        });
        assert_eq!(err.to_string(), "overloaded");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
