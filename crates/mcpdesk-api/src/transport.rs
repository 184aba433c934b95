// Shared transport configuration for building reqwest::Client instances.
//
// The gateway and the stream controller share TLS, user-agent and default
// header settings through this module. They differ only in timeouts: the
// gateway enforces one, a chat stream never does.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

const USER_AGENT: &str = concat!("mcpdesk/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed dev backends).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Inactivity timeout for gateway calls. Not applied to chat streams.
    pub timeout: Duration,
    pub user_agent: String,
    pub default_headers: HeaderMap,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_owned(),
            default_headers: HeaderMap::new(),
        }
    }
}

impl TransportConfig {
    /// Build the client used for request/response calls.
    ///
    /// Both the connect phase and every read are bounded by `timeout`, so a
    /// server that stops sending mid-response is surfaced as a timeout.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.base_builder()?
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Build the client used for chat streams.
    ///
    /// Only the connect phase is bounded; an open stream may stay silent
    /// for as long as the server likes.
    pub fn build_stream_client(&self) -> Result<reqwest::Client, Error> {
        self.base_builder()?
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    fn base_builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(self.default_headers.clone());

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::ClientBuild(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::ClientBuild(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }

    /// Replace the gateway timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
