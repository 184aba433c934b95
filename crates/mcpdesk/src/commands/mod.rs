//! Command dispatch: bridges CLI args -> API calls -> output formatting.

pub mod chat;
pub mod config_cmd;
pub mod markets;
pub mod probe;
pub mod tools;
pub mod util;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use mcpdesk_api::{Error as ApiError, Gateway, GatewayOptions, RequestHooks, StreamController};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a backend-bound command needs.
pub struct Context {
    pub gateway: Gateway,
    pub streams: StreamController,
    pub base_url: Url,
}

impl Context {
    /// Resolve settings (file + env + flags) and build both clients.
    pub fn build(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut settings = mcpdesk_config::load_settings()?;
        if let Some(ref url) = global.base_url {
            settings.base_url.clone_from(url);
        }
        if let Some(timeout) = global.timeout {
            settings.timeout_secs = timeout;
        }
        settings.insecure |= global.insecure;

        let base_url = settings.base_url()?;
        let transport = settings.to_transport();
        let mut stream_transport = transport.clone();
        let mut hooks = RequestHooks::new();

        if let Some((token, source)) =
            mcpdesk_config::resolve_api_token(&settings, global.api_token.as_deref())
        {
            debug!(?source, "using API token");
            // Gateway calls get the token from the hook chain, streams from a default header.
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| CliError::Validation {
                    field: "api_token".into(),
                    reason: e.to_string(),
                })?;
            value.set_sensitive(true);
            stream_transport.default_headers.insert(AUTHORIZATION, value);
            hooks = hooks.with_bearer_token(token);
        }

        // The final error is rendered once by miette; per-call notices go to the log.
        let options = GatewayOptions {
            hooks,
            notifier: Arc::new(|err: &ApiError| {
                debug!(
                    kind = %err.kind(),
                    status = ?err.status(),
                    "call failed: {}",
                    err.message()
                );
            }),
        };

        Ok(Self {
            gateway: Gateway::new(base_url.clone(), &transport, options)?,
            streams: StreamController::new(base_url.clone(), &stream_transport)?,
            base_url,
        })
    }

    /// Convert an API failure, keeping the base URL for help text.
    pub fn fail(&self, err: ApiError) -> CliError {
        CliError::from_api(err, self.base_url.as_str())
    }
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Chat(args) => chat::handle(ctx, args, global).await,
        Command::Markets(args) => markets::handle(ctx, args, global).await,
        Command::Tools(args) => tools::handle(ctx, args, global).await,
        Command::Probe(args) => probe::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "not a backend command".into(),
        }),
    }
}
