//! Settings for mcpdesk clients.
//!
//! Layered with figment: built-in defaults, then the TOML file at
//! [`config_path`], then `MCPDESK_*` environment variables. The API token
//! is resolved separately through a credential chain so it never has to
//! live in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use mcpdesk_api::{TlsMode, TransportConfig};

pub const DEFAULT_BASE_URL: &str = "http://localhost:9898/api";
pub const ENV_PREFIX: &str = "MCPDESK_";

const KEYRING_SERVICE: &str = "mcpdesk";
const KEYRING_USER: &str = "api-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// API root every resource path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout for non-streaming calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub insecure: bool,

    /// PEM file with an extra root certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Plaintext API token (prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Name of an environment variable holding the API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            insecure: false,
            ca_cert: None,
            api_token: None,
            api_token_env: None,
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}

impl Settings {
    /// Parsed API root.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        self.base_url.parse().map_err(|e| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL '{}': {e}", self.base_url),
        })
    }

    /// Set one field from its textual form. Empty values clear optional fields.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let optional = || (!value.is_empty()).then(|| value.to_owned());
        match key {
            "base_url" => {
                let parsed: Url = value.parse().map_err(|e| ConfigError::Validation {
                    field: key.into(),
                    reason: format!("invalid URL '{value}': {e}"),
                })?;
                self.base_url = parsed.to_string();
            }
            "timeout_secs" => {
                self.timeout_secs = value.parse().map_err(|_| ConfigError::Validation {
                    field: key.into(),
                    reason: format!("expected a number of seconds, got '{value}'"),
                })?;
            }
            "insecure" => {
                self.insecure = value.parse().map_err(|_| ConfigError::Validation {
                    field: key.into(),
                    reason: format!("expected 'true' or 'false', got '{value}'"),
                })?;
            }
            "ca_cert" => self.ca_cert = optional().map(PathBuf::from),
            "api_token_env" => self.api_token_env = optional(),
            "user_agent" => self.user_agent = optional(),
            "api_token" => {
                return Err(ConfigError::Validation {
                    field: key.into(),
                    reason: "store tokens with `config set-token` instead".into(),
                });
            }
            other => {
                return Err(ConfigError::Validation {
                    field: "key".into(),
                    reason: format!("unknown setting '{other}'"),
                });
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Translate into the HTTP transport settings used by the API client.
    pub fn to_transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        let mut transport = TransportConfig {
            tls,
            ..TransportConfig::default()
        }
        .with_timeout(self.timeout());
        if let Some(ref agent) = self.user_agent {
            transport.user_agent.clone_from(agent);
        }
        transport
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "mcpdesk", "mcpdesk").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mcpdesk");
    p
}

// ── Loading & saving ────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    // Settings are flat, so keys are not split on `_`.
    // `MCPDESK_API_BASE_URL` is the conventional name for the base path.
    // `MCPDESK_API_TOKEN` belongs to the `--api-token` flag, never the file layer.
    let env = Env::prefixed(ENV_PREFIX).ignore(&["api_token"]).map(|key| {
        if key.as_str().eq_ignore_ascii_case("api_base_url") {
            "base_url".into()
        } else {
            key.as_str().into()
        }
    });

    Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(env)
}

/// Load settings from the canonical file + environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path())
}

/// Load settings from `path` + environment. A missing file is not an error.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = figment_for(path).extract()?;
    tracing::debug!(path = %path.display(), base_url = %settings.base_url, "settings loaded");
    Ok(settings)
}

/// Load defaults plus the file at `path`, ignoring the environment.
///
/// Used when editing the file, so env overrides are not persisted.
pub fn load_file_settings(path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .extract()?;
    Ok(settings)
}

/// Serialize settings to TOML and write them to `path`.
pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write settings to the canonical config path.
pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_to(settings, &config_path())
}

// ── API token ───────────────────────────────────────────────────────

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env,
    Keyring,
    ConfigFile,
}

impl TokenSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Flag => "command-line flag",
            Self::Env => "environment variable",
            Self::Keyring => "system keyring",
            Self::ConfigFile => "config file",
        }
    }
}

/// Resolve the API token. The backend may not require one, so the chain
/// ending empty is not an error.
///
/// Order: explicit flag, env var named by `api_token_env`, system keyring,
/// plaintext in the config file.
pub fn resolve_api_token(
    settings: &Settings,
    flag: Option<&str>,
) -> Option<(SecretString, TokenSource)> {
    if let Some(token) = flag.filter(|t| !t.is_empty()) {
        return Some((SecretString::from(token.to_owned()), TokenSource::Flag));
    }

    if let Some(ref env_name) = settings.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some((SecretString::from(val), TokenSource::Env));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(secret) = entry.get_password() {
            return Some((SecretString::from(secret), TokenSource::Keyring));
        }
    }

    settings
        .api_token
        .clone()
        .map(|token| (SecretString::from(token), TokenSource::ConfigFile))
}

/// Store the API token in the system keyring.
pub fn store_api_token(token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_password(token)?;
    Ok(())
}

/// Remove the API token from the system keyring, if present.
pub fn clear_api_token() -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
