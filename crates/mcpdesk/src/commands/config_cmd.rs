//! Config subcommand handlers.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

use serde::Serialize;

use mcpdesk_config::{self as config, Settings};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Resolved settings as shown by `config show`; the token itself is never printed.
#[derive(Debug, Serialize)]
struct SettingsView {
    config_file: PathBuf,
    base_url: String,
    timeout_secs: u64,
    insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ca_cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_token_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    api_token: String,
}

fn detail(v: &SettingsView) -> String {
    output::detail_lines(&[
        ("config file", v.config_file.display().to_string()),
        ("base_url", v.base_url.clone()),
        ("timeout_secs", v.timeout_secs.to_string()),
        ("insecure", v.insecure.to_string()),
        (
            "ca_cert",
            v.ca_cert
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ),
        ("api_token_env", v.api_token_env.clone().unwrap_or_default()),
        ("user_agent", v.user_agent.clone().unwrap_or_default()),
        ("api_token", v.api_token.clone()),
    ])
}

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let path = config::config_path();

    match args.command {
        ConfigCommand::Show => {
            let mut settings = config::load_settings()?;
            if let Some(ref url) = global.base_url {
                settings.base_url.clone_from(url);
            }
            if let Some(timeout) = global.timeout {
                settings.timeout_secs = timeout;
            }
            settings.insecure |= global.insecure;

            let token = config::resolve_api_token(&settings, global.api_token.as_deref())
                .map_or_else(
                    || "(none)".to_owned(),
                    |(_, source)| format!("set ({})", source.label()),
                );
            let view = view(path, settings, token);
            let out = output::render_single(global.output, &view, detail, |v| v.base_url.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut settings = config::load_file_settings(&path)?;
            settings.set(&key, &value)?;
            config::save_settings_to(&settings, &path)?;
            output::notice(
                &format!("{key} saved to {}", path.display()),
                global.quiet,
                color,
            );
            Ok(())
        }

        ConfigCommand::SetToken { stdin } => {
            let token = if stdin || !std::io::stdin().is_terminal() {
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line)?;
                line.trim().to_owned()
            } else {
                rpassword::prompt_password("API token: ").map_err(prompt_err)?
            };

            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "api_token".into(),
                    reason: "token cannot be empty".into(),
                });
            }

            config::store_api_token(&token)?;
            output::notice("API token stored in the system keyring", global.quiet, color);
            Ok(())
        }

        ConfigCommand::ClearToken => {
            config::clear_api_token()?;
            output::notice("API token removed from the system keyring", global.quiet, color);
            Ok(())
        }
    }
}

fn view(config_file: PathBuf, settings: Settings, api_token: String) -> SettingsView {
    SettingsView {
        config_file,
        base_url: settings.base_url,
        timeout_secs: settings.timeout_secs,
        insecure: settings.insecure,
        ca_cert: settings.ca_cert,
        api_token_env: settings.api_token_env,
        user_agent: settings.user_agent,
        api_token,
    }
}
