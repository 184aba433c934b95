//! MCP server probe handlers.
//!
//! Probes report failure inside a successful response (`success: false`
//! with `error`/`errorType`), so the outcome is printed before the exit
//! status is decided.

use serde_json::Value;
use tabled::Tabled;

use mcpdesk_api::models::{ApiResult, McpConnectionRequest, McpInvokeRequest, RemoteToolDescriptor};

use crate::cli::{GlobalOpts, OutputFormat, ProbeArgs, ProbeCommand, ProbeTarget};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Tabled)]
struct RemoteToolRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&RemoteToolDescriptor> for RemoteToolRow {
    fn from(t: &RemoteToolDescriptor) -> Self {
        Self {
            name: t.name.clone(),
            description: output::truncate(t.description.as_deref().unwrap_or_default(), 70),
        }
    }
}

fn connection_request(target: ProbeTarget) -> McpConnectionRequest {
    let mut request = McpConnectionRequest::new(target.url);
    request.transport_type = target.transport;
    request.headers = target.headers.into_iter().collect();
    request
}

/// One-line summary of a probe outcome for table mode.
fn outcome_line(result: &ApiResult<Value>) -> String {
    if result.success {
        return result
            .message
            .clone()
            .unwrap_or_else(|| "connection succeeded".into());
    }
    let error = result
        .error
        .clone()
        .or_else(|| result.message.clone())
        .unwrap_or_else(|| "probe failed".into());
    match result.error_type {
        Some(ref kind) => format!("{error} ({kind})"),
        None => error,
    }
}

pub async fn handle(ctx: &Context, args: ProbeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let api = &ctx.gateway;

    let result = match args.command {
        ProbeCommand::Connection(target) => {
            let result = api
                .probe_connection(&connection_request(target))
                .await
                .map_err(|e| ctx.fail(e))?;
            let out = output::render_single(global.output, &result, outcome_line, |r| {
                r.success.to_string()
            })?;
            output::print_output(&out, global.quiet);
            result
        }

        ProbeCommand::ListTools(target) => {
            let result = api
                .probe_list_tools(&connection_request(target))
                .await
                .map_err(|e| ctx.fail(e))?;
            match result.probed_tools() {
                Some(probed)
                    if result.success
                        && matches!(global.output, OutputFormat::Table | OutputFormat::Plain) =>
                {
                    let out = output::render_list(
                        global.output,
                        &probed.tools,
                        |t| RemoteToolRow::from(t),
                        |t| t.name.clone(),
                    )?;
                    output::print_output(&out, global.quiet);
                    output::hint(
                        &format!("{} tool(s)", probed.count),
                        global.quiet,
                        output::should_color(global.color),
                    );
                }
                _ => {
                    let out = output::render_single(global.output, &result, outcome_line, |r| {
                        r.success.to_string()
                    })?;
                    output::print_output(&out, global.quiet);
                }
            }
            result
        }

        ProbeCommand::Invoke { target, tool, args } => {
            let arguments = args
                .as_deref()
                .map(|raw| util::parse_json_object("args", raw))
                .transpose()?;
            let request = McpInvokeRequest {
                connection: connection_request(target),
                tool_name: tool,
                arguments,
            };
            let result = api.probe_invoke(&request).await.map_err(|e| ctx.fail(e))?;
            let out = output::render_single(
                global.output,
                &result,
                |r| match r.extra.get("response") {
                    Some(response) if r.success => serde_json::to_string_pretty(response)
                        .unwrap_or_else(|_| response.to_string()),
                    _ => outcome_line(r),
                },
                |r| r.success.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            result
        }
    };

    util::ensure_success(result).map(|_| ())
}
