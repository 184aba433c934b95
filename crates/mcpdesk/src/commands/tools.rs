//! Tool command handlers.

use serde_json::Value;
use tabled::Tabled;

use mcpdesk_api::models::{McpTool, Status, ToolFilter, ToolType};

use crate::cli::{GlobalOpts, ToolFields, ToolUpdate, ToolsArgs, ToolsCommand, inline_or_file};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    tool_type: ToolType,
    #[tabled(rename = "Status")]
    status: Status,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&McpTool> for ToolRow {
    fn from(t: &McpTool) -> Self {
        Self {
            id: util::fmt_id(t.id),
            name: t.name.clone(),
            tool_type: t.tool_type,
            status: t.status,
            description: output::truncate(t.description.as_deref().unwrap_or_default(), 50),
        }
    }
}

fn detail(t: &McpTool) -> String {
    output::detail_lines(&[
        ("ID", util::fmt_id(t.id)),
        ("Name", t.name.clone()),
        ("Type", t.tool_type.to_string()),
        ("Status", t.status.to_string()),
        ("Description", t.description.clone().unwrap_or_default()),
        ("Config", t.config_json.clone().unwrap_or_default()),
        ("Created", util::fmt_time(t.create_time)),
        ("Updated", util::fmt_time(t.update_time)),
    ])
}

/// Free-form payloads (`info`, `test`) render as pretty JSON in table mode.
fn value_detail(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ToolsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let api = &ctx.gateway;
    let fail = |e| ctx.fail(e).with_list_hint("tools list");

    match args.command {
        ToolsCommand::List {
            tool_type,
            status,
            keyword,
        } => {
            let filter = ToolFilter {
                tool_type,
                status,
                keyword,
            };
            let result = util::ensure_success(api.list_tools(&filter).await.map_err(fail)?)?;
            let tools = result.data.unwrap_or_default();
            let out = output::render_list(
                global.output,
                &tools,
                |t| ToolRow::from(t),
                |t| util::fmt_id(t.id),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ToolsCommand::Get { id } => {
            let tool = fetch(ctx, id).await?;
            let out = output::render_single(global.output, &tool, detail, |t| util::fmt_id(t.id))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ToolsCommand::Info { id } => {
            let result = util::ensure_success(api.tool_info(id).await.map_err(fail)?)?;
            let info = result.data.unwrap_or(Value::Null);
            let out = output::render_single(global.output, &info, value_detail, value_detail)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ToolsCommand::Create(fields) => {
            let tool = new_tool(fields)?;
            let result = util::ensure_success(api.create_tool(&tool).await.map_err(fail)?)?;
            let created = result.data.unwrap_or(tool);
            output::notice(
                &format!("Tool '{}' created ({})", created.name, util::fmt_id(created.id)),
                global.quiet,
                color,
            );
            Ok(())
        }

        ToolsCommand::Update { id, fields } => {
            let mut tool = fetch(ctx, id).await?;
            apply_update(&mut tool, fields)?;
            util::ensure_success(api.update_tool(id, &tool).await.map_err(fail)?)?;
            output::notice(&format!("Tool {id} updated"), global.quiet, color);
            Ok(())
        }

        ToolsCommand::Test { id, args } => {
            let arguments = args
                .as_deref()
                .map(|raw| util::parse_json_object("args", raw))
                .transpose()?;
            let result = api.test_tool(id, arguments.as_ref()).await.map_err(fail)?;
            // A failed run is still a result worth showing.
            let out = output::render_single(
                global.output,
                &result,
                |r| {
                    r.data.as_ref().map_or_else(
                        || r.message.clone().or_else(|| r.error.clone()).unwrap_or_default(),
                        value_detail,
                    )
                },
                |r| r.success.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            if result.success {
                Ok(())
            } else {
                util::ensure_success(result).map(|_| ())
            }
        }

        ToolsCommand::Status { id, status } => {
            util::ensure_success(api.set_tool_status(id, status).await.map_err(fail)?)?;
            output::notice(&format!("Tool {id} is now {status}"), global.quiet, color);
            Ok(())
        }

        ToolsCommand::Delete { ids } => {
            let prompt = match ids.as_slice() {
                [id] => format!("Delete tool {id}?"),
                many => format!("Delete {} tools?", many.len()),
            };
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            let result = match ids.as_slice() {
                [id] => api.delete_tool(*id).await,
                many => api.delete_tools(many).await,
            }
            .map_err(fail)?;
            util::ensure_success(result)?;
            output::notice(
                &format!("Deleted {} tool(s)", ids.len()),
                global.quiet,
                color,
            );
            Ok(())
        }
    }
}

async fn fetch(ctx: &Context, id: i64) -> Result<McpTool, CliError> {
    let result = ctx
        .gateway
        .get_tool(id)
        .await
        .map_err(|e| ctx.fail(e).with_list_hint("tools list"))?;
    util::ensure_success(result)?
        .data
        .ok_or_else(|| CliError::NotFound {
            message: format!("tool {id} not found"),
            list_command: "tools list".into(),
        })
}

/// `--config` must hold valid JSON; it is sent on as a string.
fn read_config(raw: &str) -> Result<String, CliError> {
    let text = inline_or_file(raw)?;
    serde_json::from_str::<Value>(&text)?;
    Ok(text)
}

fn new_tool(fields: ToolFields) -> Result<McpTool, CliError> {
    Ok(McpTool {
        id: None,
        name: fields.name,
        description: fields.description,
        tool_type: fields.tool_type,
        status: if fields.disabled {
            Status::Disabled
        } else {
            Status::Enabled
        },
        config_json: fields.config.as_deref().map(read_config).transpose()?,
        create_time: None,
        update_time: None,
    })
}

fn apply_update(tool: &mut McpTool, update: ToolUpdate) -> Result<(), CliError> {
    if let Some(name) = update.name {
        tool.name = name;
    }
    if update.description.is_some() {
        tool.description = update.description;
    }
    if let Some(ref raw) = update.config {
        tool.config_json = Some(read_config(raw)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn config_must_be_json() {
        let fields = ToolFields {
            name: "fs".into(),
            tool_type: ToolType::Local,
            description: None,
            config: Some("{not json".into()),
            disabled: false,
        };
        assert!(matches!(new_tool(fields), Err(CliError::Json(_))));
    }

    #[test]
    fn new_tool_keeps_config_text() {
        let tool = new_tool(ToolFields {
            name: "fs".into(),
            tool_type: ToolType::Remote,
            description: None,
            config: Some(r#"{"root":"/srv"}"#.into()),
            disabled: true,
        })
        .unwrap();
        assert_eq!(tool.config_json.as_deref(), Some(r#"{"root":"/srv"}"#));
        assert_eq!(tool.status, Status::Disabled);
    }
}
