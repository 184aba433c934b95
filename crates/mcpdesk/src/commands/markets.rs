//! Market command handlers.

use tabled::Tabled;

use mcpdesk_api::models::{MarketFilter, McpMarket, McpMarketTool, Status};

use crate::cli::{GlobalOpts, MarketFields, MarketUpdate, MarketsArgs, MarketsCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Status")]
    status: Status,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&McpMarket> for MarketRow {
    fn from(m: &McpMarket) -> Self {
        Self {
            id: util::fmt_id(m.id),
            name: m.name.clone(),
            url: m.url.clone(),
            status: m.status,
            updated: util::fmt_time(m.update_time.or(m.create_time)),
        }
    }
}

#[derive(Tabled)]
struct MarketToolRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Tool")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Loaded")]
    loaded: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&McpMarketTool> for MarketToolRow {
    fn from(t: &McpMarketTool) -> Self {
        let loaded = match (t.is_loaded, t.local_tool_id) {
            (true, Some(local)) => format!("yes (#{local})"),
            (true, None) => "yes".into(),
            (false, _) => "no".into(),
        };
        Self {
            id: util::fmt_id(t.id),
            name: t.tool_name.clone(),
            version: t.tool_version.clone().unwrap_or_default(),
            loaded,
            description: output::truncate(t.tool_description.as_deref().unwrap_or_default(), 50),
        }
    }
}

fn detail(m: &McpMarket) -> String {
    output::detail_lines(&[
        ("ID", util::fmt_id(m.id)),
        ("Name", m.name.clone()),
        ("URL", m.url.clone()),
        ("Status", m.status.to_string()),
        ("Description", m.description.clone().unwrap_or_default()),
        ("Created", util::fmt_time(m.create_time)),
        ("Updated", util::fmt_time(m.update_time)),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: MarketsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let api = &ctx.gateway;
    let fail = |e| ctx.fail(e).with_list_hint("markets list");

    match args.command {
        MarketsCommand::List { status, keyword } => {
            let filter = MarketFilter { status, keyword };
            let result = util::ensure_success(api.list_markets(&filter).await.map_err(fail)?)?;
            let markets = result.data.unwrap_or_default();
            let out = output::render_list(
                global.output,
                &markets,
                |m| MarketRow::from(m),
                |m| util::fmt_id(m.id),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MarketsCommand::Get { id } => {
            let market = fetch(ctx, id).await?;
            let out =
                output::render_single(global.output, &market, detail, |m| util::fmt_id(m.id))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MarketsCommand::Tools { id, page, size } => {
            let result =
                util::ensure_success(api.market_tools(id, page, size).await.map_err(fail)?)?;
            let summary = util::page_summary(&result);
            let tools = result.data.unwrap_or_default();
            let out = output::render_list(
                global.output,
                &tools,
                |t| MarketToolRow::from(t),
                |t| util::fmt_id(t.id),
            )?;
            output::print_output(&out, global.quiet);
            if let Some(summary) = summary {
                output::hint(&summary, global.quiet, color);
            }
            Ok(())
        }

        MarketsCommand::Create(fields) => {
            let market = new_market(fields);
            let result = util::ensure_success(api.create_market(&market).await.map_err(fail)?)?;
            let created = result.data.unwrap_or(market);
            output::notice(
                &format!("Market '{}' created ({})", created.name, util::fmt_id(created.id)),
                global.quiet,
                color,
            );
            Ok(())
        }

        MarketsCommand::Update { id, fields } => {
            let mut market = fetch(ctx, id).await?;
            apply_update(&mut market, fields);
            util::ensure_success(api.update_market(id, &market).await.map_err(fail)?)?;
            output::notice(&format!("Market {id} updated"), global.quiet, color);
            Ok(())
        }

        MarketsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete market {id} and its mirrored tools?"), global.yes)? {
                return Ok(());
            }
            util::ensure_success(api.delete_market(id).await.map_err(fail)?)?;
            output::notice(&format!("Market {id} deleted"), global.quiet, color);
            Ok(())
        }

        MarketsCommand::Status { id, status } => {
            util::ensure_success(api.set_market_status(id, status).await.map_err(fail)?)?;
            output::notice(&format!("Market {id} is now {status}"), global.quiet, color);
            Ok(())
        }

        MarketsCommand::Refresh { id } => {
            let result = util::ensure_success(api.refresh_market(id).await.map_err(fail)?)?;
            let message = result
                .message
                .unwrap_or_else(|| format!("Market {id} refreshed"));
            output::notice(&message, global.quiet, color);
            Ok(())
        }

        MarketsCommand::Load { tool_id } => {
            let result = util::ensure_success(api.load_market_tool(tool_id).await.map_err(fail)?)?;
            let message = result
                .message
                .unwrap_or_else(|| format!("Market tool {tool_id} loaded"));
            output::notice(&message, global.quiet, color);
            Ok(())
        }

        MarketsCommand::BatchLoad { tool_ids } => {
            let result =
                util::ensure_success(api.batch_load_market_tools(&tool_ids).await.map_err(fail)?)?;
            let message = result
                .message
                .unwrap_or_else(|| format!("{} market tools loaded", tool_ids.len()));
            output::notice(&message, global.quiet, color);
            Ok(())
        }
    }
}

async fn fetch(ctx: &Context, id: i64) -> Result<McpMarket, CliError> {
    let result = ctx
        .gateway
        .get_market(id)
        .await
        .map_err(|e| ctx.fail(e).with_list_hint("markets list"))?;
    util::ensure_success(result)?
        .data
        .ok_or_else(|| CliError::NotFound {
            message: format!("market {id} not found"),
            list_command: "markets list".into(),
        })
}

fn new_market(fields: MarketFields) -> McpMarket {
    McpMarket {
        id: None,
        name: fields.name,
        url: fields.url,
        description: fields.description,
        auth_config: fields.auth_config,
        status: if fields.disabled {
            Status::Disabled
        } else {
            Status::Enabled
        },
        create_time: None,
        update_time: None,
    }
}

fn apply_update(market: &mut McpMarket, update: MarketUpdate) {
    if let Some(name) = update.name {
        market.name = name;
    }
    if let Some(url) = update.url {
        market.url = url;
    }
    if update.description.is_some() {
        market.description = update.description;
    }
    if update.auth_config.is_some() {
        market.auth_config = update.auth_config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_only_touches_given_fields() {
        let mut market = new_market(MarketFields {
            name: "Official".into(),
            url: "https://a.example".into(),
            description: Some("keep".into()),
            auth_config: None,
            disabled: true,
        });
        apply_update(
            &mut market,
            MarketUpdate {
                name: None,
                url: Some("https://b.example".into()),
                description: None,
                auth_config: None,
            },
        );
        assert_eq!(market.name, "Official");
        assert_eq!(market.url, "https://b.example");
        assert_eq!(market.description.as_deref(), Some("keep"));
        assert_eq!(market.status, Status::Disabled);
    }
}
