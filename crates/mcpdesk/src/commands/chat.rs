//! Chat command handlers.

use std::future::Future;
use std::io::{self, Write};

use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use mcpdesk_api::StreamEvent;
use mcpdesk_api::models::ChatExchange;

use crate::cli::{ChatArgs, ChatCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "You")]
    user: String,
    #[tabled(rename = "Assistant")]
    assistant: String,
}

impl From<&ChatExchange> for HistoryRow {
    fn from(e: &ChatExchange) -> Self {
        Self {
            id: util::fmt_id(e.id),
            time: util::fmt_time(e.create_time),
            user: output::truncate(&e.user_message, 40),
            assistant: output::truncate(&e.ai_response, 60),
        }
    }
}

/// Structured form of an answer for json/yaml output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reply<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    response: &'a str,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ChatArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        ChatCommand::Send { message, session } => {
            let answer = ctx
                .gateway
                .generate(&message, session.as_deref())
                .await
                .map_err(|e| ctx.fail(e))?;
            print_reply(global, session.as_deref(), &answer)
        }

        ChatCommand::Stream {
            message,
            session,
            no_session,
        } => {
            let session = if no_session {
                None
            } else {
                Some(session.unwrap_or_else(|| Uuid::new_v4().simple().to_string()))
            };
            if let Some(ref key) = session {
                output::hint(&format!("session: {key}"), global.quiet, color);
            }
            stream_answer(ctx, global, &message, session.as_deref()).await
        }

        ChatCommand::History { session } => {
            let history = ctx
                .gateway
                .chat_history(&session)
                .await
                .map_err(|e| ctx.fail(e))?;
            let out = output::render_list(
                global.output,
                &history,
                |e| HistoryRow::from(e),
                |e| util::fmt_id(e.id),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ChatCommand::Clear { session } => {
            if !util::confirm(&format!("Delete the history of session '{session}'?"), global.yes)? {
                return Ok(());
            }
            let confirmation = ctx
                .gateway
                .delete_chat_history(&session)
                .await
                .map_err(|e| ctx.fail(e))?;
            output::notice(&confirmation, global.quiet, color);
            Ok(())
        }
    }
}

/// Print chunks as they arrive in table/plain mode; otherwise collect the
/// answer and render it once. Ctrl-C cancels the session.
async fn stream_answer(
    ctx: &Context,
    global: &GlobalOpts,
    message: &str,
    session: Option<&str>,
) -> Result<(), CliError> {
    let live = !global.quiet && matches!(global.output, OutputFormat::Table | OutputFormat::Plain);
    let mut stream = ctx.streams.open(message, session);
    let mut answer = String::new();
    let mut stdout = io::stdout();
    let interrupt = interrupted(tokio::signal::ctrl_c());
    tokio::pin!(interrupt);

    loop {
        let event = tokio::select! {
            biased;
            () = &mut interrupt => {
                stream.cancel();
                stream.released().await;
                if live && !answer.is_empty() {
                    writeln!(stdout)?;
                }
                return Err(CliError::Interrupted);
            }
            event = stream.recv() => event,
        };

        match event {
            Some(StreamEvent::Chunk(text)) => {
                if live {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                answer.push_str(&text);
            }
            Some(StreamEvent::Complete) | None => break,
            Some(StreamEvent::Error(err)) => {
                if live && !answer.is_empty() {
                    writeln!(stdout)?;
                }
                return Err(ctx.fail(err));
            }
        }
    }

    if live {
        writeln!(stdout)?;
        return Ok(());
    }
    print_reply(global, session, &answer)
}

/// Resolves when `signal` fires. If the handler cannot be installed this
/// never resolves, so the stream keeps running without Ctrl-C support.
async fn interrupted(signal: impl Future<Output = io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn print_reply(global: &GlobalOpts, session: Option<&str>, answer: &str) -> Result<(), CliError> {
    let reply = Reply {
        session_id: session,
        response: answer,
    };
    let out = output::render_single(
        global.output,
        &reply,
        |r| r.response.to_owned(),
        |r| r.response.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
