//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use mcpdesk_api::models::ApiResult;

use crate::cli::inline_or_file;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Reject envelopes that arrived with HTTP 2xx but `success: false`.
pub fn ensure_success<T>(result: ApiResult<T>) -> Result<ApiResult<T>, CliError> {
    if result.success {
        return Ok(result);
    }
    let message = result
        .message
        .clone()
        .or_else(|| result.error.clone())
        .unwrap_or_else(|| "the server rejected the request".into());
    Err(CliError::Rejected { message })
}

/// Parse inline JSON (or `@file`) that must be an object.
pub fn parse_json_object(field: &str, raw: &str) -> Result<Map<String, Value>, CliError> {
    let text = inline_or_file(raw)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected a JSON object, got {}", json_type(&other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn fmt_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn fmt_id(id: Option<i64>) -> String {
    id.map(|i| i.to_string()).unwrap_or_default()
}

/// `page 2/3 (41 total)` for paginated envelopes, when the server says so.
pub fn page_summary<T>(result: &ApiResult<T>) -> Option<String> {
    let total = result.total?;
    match (result.page, result.pages) {
        (Some(page), Some(pages)) => Some(format!("page {page}/{pages} ({total} total)")),
        _ => Some(format!("{total} total")),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn rejected_envelope_uses_message_then_error() {
        let result: ApiResult<Value> =
            serde_json::from_value(json!({ "success": false, "error": "refused" })).unwrap();
        let err = ensure_success(result).unwrap_err();
        assert_eq!(err.to_string(), "refused");
    }

    #[test]
    fn json_arguments_must_be_an_object() {
        assert_eq!(parse_json_object("args", r#"{"a":1}"#).unwrap()["a"], 1);
        let err = parse_json_object("args", "[1]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn page_summary_variants() {
        let paged: ApiResult<Value> =
            serde_json::from_value(json!({ "success": true, "total": 41, "page": 2, "pages": 3 }))
                .unwrap();
        assert_eq!(page_summary(&paged).as_deref(), Some("page 2/3 (41 total)"));
        let bare: ApiResult<Value> = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(page_summary(&bare).is_none());
    }
}
