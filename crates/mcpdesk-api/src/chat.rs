// Chat endpoints (non-streaming)
//
// The streaming variant lives in `stream.rs`; these are plain request/response
// calls. History is answered with a bare JSON list, not the usual envelope.

use reqwest::Method;
use tracing::debug;

use crate::error::Error;
use crate::gateway::{CallOptions, Gateway};
use crate::models::ChatExchange;

impl Gateway {
    /// Ask for a complete answer in one response.
    ///
    /// `GET /ai/generate?message=..&sessionId=..` (plain-text body)
    pub async fn generate(
        &self,
        message: &str,
        session_key: Option<&str>,
    ) -> Result<String, Error> {
        debug!(session = ?session_key, "generating answer");
        let options = CallOptions::new()
            .param("message", Some(message))
            .param("sessionId", session_key.filter(|k| !k.is_empty()));
        self.fetch_text(Method::GET, "ai/generate", options).await
    }

    /// All stored exchanges for a session, oldest first.
    ///
    /// `GET /ai/history?sessionId=..`
    pub async fn chat_history(&self, session_key: &str) -> Result<Vec<ChatExchange>, Error> {
        let options = CallOptions::new().param("sessionId", Some(session_key));
        self.get("ai/history", options).await
    }

    /// Drop a session's stored history. Returns the server's confirmation text.
    ///
    /// `DELETE /ai/history?sessionId=..`
    pub async fn delete_chat_history(&self, session_key: &str) -> Result<String, Error> {
        debug!(session = session_key, "clearing chat history");
        let options = CallOptions::new().param("sessionId", Some(session_key));
        self.fetch_text(Method::DELETE, "ai/history", options).await
    }
}
